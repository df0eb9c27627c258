use anyhow::{Context, Result};
use blockmerge_core::aggregate::{
    AggregateOptions, AggregateOutcome, SourceReport, SourceReportCallback, SourceStatus,
    execute_aggregate,
};
use blockmerge_core::filter::DomainFilter;
use blockmerge_core::output::{
    AllowlistDecoration, render_allowlist, render_blocklist, write_atomic, write_version_files,
};
use blockmerge_core::report::{RunMetadata, generate_run_summary};
use blockmerge_core::sources::{SourceDescriptor, load_source_list};
use blockmerge_core::whitelist::Whitelist;
use blockmerge_fetcher::{FetchConfig, Fetcher};
use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Everything `run` needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub sources_path: PathBuf,
    pub whitelist_path: PathBuf,
    pub output_path: PathBuf,
    pub allowlist_path: PathBuf,
    pub version_path: PathBuf,
    pub threshold: usize,
    pub concurrency: Option<usize>,
    pub reserved_suffixes: Vec<String>,
    pub decoration: AllowlistDecoration,
    pub fetch: FetchConfig,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            sources_path: PathBuf::from("sources.txt"),
            whitelist_path: PathBuf::from("whitelist.txt"),
            output_path: PathBuf::from("blocklist.txt"),
            allowlist_path: PathBuf::from("allowlist.txt"),
            version_path: PathBuf::from("version.txt"),
            threshold: blockmerge_core::consolidate::DEFAULT_THRESHOLD,
            concurrency: None,
            reserved_suffixes: Vec::new(),
            decoration: AllowlistDecoration::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl RunSettings {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let defaults = Self::default();
        let path = |id: &str, fallback: PathBuf| {
            matches
                .get_one::<String>(id)
                .map(|p| expand_path(p))
                .unwrap_or(fallback)
        };
        let text = |id: &str, fallback: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            sources_path: path("sources", defaults.sources_path),
            whitelist_path: path("whitelist", defaults.whitelist_path),
            output_path: path("output", defaults.output_path),
            allowlist_path: path("allowlist", defaults.allowlist_path),
            version_path: path("version-file", defaults.version_path),
            threshold: matches
                .get_one::<u64>("threshold")
                .map(|t| *t as usize)
                .unwrap_or(defaults.threshold),
            concurrency: matches.get_one::<usize>("concurrency").copied(),
            reserved_suffixes: matches
                .get_many::<String>("reserved-suffix")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            decoration: AllowlistDecoration {
                prefix: text("allow-prefix", &defaults.decoration.prefix),
                suffix: text("allow-suffix", &defaults.decoration.suffix),
            },
            fetch: FetchConfig {
                timeout: matches
                    .get_one::<u64>("timeout")
                    .map(|s| Duration::from_secs(*s))
                    .unwrap_or(defaults.fetch.timeout),
                retries: matches
                    .get_one::<u32>("retries")
                    .copied()
                    .unwrap_or(defaults.fetch.retries),
                retry_delay: matches
                    .get_one::<u64>("retry-delay-ms")
                    .map(|ms| Duration::from_millis(*ms))
                    .unwrap_or(defaults.fetch.retry_delay),
                ..defaults.fetch
            },
        }
    }
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: AggregateOutcome,
    pub metadata: RunMetadata,
}

/// Load the whitelist, or an empty one if it cannot be read. The flag says
/// whether the file was read and may be rewritten.
pub fn load_whitelist_or_empty(path: &Path) -> (Whitelist, bool) {
    match Whitelist::load(path) {
        Ok(whitelist) => {
            info!("Loaded {} whitelist entries from {}", whitelist.len(), path.display());
            (whitelist, true)
        }
        Err(e) => {
            warn!(
                "Whitelist {} unavailable ({}), continuing without one",
                path.display(),
                e
            );
            (Whitelist::default(), false)
        }
    }
}

/// Inputs read before any fetching starts
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub sources: Vec<SourceDescriptor>,
    pub whitelist: Arc<Whitelist>,
    /// Whether the whitelist file was read, and so may be rewritten
    pub whitelist_readable: bool,
}

/// Read the source list (fatal if missing) and the whitelist (empty if missing).
pub fn load_run_inputs(settings: &RunSettings) -> Result<RunInputs> {
    let sources = load_source_list(&settings.sources_path)?;
    let (whitelist, whitelist_readable) = load_whitelist_or_empty(&settings.whitelist_path);

    Ok(RunInputs {
        sources,
        whitelist: Arc::new(whitelist),
        whitelist_readable,
    })
}

/// Aggregate every source, then write all output files.
pub async fn run_pipeline(
    settings: &RunSettings,
    inputs: RunInputs,
    report_callback: Option<SourceReportCallback>,
) -> Result<RunResult> {
    let started = Instant::now();
    let RunInputs {
        sources,
        whitelist,
        whitelist_readable,
    } = inputs;

    let filter = DomainFilter::new(whitelist.clone())
        .with_reserved_suffixes(&settings.reserved_suffixes);

    let fetcher = Arc::new(
        Fetcher::new(settings.fetch.clone()).context("Failed to create HTTP client")?,
    );

    let options = AggregateOptions {
        sources,
        filter,
        threshold: settings.threshold,
        concurrency: settings.concurrency,
    };

    let outcome = execute_aggregate(fetcher, options, report_callback).await;

    let updated_at = Utc::now();
    let metadata =
        RunMetadata::from_outcome(&outcome, whitelist.len(), updated_at, started.elapsed());

    write_atomic(
        &settings.output_path,
        &render_blocklist(&outcome.entries, updated_at),
    )?;
    if whitelist_readable {
        write_atomic(&settings.whitelist_path, &whitelist.render())?;
    }
    write_atomic(
        &settings.allowlist_path,
        &render_allowlist(&whitelist, &settings.decoration),
    )?;
    write_version_files(&settings.version_path, &metadata)?;

    info!(
        "Wrote {} entries to {}",
        outcome.entries.len(),
        settings.output_path.display()
    );

    Ok(RunResult { outcome, metadata })
}

/// Rewrite the whitelist in canonical form; returns the entry count.
pub fn normalize_whitelist_file(path: &Path) -> Result<usize> {
    let whitelist = Whitelist::load(path)
        .with_context(|| format!("Failed to read whitelist {}", path.display()))?;
    write_atomic(path, &whitelist.render())?;
    Ok(whitelist.len())
}

pub fn status_table_header() -> String {
    format!("{:<8} | {:>10} | {}", "STATUS", "NEW", "SOURCE")
}

/// One row of the status table
pub fn format_status_line(report: &SourceReport) -> String {
    match &report.status {
        SourceStatus::Ok { new_domains, .. } => format!(
            "{} | {:>10} | {}",
            format!("{:<8}", "OK").green().bold(),
            new_domains,
            report.source.url
        ),
        SourceStatus::Offline { error } => format!(
            "{} | {:>10} | {} {}",
            format!("{:<8}", "OFFLINE").red().bold(),
            "-",
            report.source.url,
            format!("({})", error).bright_black()
        ),
    }
}

fn print_divider() {
    println!("{}", "─".repeat(100).bright_blue());
}

pub async fn handle_run(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let settings = RunSettings::from_matches(sub_matches);
    let inputs = load_run_inputs(&settings)?;

    let progress_bar = if quiet {
        None
    } else {
        println!(
            "{} {} sources, {} whitelist entries",
            "→".blue(),
            inputs.sources.len().to_string().cyan(),
            inputs.whitelist.len().to_string().cyan()
        );
        println!("\n{}", status_table_header().bold());
        print_divider();

        let pb = ProgressBar::new(inputs.sources.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} sources")
                .context("Invalid progress bar template")?
                .progress_chars("=>-"),
        );
        Some(pb)
    };

    let callback: Option<SourceReportCallback> = progress_bar.clone().map(|pb| {
        Arc::new(move |report: &SourceReport| {
            pb.println(format_status_line(report));
            pb.inc(1);
        }) as SourceReportCallback
    });

    let result = run_pipeline(&settings, inputs, callback).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    let RunResult { outcome, metadata } = result?;

    if !quiet {
        print_divider();
        print!("{}", generate_run_summary(&outcome, &metadata));
        println!(
            "{} Blocklist: {} ({} entries)",
            "✓".green().bold(),
            settings.output_path.display().to_string().bright_white(),
            metadata.total.to_string().cyan()
        );
    }

    Ok(())
}

pub fn handle_whitelist(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let path = sub_matches
        .get_one::<String>("whitelist")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| PathBuf::from("whitelist.txt"));

    let count = normalize_whitelist_file(&path)?;
    if !quiet {
        println!(
            "{} Normalized {} ({} entries)",
            "✓".green().bold(),
            path.display().to_string().bright_white(),
            count.to_string().cyan()
        );
    }
    Ok(())
}

pub fn handle_sources(sub_matches: &ArgMatches) -> Result<()> {
    let path = sub_matches
        .get_one::<String>("sources")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| PathBuf::from("sources.txt"));

    let sources = load_source_list(&path)?;
    for source in &sources {
        println!("{}", describe_source(source));
    }
    Ok(())
}

pub fn describe_source(source: &SourceDescriptor) -> String {
    let mut tags = Vec::new();
    if source.is_master() {
        tags.push("master".to_string());
    }
    match source.failure_streak() {
        0 => {}
        n => tags.push(format!("failed x{}", n)),
    }

    let line = format!("{:<32} {}", source.display_name().bright_white(), source.url);
    if tags.is_empty() {
        line
    } else {
        format!("{} {}", line, format!("[{}]", tags.join(", ")).yellow())
    }
}
