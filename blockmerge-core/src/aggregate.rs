// Concurrent fetch / extract / filter, then consolidation

use crate::consolidate::{Consolidation, consolidate};
use crate::filter::{DomainFilter, Verdict};
use crate::sources::SourceDescriptor;
use blockmerge_fetcher::{Fetcher, extract_domains};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

/// Options for configuring an aggregation run
pub struct AggregateOptions {
    pub sources: Vec<SourceDescriptor>,
    pub filter: DomainFilter,
    pub threshold: usize,
    /// Maximum in-flight fetches; `None` runs every source at once
    pub concurrency: Option<usize>,
}

/// Per-source outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Ok {
        matches: usize,
        accepted: usize,
        new_domains: usize,
        whitelist_hits: usize,
    },
    Offline {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: SourceDescriptor,
    pub status: SourceStatus,
    pub elapsed: Duration,
}

impl SourceReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, SourceStatus::Ok { .. })
    }
}

/// Callback for reporting each source as it settles
pub type SourceReportCallback = Arc<dyn Fn(&SourceReport) + Send + Sync>;

/// Matches found in one document, already screened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenedDocument {
    pub matches: usize,
    pub accepted: Vec<String>,
    pub whitelist_hits: usize,
    pub invalid: usize,
}

/// Extract and screen one document. Pure; runs inside the source's task.
pub fn screen_document(text: &str, filter: &DomainFilter) -> ScreenedDocument {
    let mut screened = ScreenedDocument::default();
    for domain in extract_domains(text) {
        screened.matches += 1;
        match filter.check(&domain) {
            Verdict::Accepted => screened.accepted.push(domain),
            Verdict::Whitelisted => screened.whitelist_hits += 1,
            Verdict::Invalid => screened.invalid += 1,
        }
    }
    screened
}

/// Accepted domains shared by all fetch tasks. Grows only; read back once
/// every task has been joined.
#[derive(Debug, Default)]
pub struct DomainRecords {
    inner: Mutex<HashSet<String>>,
}

impl DomainRecords {
    /// Insert a batch under one lock acquisition; returns how many were new.
    pub async fn insert_all(&self, domains: Vec<String>) -> usize {
        let mut records = self.inner.lock().await;
        let mut new_domains = 0;
        for domain in domains {
            if records.insert(domain) {
                new_domains += 1;
            }
        }
        new_domains
    }

    pub fn into_inner(self) -> HashSet<String> {
        self.inner.into_inner()
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    raw_matches: AtomicUsize,
    whitelist_hits: AtomicUsize,
    invalid: AtomicUsize,
}

/// Everything a run produced, ready for the writer
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// Final list: unsuppressed domains plus wildcard parents, sorted
    pub entries: Vec<String>,
    pub wildcards: Vec<String>,
    pub suppressed: usize,
    pub unique_domains: usize,
    pub raw_matches: usize,
    /// Counts every rejected match, duplicates across sources included
    pub whitelist_hits: usize,
    pub invalid_matches: usize,
    /// In source-list order
    pub reports: Vec<SourceReport>,
}

impl AggregateOutcome {
    pub fn sources_ok(&self) -> usize {
        self.reports.iter().filter(|r| r.is_ok()).count()
    }

    pub fn sources_offline(&self) -> usize {
        self.reports.len() - self.sources_ok()
    }
}

/// Fetch every source concurrently, screen each document, and consolidate
/// the union once all tasks have settled.
pub async fn execute_aggregate(
    fetcher: Arc<Fetcher>,
    options: AggregateOptions,
    report_callback: Option<SourceReportCallback>,
) -> AggregateOutcome {
    let AggregateOptions {
        sources,
        filter,
        threshold,
        concurrency,
    } = options;

    info!(
        "Aggregating {} sources (threshold {}, concurrency {})",
        sources.len(),
        threshold,
        concurrency.map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );

    let filter = Arc::new(filter);
    let records = Arc::new(DomainRecords::default());
    let counters = Arc::new(RunCounters::default());
    let semaphore = concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));

    let mut handles = Vec::with_capacity(sources.len());
    for source in sources {
        let fetcher = fetcher.clone();
        let filter = filter.clone();
        let records = records.clone();
        let counters = counters.clone();
        let semaphore = semaphore.clone();
        let callback = report_callback.clone();
        let task_source = source.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let report = process_source(task_source, &fetcher, &filter, &records, &counters).await;
            if let Some(ref callback) = callback {
                callback(&report);
            }
            report
        });

        handles.push((source, handle));
    }

    // Barrier: the collection is only read after every task has settled
    let mut reports = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Task for {} failed: {}", source.url, e);
                let report = SourceReport {
                    source,
                    status: SourceStatus::Offline {
                        error: format!("task failed: {}", e),
                    },
                    elapsed: Duration::from_secs(0),
                };
                if let Some(ref callback) = report_callback {
                    callback(&report);
                }
                reports.push(report);
            }
        }
    }

    let domains = match Arc::try_unwrap(records) {
        Ok(records) => records.into_inner(),
        Err(shared) => shared.inner.lock().await.clone(),
    };

    let Consolidation {
        entries,
        wildcards,
        suppressed,
    } = consolidate(&domains, threshold);

    let outcome = AggregateOutcome {
        entries,
        wildcards,
        suppressed,
        unique_domains: domains.len(),
        raw_matches: counters.raw_matches.load(Ordering::Relaxed),
        whitelist_hits: counters.whitelist_hits.load(Ordering::Relaxed),
        invalid_matches: counters.invalid.load(Ordering::Relaxed),
        reports,
    };

    info!(
        "Aggregation complete: {} unique domains, {} wildcards, {} entries",
        outcome.unique_domains,
        outcome.wildcards.len(),
        outcome.entries.len()
    );

    outcome
}

async fn process_source(
    source: SourceDescriptor,
    fetcher: &Fetcher,
    filter: &DomainFilter,
    records: &DomainRecords,
    counters: &RunCounters,
) -> SourceReport {
    let start = Instant::now();

    let document = match fetcher.fetch(&source.url).await {
        Ok(document) => document,
        Err(e) => {
            warn!("Source offline: {} ({})", source.url, e);
            return SourceReport {
                source,
                status: SourceStatus::Offline {
                    error: e.to_string(),
                },
                elapsed: start.elapsed(),
            };
        }
    };

    let screened = screen_document(&document.body, filter);
    counters.raw_matches.fetch_add(screened.matches, Ordering::Relaxed);
    counters
        .whitelist_hits
        .fetch_add(screened.whitelist_hits, Ordering::Relaxed);
    counters.invalid.fetch_add(screened.invalid, Ordering::Relaxed);

    let accepted = screened.accepted.len();
    let new_domains = records.insert_all(screened.accepted).await;

    debug!(
        "{}: {} matches, {} accepted, {} new, {} whitelisted, {} invalid",
        source.url, screened.matches, accepted, new_domains, screened.whitelist_hits, screened.invalid
    );

    SourceReport {
        source,
        status: SourceStatus::Ok {
            matches: screened.matches,
            accepted,
            new_domains,
            whitelist_hits: screened.whitelist_hits,
        },
        elapsed: start.elapsed(),
    }
}
