// Run metadata and the console summary

use crate::aggregate::{AggregateOutcome, SourceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENGINE_NAME: &str = "blockmerge";

/// Counts and timestamp describing one run, written next to the blocklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub updated_at: DateTime<Utc>,
    pub total: usize,
    pub whitelist_hits: usize,
    pub raw_matches: usize,
    pub unique_domains: usize,
    pub wildcards: usize,
    pub whitelist_entries: usize,
    pub sources_ok: usize,
    pub sources_offline: usize,
    pub duration_ms: u64,
    pub engine: String,
    pub engine_version: String,
}

impl RunMetadata {
    pub fn from_outcome(
        outcome: &AggregateOutcome,
        whitelist_entries: usize,
        updated_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            updated_at,
            total: outcome.entries.len(),
            whitelist_hits: outcome.whitelist_hits,
            raw_matches: outcome.raw_matches,
            unique_domains: outcome.unique_domains,
            wildcards: outcome.wildcards.len(),
            whitelist_entries,
            sources_ok: outcome.sources_ok(),
            sources_offline: outcome.sources_offline(),
            duration_ms: duration.as_millis() as u64,
            engine: ENGINE_NAME.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Raw matches that did not survive as their own entry, net of whitelist hits
    pub fn savings(&self) -> usize {
        self.raw_matches
            .saturating_sub(self.total)
            .saturating_sub(self.whitelist_hits)
    }

    /// `Key: value` lines for the version file
    pub fn to_human(&self) -> String {
        format!(
            "Last Update: {}\nTotal: {}\nWhitelist: {}\nRaw: {}\nWildcards: {}\nSources: {}/{}\nEngine: {} {}\n",
            self.updated_at.format("%Y-%m-%d %H:%M UTC"),
            self.total,
            self.whitelist_hits,
            self.raw_matches,
            self.wildcards,
            self.sources_ok,
            self.sources_ok + self.sources_offline,
            self.engine,
            self.engine_version,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Generate the end-of-run summary printed to the console
pub fn generate_run_summary(outcome: &AggregateOutcome, metadata: &RunMetadata) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!(
        "  Sources fetched: {}/{}\n",
        metadata.sources_ok,
        metadata.sources_ok + metadata.sources_offline
    ));
    report.push_str(&format!("  Raw matches: {}\n", metadata.raw_matches));
    report.push_str(&format!("  Whitelist hits: {}\n", metadata.whitelist_hits));
    report.push_str(&format!("  Invalid matches: {}\n", outcome.invalid_matches));
    report.push_str(&format!("  Unique domains: {}\n", metadata.unique_domains));
    report.push_str(&format!(
        "  Wildcards: {} (replacing {} subdomains)\n",
        metadata.wildcards, outcome.suppressed
    ));
    report.push_str(&format!("  Net blocklist: {}\n", metadata.total));
    report.push_str(&format!("  Savings: {}\n", metadata.savings()));
    report.push_str(&format!(
        "  Elapsed: {:.2}s\n",
        metadata.duration_ms as f64 / 1000.0
    ));

    let offline: Vec<_> = outcome
        .reports
        .iter()
        .filter_map(|r| match &r.status {
            SourceStatus::Offline { error } => Some((r.source.url.as_str(), error.as_str())),
            SourceStatus::Ok { .. } => None,
        })
        .collect();

    if !offline.is_empty() {
        report.push_str("\n## Offline sources\n");
        for (url, error) in offline {
            report.push_str(&format!("  {} ({})\n", url, error));
        }
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
