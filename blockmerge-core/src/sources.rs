// Source list parsing: status markers, URL cleanup, deduplication

use crate::error::{AggregateError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;
use url::Url;

/// Status tokens a maintenance tool may prepend to a source line.
/// The set is closed: `MASTER|` and `FAILx<N>|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMarker {
    /// Pinned source, never pruned by maintenance
    Master,
    /// Consecutive failed runs recorded so far
    Failures(u32),
}

/// A configured source, markers parsed off and the address cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub raw: String,
    pub url: String,
    pub markers: Vec<SourceMarker>,
}

impl SourceDescriptor {
    pub fn is_master(&self) -> bool {
        self.markers.contains(&SourceMarker::Master)
    }

    pub fn failure_streak(&self) -> u32 {
        self.markers
            .iter()
            .filter_map(|m| match m {
                SourceMarker::Failures(n) => Some(*n),
                SourceMarker::Master => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Short label for status output: the last path segment, or the host.
    pub fn display_name(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| {
                let segment = u
                    .path_segments()
                    .and_then(|mut s| s.next_back())
                    .filter(|s| !s.is_empty())
                    .map(String::from);
                segment.or_else(|| u.host_str().map(String::from))
            })
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Split leading status markers off a source line.
///
/// Tokens are consumed left to right while they match `MASTER|` or
/// `FAILx<digits>|`; anything else ends the prefix. Pure, no allocation
/// beyond the marker list.
pub fn strip_status_markers(line: &str) -> (Vec<SourceMarker>, &str) {
    let mut markers = Vec::new();
    let mut rest = line;

    loop {
        if let Some(after) = rest.strip_prefix("MASTER|") {
            markers.push(SourceMarker::Master);
            rest = after;
            continue;
        }

        if let Some(after) = rest.strip_prefix("FAILx") {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 && after[digits..].starts_with('|') {
                let count = after[..digits].parse().unwrap_or(u32::MAX);
                markers.push(SourceMarker::Failures(count));
                rest = &after[digits + 1..];
                continue;
            }
        }

        break;
    }

    (markers, rest)
}

/// Accept an http(s) URL as-is, or a scheme-less address with `http://` added.
pub fn normalize_source_url(address: &str) -> Option<String> {
    if let Ok(url) = Url::parse(address)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Some(address.to_string());
    }

    if address.contains("://") {
        return None;
    }

    let with_scheme = format!("http://{}", address);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(with_scheme),
        _ => None,
    }
}

/// Parse one line of the source list. Blank lines, comments and
/// unusable addresses yield `None`.
pub fn parse_source_line(line: &str) -> Option<SourceDescriptor> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (markers, address) = strip_status_markers(trimmed);
    let address = address.trim();
    if address.is_empty() {
        return None;
    }

    match normalize_source_url(address) {
        Some(url) => Some(SourceDescriptor {
            raw: trimmed.to_string(),
            url,
            markers,
        }),
        None => {
            warn!("Skipping invalid source '{}'", trimmed);
            None
        }
    }
}

/// Parse a whole source list, deduplicating by clean URL in first-seen order.
pub fn parse_source_list(content: &str) -> Vec<SourceDescriptor> {
    let mut seen = HashSet::new();
    content
        .lines()
        .filter_map(parse_source_line)
        .filter(|source| seen.insert(source.url.clone()))
        .collect()
}

/// Read the source list. Unlike the whitelist, a missing list is fatal.
/// A list with no usable sources is only a warning: the run still writes
/// an empty blocklist.
pub fn load_source_list(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs::read_to_string(path).map_err(|source| AggregateError::MissingSourceList {
        path: path.to_path_buf(),
        source,
    })?;

    let sources = parse_source_list(&content);
    if sources.is_empty() {
        warn!("No usable sources in {}", path.display());
    }

    Ok(sources)
}
