// Candidate screening: syntactic validity, then whitelist suppression

use crate::whitelist::Whitelist;
use std::sync::Arc;

/// Suffixes that never reach public DNS.
pub const DEFAULT_RESERVED_SUFFIXES: &[&str] = &["local", "lan", "home.arpa"];

/// Outcome of screening one candidate domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Exact or ancestor match against a trusted entry
    Whitelisted,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct DomainFilter {
    whitelist: Arc<Whitelist>,
    reserved_suffixes: Vec<String>,
}

impl DomainFilter {
    pub fn new(whitelist: Arc<Whitelist>) -> Self {
        Self {
            whitelist,
            reserved_suffixes: DEFAULT_RESERVED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Add reserved suffixes on top of the defaults. Leading dots and case are ignored.
    pub fn with_reserved_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for suffix in suffixes {
            let suffix = suffix.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !suffix.is_empty() && !self.reserved_suffixes.contains(&suffix) {
                self.reserved_suffixes.push(suffix);
            }
        }
        self
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn reserved_suffixes(&self) -> &[String] {
        &self.reserved_suffixes
    }

    pub fn check(&self, domain: &str) -> Verdict {
        if !is_valid_domain(domain, &self.reserved_suffixes) {
            Verdict::Invalid
        } else if is_whitelisted(domain, &self.whitelist) {
            Verdict::Whitelisted
        } else {
            Verdict::Accepted
        }
    }
}

/// Syntactic check only: label shape, at least one dot, no reserved or
/// numeric top-level suffix.
pub fn is_valid_domain<S: AsRef<str>>(domain: &str, reserved_suffixes: &[S]) -> bool {
    if !domain.contains('.') || !domain.split('.').all(is_valid_label) {
        return false;
    }

    // Dotted-quad addresses and other all-digit TLDs
    if domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit()))
    {
        return false;
    }

    !reserved_suffixes
        .iter()
        .any(|suffix| has_dot_aligned_suffix(domain, suffix.as_ref()))
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}

fn has_dot_aligned_suffix(domain: &str, suffix: &str) -> bool {
    domain
        .strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
}

/// True if `domain` or one of its proper ancestors is trusted. The walk
/// stops before the bare top-level label.
pub fn is_whitelisted(domain: &str, whitelist: &Whitelist) -> bool {
    if whitelist.contains(domain) {
        return true;
    }

    for (idx, _) in domain.match_indices('.') {
        let ancestor = &domain[idx + 1..];
        if !ancestor.contains('.') {
            break;
        }
        if whitelist.contains(ancestor) {
            return true;
        }
    }

    false
}
