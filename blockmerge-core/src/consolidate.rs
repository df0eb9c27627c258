// Parent-domain consolidation
//
// The parent key is the last two labels. This is not public-suffix aware:
// every `*.co.uk` domain shares the key `co.uk`.

use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_THRESHOLD: usize = 10;

/// Result of collapsing subdomain families into their parent key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consolidation {
    /// Final list, sorted byte-wise ascending
    pub entries: Vec<String>,
    /// Parent keys that replaced their children, sorted
    pub wildcards: Vec<String>,
    /// Child domains dropped in favour of a wildcard
    pub suppressed: usize,
}

/// Last two dot-separated labels, or the whole domain if it has fewer.
pub fn parent_key(domain: &str) -> &str {
    match domain.rmatch_indices('.').nth(1) {
        Some((idx, _)) => &domain[idx + 1..],
        None => domain,
    }
}

/// Count distinct domains per parent key
pub fn count_parents<'a, I>(domains: I) -> HashMap<&'a str, usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for domain in domains {
        *counts.entry(parent_key(domain)).or_default() += 1;
    }
    counts
}

/// Replace every parent with at least `threshold` distinct children by the
/// parent itself. `domains` must already be unique.
pub fn consolidate<'a, I>(domains: I, threshold: usize) -> Consolidation
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let threshold = threshold.max(1);
    let counts = count_parents(domains.clone());

    let wildcards: BTreeSet<&str> = counts
        .iter()
        .filter(|&(_, &count)| count >= threshold)
        .map(|(&parent, _)| parent)
        .collect();

    let mut final_set: BTreeSet<&str> = wildcards.iter().copied().collect();
    let mut suppressed = 0;
    for domain in domains {
        let parent = parent_key(domain);
        if wildcards.contains(parent) {
            if parent != domain.as_str() {
                suppressed += 1;
            }
        } else {
            final_set.insert(domain.as_str());
        }
    }

    Consolidation {
        entries: final_set.into_iter().map(String::from).collect(),
        wildcards: wildcards.into_iter().map(String::from).collect(),
        suppressed,
    }
}
