// Trusted domains: loading, normalization and canonical rendering

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Normalized whitelist. Entries keep first-seen order; `sorted()` and
/// `render()` give the canonical form written back to disk.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<String>,
    lookup: HashSet<String>,
}

impl Whitelist {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut whitelist = Self::default();
        for line in lines {
            if let Some(entry) = normalize_entry(line.as_ref()) {
                whitelist.insert(entry);
            }
        }
        whitelist
    }

    pub fn parse(content: &str) -> Self {
        Self::from_lines(content.lines())
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    fn insert(&mut self, entry: String) {
        if self.lookup.insert(entry.clone()) {
            self.entries.push(entry);
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.lookup.contains(domain)
    }

    /// Entries in first-seen order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut sorted = self.entries.clone();
        sorted.sort();
        sorted
    }

    /// One entry per line, sorted, each line newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.sorted() {
            out.push_str(&entry);
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip an inline `#` comment, trim and lowercase. `None` when nothing is left.
pub fn normalize_entry(line: &str) -> Option<String> {
    let without_comment = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let entry = without_comment.trim().to_lowercase();
    if entry.is_empty() { None } else { Some(entry) }
}
