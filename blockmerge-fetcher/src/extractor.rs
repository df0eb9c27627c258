// Domain extraction from hosts-style and plain-domain list documents

use regex::Regex;
use std::sync::LazyLock;

/// A line may open with a null-route address, then carries one domain.
/// Labels are 1-63 chars, alphanumeric at both ends, at least two labels.
/// Whitespace is horizontal only so a match never spans lines. The prefix
/// may be glued to the domain (`0.0.0.0ads.example.com`).
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:0\.0\.0\.0|127\.0\.0\.1)[ \t]*)?([a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+)",
    )
    .unwrap()
});

/// Scan a document and return every domain-shaped match, lowercased, in
/// document order. Duplicates are kept; callers count raw matches.
pub fn extract_domains(text: &str) -> Vec<String> {
    DOMAIN_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_route_prefix_is_stripped() {
        assert_eq!(extract_domains("0.0.0.0 ads.example.com"), vec!["ads.example.com"]);
        assert_eq!(extract_domains("127.0.0.1\ttrack.example.net"), vec!["track.example.net"]);
    }

    #[test]
    fn test_bare_domain_line() {
        assert_eq!(extract_domains("bare.example.org"), vec!["bare.example.org"]);
    }

    #[test]
    fn test_output_is_lowercased() {
        assert_eq!(extract_domains("0.0.0.0 Ads.EXAMPLE.com"), vec!["ads.example.com"]);
    }

    #[test]
    fn test_non_domain_lines_yield_nothing() {
        assert!(extract_domains("not_a_domain").is_empty());
        assert!(extract_domains("localhost").is_empty());
        assert!(extract_domains("! adblock comment").is_empty());
        assert!(extract_domains("||ads.example.com^").is_empty());
        assert!(extract_domains("").is_empty());
    }

    #[test]
    fn test_comment_lines_are_not_matched() {
        let doc = "# Title: example list\n# ads.commented.com\n0.0.0.0 real.example.com\n";
        assert_eq!(extract_domains(doc), vec!["real.example.com"]);
    }

    #[test]
    fn test_trailing_comment_is_ignored() {
        assert_eq!(
            extract_domains("0.0.0.0 ads.example.com # tracking pixel"),
            vec!["ads.example.com"]
        );
    }

    #[test]
    fn test_multi_line_document() {
        let doc = "0.0.0.0 ads.example.com\r\nbare.example.org\nnot_a_domain\n\n127.0.0.1 x.y.z.example.io\n";
        assert_eq!(
            extract_domains(doc),
            vec!["ads.example.com", "bare.example.org", "x.y.z.example.io"]
        );
    }

    #[test]
    fn test_blank_line_does_not_swallow_next_prefix() {
        let doc = "first.example.com\n\n127.0.0.1 second.example.com\n";
        assert_eq!(extract_domains(doc), vec!["first.example.com", "second.example.com"]);
    }

    #[test]
    fn test_bare_address_is_matched_as_numeric_token() {
        // Rejected later by the numeric-TLD rule
        assert_eq!(extract_domains("127.0.0.1 localhost"), vec!["127.0.0.1"]);
        assert_eq!(extract_domains("  0.0.0.0 indented.example.com"), vec!["indented.example.com"]);
    }

    #[test]
    fn test_prefix_without_separator_is_stripped() {
        assert_eq!(extract_domains("0.0.0.0ads.example.com"), vec!["ads.example.com"]);
        assert_eq!(extract_domains("127.0.0.1track.example.net"), vec!["track.example.net"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let doc = "a.example.com\n0.0.0.0 a.example.com\n";
        assert_eq!(extract_domains(doc).len(), 2);
    }

    #[test]
    fn test_overlong_label_is_cut_at_sixty_three() {
        let label = "a".repeat(64);
        let doc = format!("{}.example.com", label);
        assert!(extract_domains(&doc).is_empty());
    }
}
