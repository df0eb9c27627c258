// Tests for the concurrent aggregation pipeline

use blockmerge_core::aggregate::{
    AggregateOptions, SourceReport, SourceReportCallback, SourceStatus, execute_aggregate,
    screen_document,
};
use blockmerge_core::filter::DomainFilter;
use blockmerge_core::sources::{SourceDescriptor, parse_source_line};
use blockmerge_core::whitelist::Whitelist;
use blockmerge_fetcher::{FetchConfig, Fetcher};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_fetcher() -> Arc<Fetcher> {
    let config = FetchConfig {
        retries: 0,
        retry_delay: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
        ..FetchConfig::default()
    };
    Arc::new(Fetcher::new(config).unwrap())
}

fn source(server: &MockServer, route: &str) -> SourceDescriptor {
    parse_source_line(&format!("{}{}", server.uri(), route)).unwrap()
}

fn options(sources: Vec<SourceDescriptor>, whitelist: &str) -> AggregateOptions {
    AggregateOptions {
        sources,
        filter: DomainFilter::new(Arc::new(Whitelist::parse(whitelist))),
        threshold: 10,
        concurrency: None,
    }
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

// ============================================================================
// Document Screening Tests
// ============================================================================

#[test]
fn test_screen_document_counts_each_verdict() {
    let filter = DomainFilter::new(Arc::new(Whitelist::parse("trusted.org\n")));
    let text = "# header\n\
                0.0.0.0 ads.example.com\n\
                0.0.0.0 cdn.trusted.org\n\
                printer.local\n\
                127.0.0.1 localhost\n\
                ads.example.com\n";

    let screened = screen_document(text, &filter);
    assert_eq!(screened.matches, 5);
    assert_eq!(screened.accepted, vec!["ads.example.com", "ads.example.com"]);
    assert_eq!(screened.whitelist_hits, 1);
    assert_eq!(screened.invalid, 2);
}

#[test]
fn test_screen_empty_document() {
    let filter = DomainFilter::new(Arc::new(Whitelist::default()));
    let screened = screen_document("", &filter);
    assert_eq!(screened.matches, 0);
    assert!(screened.accepted.is_empty());
}

// ============================================================================
// Aggregation Tests
// ============================================================================

#[tokio::test]
async fn test_offline_sources_do_not_stop_the_run() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/one.txt",
        ResponseTemplate::new(200).set_body_string("0.0.0.0 ads.example.com\n"),
    )
    .await;
    mount(
        &server,
        "/two.txt",
        ResponseTemplate::new(200).set_body_string("0.0.0.0 tracker.net\n"),
    )
    .await;
    mount(&server, "/down.txt", ResponseTemplate::new(500)).await;
    mount(&server, "/gone.txt", ResponseTemplate::new(404)).await;
    mount(
        &server,
        "/portal.txt",
        ResponseTemplate::new(200).set_body_string("<!DOCTYPE html><html><body>hi</body></html>"),
    )
    .await;

    let sources = vec![
        source(&server, "/one.txt"),
        source(&server, "/down.txt"),
        source(&server, "/two.txt"),
        source(&server, "/gone.txt"),
        source(&server, "/portal.txt"),
    ];
    let outcome = execute_aggregate(fast_fetcher(), options(sources, ""), None).await;

    assert_eq!(outcome.sources_ok(), 2);
    assert_eq!(outcome.sources_offline(), 3);
    assert_eq!(outcome.entries, vec!["ads.example.com", "tracker.net"]);

    // Reports come back in source-list order
    let routes: Vec<_> = outcome
        .reports
        .iter()
        .map(|r| r.source.url.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(
        routes,
        vec!["one.txt", "down.txt", "two.txt", "gone.txt", "portal.txt"]
    );
    assert!(matches!(
        outcome.reports[1].status,
        SourceStatus::Offline { .. }
    ));
}

#[tokio::test]
async fn test_output_is_independent_of_completion_order() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/slow.txt",
        ResponseTemplate::new(200)
            .set_body_string("0.0.0.0 b.example.com\n0.0.0.0 shared.example.org\n")
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    mount(
        &server,
        "/fast.txt",
        ResponseTemplate::new(200)
            .set_body_string("0.0.0.0 a.example.com\n0.0.0.0 shared.example.org\n"),
    )
    .await;

    let forward = vec![source(&server, "/slow.txt"), source(&server, "/fast.txt")];
    let reverse = vec![source(&server, "/fast.txt"), source(&server, "/slow.txt")];

    let first = execute_aggregate(fast_fetcher(), options(forward, ""), None).await;
    let second = execute_aggregate(fast_fetcher(), options(reverse, ""), None).await;

    assert_eq!(first.entries, second.entries);
    assert_eq!(
        first.entries,
        vec!["a.example.com", "b.example.com", "shared.example.org"]
    );
    assert_eq!(first.unique_domains, 3);
    assert_eq!(first.raw_matches, 4);
}

#[tokio::test]
async fn test_new_domain_counts_sum_to_unique_total() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/a.txt",
        ResponseTemplate::new(200).set_body_string("x.example.com\ny.example.com\n"),
    )
    .await;
    mount(
        &server,
        "/b.txt",
        ResponseTemplate::new(200).set_body_string("y.example.com\nz.example.com\n"),
    )
    .await;

    let sources = vec![source(&server, "/a.txt"), source(&server, "/b.txt")];
    let outcome = execute_aggregate(fast_fetcher(), options(sources, ""), None).await;

    let new_total: usize = outcome
        .reports
        .iter()
        .map(|r| match r.status {
            SourceStatus::Ok { new_domains, .. } => new_domains,
            SourceStatus::Offline { .. } => 0,
        })
        .sum();
    assert_eq!(new_total, outcome.unique_domains);
    assert_eq!(outcome.unique_domains, 3);
}

#[tokio::test]
async fn test_whitelist_hits_count_every_source() {
    let server = MockServer::start().await;
    for route in ["/a.txt", "/b.txt"] {
        mount(
            &server,
            route,
            ResponseTemplate::new(200).set_body_string("0.0.0.0 cdn.trusted.org\n0.0.0.0 ads.net\n"),
        )
        .await;
    }

    let sources = vec![source(&server, "/a.txt"), source(&server, "/b.txt")];
    let outcome = execute_aggregate(fast_fetcher(), options(sources, "trusted.org\n"), None).await;

    assert_eq!(outcome.whitelist_hits, 2);
    assert_eq!(outcome.entries, vec!["ads.net"]);
}

#[tokio::test]
async fn test_empty_body_is_a_successful_source() {
    let server = MockServer::start().await;
    mount(&server, "/empty.txt", ResponseTemplate::new(200)).await;

    let sources = vec![source(&server, "/empty.txt")];
    let outcome = execute_aggregate(fast_fetcher(), options(sources, ""), None).await;

    assert_eq!(outcome.sources_ok(), 1);
    assert!(outcome.entries.is_empty());
    assert_eq!(
        outcome.reports[0].status,
        SourceStatus::Ok {
            matches: 0,
            accepted: 0,
            new_domains: 0,
            whitelist_hits: 0,
        }
    );
}

#[tokio::test]
async fn test_callback_sees_every_source_with_bounded_concurrency() {
    let server = MockServer::start().await;
    let routes = ["/1.txt", "/2.txt", "/3.txt", "/4.txt"];
    for (i, route) in routes.iter().enumerate() {
        mount(
            &server,
            route,
            ResponseTemplate::new(200).set_body_string(format!("0.0.0.0 host{}.example.com\n", i)),
        )
        .await;
    }

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: SourceReportCallback = Arc::new(move |report: &SourceReport| {
        sink.lock().unwrap().push(report.source.url.clone());
    });

    let mut opts = options(routes.iter().map(|r| source(&server, r)).collect(), "");
    opts.concurrency = Some(2);
    let outcome = execute_aggregate(fast_fetcher(), opts, Some(callback)).await;

    assert_eq!(outcome.sources_ok(), 4);
    assert_eq!(outcome.entries.len(), 4);

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    let mut expected: Vec<_> = outcome.reports.iter().map(|r| r.source.url.clone()).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_consolidation_runs_on_the_union() {
    let server = MockServer::start().await;
    let half_a: String = (0..6).map(|i| format!("0.0.0.0 a{}.adnet.io\n", i)).collect();
    let half_b: String = (0..6).map(|i| format!("0.0.0.0 b{}.adnet.io\n", i)).collect();
    mount(&server, "/a.txt", ResponseTemplate::new(200).set_body_string(half_a)).await;
    mount(&server, "/b.txt", ResponseTemplate::new(200).set_body_string(half_b)).await;

    let sources = vec![source(&server, "/a.txt"), source(&server, "/b.txt")];
    let outcome = execute_aggregate(fast_fetcher(), options(sources, ""), None).await;

    assert_eq!(outcome.entries, vec!["adnet.io"]);
    assert_eq!(outcome.wildcards, vec!["adnet.io"]);
    assert_eq!(outcome.suppressed, 12);
}
