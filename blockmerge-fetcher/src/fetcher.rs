use crate::error::{FetchError, Result};
use crate::result::FetchedDocument;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Bytes at the start of a body inspected for an HTML marker.
const HTML_SNIFF_LEN: usize = 512;

/// Settings for the shared HTTP client and its retry policy
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after the first one, for transient failures only
    pub retries: u32,
    /// Base backoff; attempt `n` waits `retry_delay * n`
    pub retry_delay: Duration,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "blockmerge/{} (https://github.com/trapdoorsec/blockmerge)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout: Duration::from_secs(45),
            connect_timeout: Duration::from_secs(15),
            retries: 2,
            retry_delay: Duration::from_secs(1),
            max_redirects: 5,
        }
    }
}

/// Fetches source documents over HTTP. Cheap to share behind an `Arc`;
/// the underlying client pools connections across tasks.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url`, retrying transient failures up to `config.retries` times.
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut attempt: u32 = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(mut document) => {
                    document.attempts = attempt;
                    return Ok(document);
                }
                Err(e) if e.is_transient() && attempt <= self.config.retries => {
                    let delay = backoff_delay(self.config.retry_delay, attempt);
                    warn!(url, attempt, error = %e, "fetch failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedDocument> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_length = response.content_length();
        let body = response.text().await?;
        let response_time = start.elapsed();

        if looks_like_html(&body) {
            return Err(FetchError::HtmlDocument);
        }

        let mut document = FetchedDocument::new(url.to_string(), body);
        document.status_code = status.as_u16();
        document.content_length = content_length;
        document.response_time = response_time;
        Ok(document)
    }
}

/// Linear backoff, saturating instead of overflowing on huge base delays.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// Error pages and parked domains come back as 200 with an HTML body.
pub fn looks_like_html(body: &str) -> bool {
    let head = &body.as_bytes()[..body.len().min(HTML_SNIFF_LEN)];
    head.windows(5).any(|w| w.eq_ignore_ascii_case(b"<html"))
}
