use std::time::Duration;

/// A list document retrieved from a source.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status_code: u16,
    pub content_length: Option<u64>,
    pub response_time: Duration,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub body: String,
}

impl FetchedDocument {
    pub fn new(url: String, body: String) -> Self {
        Self {
            url,
            status_code: 200,
            content_length: None,
            response_time: Duration::from_secs(0),
            attempts: 1,
            body,
        }
    }
}
