use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Response is an HTML page, not a domain list")]
    HtmlDocument,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt at the same URL could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status(code) => *code == 429 || (500..=599).contains(code),
            FetchError::HtmlDocument | FetchError::InvalidUrl(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
