pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod result;

pub use error::FetchError;
pub use extractor::extract_domains;
pub use fetcher::{FetchConfig, Fetcher};
pub use result::FetchedDocument;
