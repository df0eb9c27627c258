use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Failed to read source list {}: {source}", .path.display())]
    MissingSourceList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AggregateError>;
