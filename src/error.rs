use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("{url} answered HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("timed out after {0}s waiting for the content source")]
    Timeout(u64),

    #[error("OCR command failed: {0}")]
    Ocr(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state file {path:?}: {source}")]
    State {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WatchError>;
