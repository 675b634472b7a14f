use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("No page loaded")]
    NoDocument,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unsupported browser operation: {0}")]
    Unsupported(&'static str),

    #[error("Browser session could not be started: {0}")]
    Launch(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
