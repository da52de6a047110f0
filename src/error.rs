//! Error kinds shared across the index store, scanner, resolver, and CLI.

use thiserror::Error;

/// The four error kinds the core can surface.
///
/// `Decoding` errors are never propagated up through a `Result` in normal
/// operation — media extraction swallows them and records a null-field
/// `MediaMetadata` instead — but the variant still exists so the decode
/// path has somewhere to put the message when logging it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("index error: {0}")]
    Index(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Index(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Index(err.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::Index(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Index(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
