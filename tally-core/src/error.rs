use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the tally pipeline.
#[derive(Error, Debug)]
pub enum TallyError {
    /// Bytes could not be decoded into text (bad encoding, malformed content).
    #[error("Failed to decode {source_name}: {reason}")]
    Decode { source_name: String, reason: String },

    /// A data row could not be mapped. `row` is 1-based over data rows.
    #[error("Failed to parse {source_name} row {row}: {reason}")]
    Parse {
        source_name: String,
        row: usize,
        reason: String,
    },

    /// A setting is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TallyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TallyError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
