//! Resembla error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while constructing or querying a retrieval pipeline
#[derive(Debug, Error)]
pub enum ResemblaError {
    /// A table, corpus or inverse-map file could not be read or written
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row of a weight/cost table, corpus or inverse map is malformed
    #[error("malformed row in '{}' at line {line}: {reason}", path.display())]
    Table {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Invalid configuration (unknown measure, bad weight, missing section)
    #[error("configuration error: {0}")]
    Config(String),

    /// The approximate index returned a key the inverse map does not know
    #[error("index key '{key}' has no entry in the inverse map")]
    MissingInverseEntry { key: String },

    /// A found text has no external id in the corpus table
    #[error("no id registered for text '{text}'")]
    MissingId { text: String },

    /// Serialized sequence representation could not be read or written
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A regression predictor produced a score that cannot be ranked
    #[error("prediction error: {0}")]
    Prediction(String),

    /// A scorer was given a sequence kind it cannot compare
    #[error("scorer '{scorer}' cannot compare {representation} sequences")]
    RepresentationMismatch {
        scorer: &'static str,
        representation: &'static str,
    },
}

impl ResemblaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn table(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Table {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ResemblaError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for Resembla operations
pub type Result<T> = std::result::Result<T, ResemblaError>;
