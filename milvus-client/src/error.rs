use std::time::Duration;

use thiserror::Error;

use crate::client::Operation;

/// Common error type for Milvus client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Milvus {operation} failed (code {code}): {message}")]
    Api {
        operation: Operation,
        code: i64,
        message: String,
    },

    #[error("Milvus {operation} returned no data")]
    MissingData { operation: Operation },

    #[error("Milvus {operation} timed out after {after:?}")]
    Timeout {
        operation: Operation,
        after: Duration,
    },
}

impl Error {
    /// The remote operation this error belongs to, when there is one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Api { operation, .. }
            | Error::MissingData { operation }
            | Error::Timeout { operation, .. } => Some(*operation),
            Error::Config(_) | Error::Http(_) => None,
        }
    }
}

/// Result type alias using the client's Error.
pub type Result<T> = std::result::Result<T, Error>;
