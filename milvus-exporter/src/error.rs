//! Errors raised while collecting a scrape.

use thiserror::Error;

/// Result type alias using [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors that abort a collect cycle.
///
/// A scrape either yields every sample or one of these; partial sample lists
/// are never returned.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// A remote call made by a producer failed.
    #[error("Producer '{producer}' failed: {source}")]
    Remote {
        producer: &'static str,
        #[source]
        source: milvus_client::Error,
    },

    /// A sample was built with the wrong number of label values.
    #[error("Metric '{metric}' expects {expected} label values, got {actual}")]
    LabelMismatch {
        metric: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl ScrapeError {
    /// Wrap a client error raised by the named producer.
    pub fn remote(producer: &'static str, source: milvus_client::Error) -> Self {
        Self::Remote { producer, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use milvus_client::Operation;

    #[test]
    fn test_remote_error_display_names_producer_and_operation() {
        let err = ScrapeError::remote(
            "loading_progress",
            milvus_client::Error::Api {
                operation: Operation::GetLoadingProgress,
                code: 100,
                message: "collection not found".to_string(),
            },
        );

        let msg = err.to_string();
        assert!(msg.contains("loading_progress"));
        assert!(msg.contains("GetLoadingProgress"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_label_mismatch_display() {
        let err = ScrapeError::LabelMismatch {
            metric: "indexed_rows",
            expected: 5,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Metric 'indexed_rows' expects 5 label values, got 2"
        );
    }
}
