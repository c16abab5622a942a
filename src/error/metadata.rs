use thiserror::Error as ThisError;

use super::{IsRetryable, UpstairsError};

/// Failure of a child fetch. Scoped to one tree node; never aborts the tree.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MetadataError {
    /// The parent no longer exists on the backend.
    #[error("Metadata not found: {0}")]
    NotFound(String),

    #[error("Metadata fetch failed: {0}")]
    FetchFailed(String),
}

impl From<UpstairsError> for MetadataError {
    fn from(e: UpstairsError) -> Self {
        if e.is_not_found() {
            MetadataError::NotFound(e.to_string())
        } else {
            MetadataError::FetchFailed(e.to_string())
        }
    }
}

impl IsRetryable for MetadataError {
    fn is_retryable(&self) -> bool {
        matches!(self, MetadataError::FetchFailed(_))
    }
}
