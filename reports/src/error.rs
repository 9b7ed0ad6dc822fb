//! Error types for report construction.

use crate::storage::StorageError;

/// Result type for inference and report-building operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Error type for inference and report-building operations
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Inputs violate a structural requirement (mismatched universes,
    /// missing metadata, bad selections, bad epsilon sequences).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A degenerate probability surfaced during likelihood or mixture
    /// computation.
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ReportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ReportError::Validation(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        ReportError::Numerical(msg.into())
    }

    /// Returns `true` for [`ReportError::Validation`].
    pub fn is_validation(&self) -> bool {
        matches!(self, ReportError::Validation(_))
    }

    /// Returns `true` for [`ReportError::Numerical`].
    pub fn is_numerical(&self) -> bool {
        matches!(self, ReportError::Numerical(_))
    }
}
