//! Error types for the paddock-core crate.

use std::path::Path;
use thiserror::Error;

/// Top-level error type for verifier operations.
///
/// Only structural problems are errors. Data-quality findings (schema drift,
/// date gaps, leakage, duplicated keys) are returned inside reports.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Empty dataset: no partitions resolved{}", location_suffix(.0))]
    EmptyDataset(Option<String>),

    #[error("Missing column '{column}' in partition {partition}")]
    MissingColumn { partition: String, column: String },

    #[error("Malformed race identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    #[error("Unreadable partition {partition}: {reason}")]
    UnreadablePartition { partition: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn location_suffix(location: &Option<String>) -> String {
    location
        .as_deref()
        .map(|l| format!(" under {l}"))
        .unwrap_or_default()
}

impl VerifyError {
    pub fn empty_dataset(location: Option<&Path>) -> Self {
        Self::EmptyDataset(location.map(|p| p.display().to_string()))
    }

    pub fn missing_column(partition: &Path, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            partition: partition.display().to_string(),
            column: column.into(),
        }
    }

    pub fn malformed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn unreadable(partition: &Path, reason: impl ToString) -> Self {
        Self::UnreadablePartition {
            partition: partition.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a low-level read failure as an unreadable-partition error,
    /// leaving structural errors that already carry context untouched.
    pub fn into_partition_error(self, partition: &Path) -> Self {
        match self {
            Self::MissingColumn { .. }
            | Self::UnreadablePartition { .. }
            | Self::EmptyDataset(_) => self,
            other => Self::unreadable(partition, other),
        }
    }

    /// True for errors that describe a single bad partition rather than a
    /// caller mistake.
    pub fn is_partition_fault(&self) -> bool {
        matches!(
            self,
            Self::UnreadablePartition { .. } | Self::MissingColumn { .. }
        )
    }
}
