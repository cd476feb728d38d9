//! Required-column presence for one partition.

use super::{DatasetVerifier, PartitionReports};
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use futures::future::join_all;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredColumnsReport {
    pub partition: String,
    pub required: Vec<String>,
    /// Required columns the partition lacks, in the order they were requested.
    pub missing: Vec<String>,
    pub passed: bool,
}

impl DatasetVerifier {
    /// Check that every column in `required` exists. Metadata-only.
    pub async fn check_required_columns(
        &self,
        partition: &Path,
        required: &[String],
    ) -> Result<RequiredColumnsReport, VerifyError> {
        let meta = self.reader().describe(partition).await?;
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !meta.has_column(c))
            .cloned()
            .collect();

        if !missing.is_empty() {
            tracing::warn!(partition = %partition.display(), ?missing, "Required columns missing");
        }

        Ok(RequiredColumnsReport {
            partition: partition_key(partition),
            required: required.to_vec(),
            passed: missing.is_empty(),
            missing,
        })
    }

    /// [`check_required_columns`](Self::check_required_columns) for every
    /// partition of a dataset.
    pub async fn required_columns_by_partition(
        &self,
        partitions: &[PathBuf],
        required: &[String],
    ) -> Result<PartitionReports<RequiredColumnsReport>, VerifyError> {
        let results =
            join_all(partitions.iter().map(|p| self.check_required_columns(p, required))).await;
        PartitionReports::collect(partitions.iter().cloned().zip(results))
    }
}
