//! The dataset verifier: a stateless battery of integrity checks.
//!
//! Each check returns a plain report. Structural mistakes (no partitions, a
//! requested column that does not exist, a malformed identifier passed
//! directly) are errors; everything the data itself reveals is report data.

pub mod consistency;
pub mod counts;
pub mod coverage;
pub mod identifiers;
pub mod leakage;
pub mod quality;
pub mod required;
pub mod schema;

pub use consistency::ConsistencyReport;
pub use counts::{CountReport, DuplicatedKey};
pub use coverage::{CoverageReport, summarize_dates};
pub use identifiers::IdentifierReport;
pub use leakage::{LeakageReport, ManifestDiffReport, check_feature_leakage, diff_manifest_columns};
pub use quality::{ColumnQualityReport, QualityRules};
pub use required::RequiredColumnsReport;
pub use schema::SchemaReport;

use crate::data::partition::partition_key;
use crate::data::source::{FileReader, PartitionReader};
use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of malformed identifiers echoed back in a report.
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

/// Runs integrity checks against partitions through a pluggable reader.
///
/// Holds no mutable state; clones share the reader and may run checks
/// concurrently.
#[derive(Clone)]
pub struct DatasetVerifier {
    reader: Arc<dyn PartitionReader>,
    sample_limit: usize,
}

impl DatasetVerifier {
    pub fn new(reader: Arc<dyn PartitionReader>) -> Self {
        Self {
            reader,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn reader(&self) -> &dyn PartitionReader {
        self.reader.as_ref()
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }
}

/// Per-partition reports of a single-partition check run over a dataset.
/// A partition the check cannot read is recorded, not fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionReports<T> {
    pub reports: Vec<T>,
    pub unreadable: BTreeMap<String, String>,
}

impl<T> PartitionReports<T> {
    /// Sort results into reports and unreadable partitions. Errors that are
    /// not about a single partition are returned as-is.
    pub fn collect(
        results: impl IntoIterator<Item = (PathBuf, Result<T, VerifyError>)>,
    ) -> Result<Self, VerifyError> {
        let mut reports = Vec::new();
        let mut unreadable = BTreeMap::new();
        for (path, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) if e.is_partition_fault() => {
                    tracing::debug!(
                        partition = %path.display(),
                        error = %e,
                        "Partition recorded as unreadable"
                    );
                    unreadable.insert(partition_key(&path), e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self {
            reports,
            unreadable,
        })
    }

    pub fn partitions_checked(&self) -> usize {
        self.reports.len() + self.unreadable.len()
    }
}

impl Default for DatasetVerifier {
    fn default() -> Self {
        Self::new(Arc::new(FileReader::default()))
    }
}

impl std::fmt::Debug for DatasetVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetVerifier")
            .field("sample_limit", &self.sample_limit)
            .finish_non_exhaustive()
    }
}
