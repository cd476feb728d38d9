//! Per-key row counts across partitions that should not overlap.

use super::DatasetVerifier;
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A key with rows in more than one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatedKey {
    pub key: String,
    /// Row count per partition, only partitions where the key occurs.
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    pub group_by_key: String,
    pub partitions: Vec<String>,
    pub total_rows: usize,
    pub total_keys: usize,
    pub null_key_rows: usize,
    /// Keys present in several partitions, sorted by key.
    pub duplicated: Vec<DuplicatedKey>,
    /// Expected keys with zero rows in every partition, sorted.
    pub missing: Vec<String>,
    pub unreadable: BTreeMap<String, String>,
}

impl CountReport {
    pub fn is_clean(&self) -> bool {
        self.duplicated.is_empty() && self.missing.is_empty() && self.unreadable.is_empty()
    }
}

/// Per-partition key counts, already read.
pub type PartitionCounts = (String, BTreeMap<String, usize>, usize);

/// Pure part of the count diff.
pub fn build_count_report(
    group_by_key: String,
    partitions: Vec<String>,
    counted: Vec<PartitionCounts>,
    expected_keys: Option<&BTreeSet<String>>,
    unreadable: BTreeMap<String, String>,
) -> CountReport {
    let mut by_key: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    let mut total_rows = 0;
    let mut null_key_rows = 0;

    for (partition, counts, nulls) in counted {
        null_key_rows += nulls;
        total_rows += nulls;
        for (key, n) in counts {
            total_rows += n;
            by_key.entry(key).or_default().insert(partition.clone(), n);
        }
    }

    let missing = expected_keys
        .map(|expected| {
            expected
                .iter()
                .filter(|k| !by_key.contains_key(k.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let total_keys = by_key.len();
    let duplicated = by_key
        .into_iter()
        .filter(|(_, counts)| counts.len() > 1)
        .map(|(key, counts)| DuplicatedKey { key, counts })
        .collect();

    CountReport {
        group_by_key,
        partitions,
        total_rows,
        total_keys,
        null_key_rows,
        duplicated,
        missing,
        unreadable,
    }
}

impl DatasetVerifier {
    /// Count rows per `group_by_key` value in each partition.
    ///
    /// A key occurring in more than one partition is reported as duplicated;
    /// keys from `expected_keys` that occur nowhere are reported as missing.
    /// Partitions lacking the key column are listed as unreadable.
    pub async fn diff_partition_counts(
        &self,
        partitions: &[PathBuf],
        group_by_key: &str,
        expected_keys: Option<&BTreeSet<String>>,
    ) -> Result<CountReport, VerifyError> {
        if partitions.is_empty() {
            return Err(VerifyError::empty_dataset(None));
        }

        let reads = join_all(
            partitions
                .iter()
                .map(|p| self.reader().read_column(p, group_by_key)),
        )
        .await;

        let mut counted = Vec::new();
        let mut unreadable = BTreeMap::new();
        for (path, result) in partitions.iter().zip(reads) {
            let key = partition_key(path);
            match result {
                Ok(values) => {
                    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                    let mut nulls = 0;
                    for value in values {
                        match value {
                            Some(v) => *counts.entry(v).or_default() += 1,
                            None => nulls += 1,
                        }
                    }
                    counted.push((key, counts, nulls));
                }
                Err(e) => {
                    tracing::debug!(partition = %key, error = %e, "Partition skipped in count diff");
                    unreadable.insert(key, e.to_string());
                }
            }
        }

        let report = build_count_report(
            group_by_key.to_string(),
            partitions.iter().map(|p| partition_key(p)).collect(),
            counted,
            expected_keys,
            unreadable,
        );
        tracing::info!(
            key = group_by_key,
            duplicated = report.duplicated.len(),
            missing = report.missing.len(),
            "Partition count diff complete"
        );
        Ok(report)
    }
}
