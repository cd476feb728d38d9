//! Cross-partition schema consistency.

use super::DatasetVerifier;
use crate::data::partition::{PartitionMeta, partition_key};
use crate::data::schema::ColumnType;
use crate::error::VerifyError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Column-set differences across the partitions of one logical dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Partitions in the order they were supplied.
    pub partitions: Vec<String>,
    /// Sorted union of every readable partition's columns.
    pub reference_columns: Vec<String>,
    /// Sorted intersection of every readable partition's columns.
    pub common_columns: Vec<String>,
    /// Union columns absent from a partition. Clean partitions are omitted.
    pub per_partition_missing: BTreeMap<String, Vec<String>>,
    /// Columns a partition has that not every partition has.
    pub per_partition_extra: BTreeMap<String, Vec<String>>,
    /// Columns whose dtype disagrees between partitions.
    pub dtype_conflicts: BTreeMap<String, BTreeMap<String, ColumnType>>,
    pub row_counts: BTreeMap<String, usize>,
    pub unreadable: BTreeMap<String, String>,
}

impl SchemaReport {
    pub fn is_consistent(&self) -> bool {
        self.per_partition_missing.is_empty()
            && self.per_partition_extra.is_empty()
            && self.unreadable.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.row_counts.values().sum()
    }
}

impl DatasetVerifier {
    /// Compare column sets across partitions using metadata-only reads where
    /// the format allows.
    ///
    /// Fails with `EmptyDataset` for an empty input. A partition that cannot
    /// be read is listed under `unreadable` and left out of the union and
    /// intersection.
    pub async fn check_schema_consistency(
        &self,
        partitions: &[PathBuf],
    ) -> Result<SchemaReport, VerifyError> {
        if partitions.is_empty() {
            return Err(VerifyError::empty_dataset(None));
        }

        let described = join_all(partitions.iter().map(|p| self.reader().describe(p))).await;

        let mut metas: Vec<(String, PartitionMeta)> = Vec::new();
        let mut unreadable = BTreeMap::new();
        for (path, result) in partitions.iter().zip(described) {
            let key = partition_key(path);
            match result {
                Ok(meta) => metas.push((key, meta)),
                Err(e) => {
                    tracing::debug!(partition = %key, error = %e, "Partition unreadable");
                    unreadable.insert(key, e.to_string());
                }
            }
        }

        let report = build_schema_report(
            partitions.iter().map(|p| partition_key(p)).collect(),
            &metas,
            unreadable,
        );
        tracing::info!(
            partitions = partitions.len(),
            consistent = report.is_consistent(),
            "Schema consistency check complete"
        );
        Ok(report)
    }
}

/// Pure part of the schema check, over already-described partitions.
pub fn build_schema_report(
    partitions: Vec<String>,
    metas: &[(String, PartitionMeta)],
    unreadable: BTreeMap<String, String>,
) -> SchemaReport {
    let sets: Vec<(&str, BTreeSet<&str>)> = metas
        .iter()
        .map(|(key, meta)| (key.as_str(), meta.column_names().collect()))
        .collect();

    let union: BTreeSet<&str> = sets.iter().flat_map(|(_, s)| s.iter().copied()).collect();
    let intersection: BTreeSet<&str> = match sets.split_first() {
        Some(((_, first), rest)) => first
            .iter()
            .copied()
            .filter(|c| rest.iter().all(|(_, s)| s.contains(c)))
            .collect(),
        None => BTreeSet::new(),
    };

    let mut per_partition_missing = BTreeMap::new();
    let mut per_partition_extra = BTreeMap::new();
    for (key, set) in &sets {
        let missing: Vec<String> = union.difference(set).map(|c| c.to_string()).collect();
        if !missing.is_empty() {
            per_partition_missing.insert(key.to_string(), missing);
        }
        let extra: Vec<String> = set
            .difference(&intersection)
            .map(|c| c.to_string())
            .collect();
        if !extra.is_empty() {
            per_partition_extra.insert(key.to_string(), extra);
        }
    }

    let mut observed: BTreeMap<&str, BTreeMap<String, ColumnType>> = BTreeMap::new();
    for (key, meta) in metas {
        for column in &meta.columns {
            if column.dtype.is_informative() {
                observed
                    .entry(column.name.as_str())
                    .or_default()
                    .insert(key.clone(), column.dtype);
            }
        }
    }
    let dtype_conflicts = observed
        .into_iter()
        .filter(|(_, by_partition)| {
            let distinct: BTreeSet<_> = by_partition.values().collect();
            distinct.len() > 1
        })
        .map(|(name, by_partition)| (name.to_string(), by_partition))
        .collect();

    let row_counts = metas
        .iter()
        .map(|(key, meta)| (key.clone(), meta.row_count))
        .collect();

    SchemaReport {
        partitions,
        reference_columns: union.iter().map(|c| c.to_string()).collect(),
        common_columns: intersection.iter().map(|c| c.to_string()).collect(),
        per_partition_missing,
        per_partition_extra,
        dtype_conflicts,
        row_counts,
        unreadable,
    }
}
