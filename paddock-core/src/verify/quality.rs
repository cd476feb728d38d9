//! Column quality over a whole dataset: null counts, missing rates, numeric
//! dtypes and a minimum row count. Metadata-only.

use super::DatasetVerifier;
use crate::data::partition::{PartitionMeta, partition_key};
use crate::data::schema::ColumnType;
use crate::error::VerifyError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Thresholds a dataset's columns are held to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityRules {
    pub numeric_columns: Vec<String>,
    pub max_missing_rate: Option<f64>,
    pub min_rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQualityReport {
    pub partitions: Vec<String>,
    pub total_rows: usize,
    pub min_rows: Option<usize>,
    pub below_min_rows: bool,
    /// Null cells per column, summed over the partitions that carry it.
    pub null_counts: BTreeMap<String, usize>,
    /// Columns for which some partition recorded no null statistics.
    pub unknown_null_counts: Vec<String>,
    pub max_missing_rate: Option<f64>,
    /// Columns whose null fraction exceeds `max_missing_rate`.
    pub high_missing: BTreeMap<String, f64>,
    /// Expected-numeric columns stored with another type, with the types seen.
    pub non_numeric: BTreeMap<String, BTreeSet<ColumnType>>,
    pub unreadable: BTreeMap<String, String>,
}

impl ColumnQualityReport {
    pub fn is_clean(&self) -> bool {
        !self.below_min_rows
            && self.high_missing.is_empty()
            && self.non_numeric.is_empty()
            && self.unreadable.is_empty()
    }
}

fn is_numeric(dtype: ColumnType) -> bool {
    matches!(dtype, ColumnType::Integer | ColumnType::Float)
}

/// Pure part of the quality check.
pub fn build_quality_report(
    partitions: Vec<String>,
    metas: &[PartitionMeta],
    rules: &QualityRules,
    unreadable: BTreeMap<String, String>,
) -> ColumnQualityReport {
    let total_rows = metas.iter().map(|m| m.row_count).sum();

    // column -> (null cells, rows of partitions carrying the column)
    let mut tallies: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut unknown = BTreeSet::new();
    let mut non_numeric: BTreeMap<String, BTreeSet<ColumnType>> = BTreeMap::new();

    for meta in metas {
        for column in &meta.columns {
            match column.null_count {
                Some(nulls) => {
                    let tally = tallies.entry(column.name.clone()).or_default();
                    tally.0 += nulls;
                    tally.1 += meta.row_count;
                }
                None => {
                    unknown.insert(column.name.clone());
                }
            }
            if rules.numeric_columns.contains(&column.name)
                && column.dtype.is_informative()
                && !is_numeric(column.dtype)
            {
                non_numeric
                    .entry(column.name.clone())
                    .or_default()
                    .insert(column.dtype);
            }
        }
    }

    let high_missing = match rules.max_missing_rate {
        Some(limit) => tallies
            .iter()
            .filter(|(name, _)| !unknown.contains(*name))
            .filter_map(|(name, (nulls, rows))| {
                let rate = if *rows == 0 {
                    0.0
                } else {
                    *nulls as f64 / *rows as f64
                };
                (rate > limit).then(|| (name.clone(), rate))
            })
            .collect(),
        None => BTreeMap::new(),
    };

    ColumnQualityReport {
        partitions,
        total_rows,
        min_rows: rules.min_rows,
        below_min_rows: rules.min_rows.is_some_and(|min| total_rows < min),
        null_counts: tallies
            .into_iter()
            .filter(|(name, _)| !unknown.contains(name))
            .map(|(name, (nulls, _))| (name, nulls))
            .collect(),
        unknown_null_counts: unknown.into_iter().collect(),
        max_missing_rate: rules.max_missing_rate,
        high_missing,
        non_numeric,
        unreadable,
    }
}

impl DatasetVerifier {
    /// Null counts, missing rates and numeric dtypes across `partitions`,
    /// read from partition metadata only. Partitions that cannot be described
    /// are listed as unreadable.
    pub async fn check_column_quality(
        &self,
        partitions: &[PathBuf],
        rules: &QualityRules,
    ) -> Result<ColumnQualityReport, VerifyError> {
        if partitions.is_empty() {
            return Err(VerifyError::empty_dataset(None));
        }

        let described = join_all(partitions.iter().map(|p| self.reader().describe(p))).await;
        let mut metas = Vec::with_capacity(partitions.len());
        let mut unreadable = BTreeMap::new();
        for (path, result) in partitions.iter().zip(described) {
            match result {
                Ok(meta) => metas.push(meta),
                Err(e) if e.is_partition_fault() => {
                    unreadable.insert(partition_key(path), e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let report = build_quality_report(
            partitions.iter().map(|p| partition_key(p)).collect(),
            &metas,
            rules,
            unreadable,
        );
        tracing::info!(
            partitions = partitions.len(),
            rows = report.total_rows,
            high_missing = report.high_missing.len(),
            non_numeric = report.non_numeric.len(),
            "Column quality check complete"
        );
        Ok(report)
    }
}
