//! Date coverage and gap detection over a partition's date column.

use super::DatasetVerifier;
use crate::data::dates::parse_calendar_date;
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Coverage of a date column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub partition: String,
    pub column: String,
    pub row_count: usize,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub unique_dates: usize,
    /// Dates in `[min_date, max_date]` with no rows that are not known
    /// non-event dates. Sorted ascending.
    pub gap_dates: Vec<NaiveDate>,
    /// Rows whose value is null or not a recognisable date.
    pub unparseable_count: usize,
    /// Partitions left out of a dataset-wide check, with the reason.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unreadable: BTreeMap<String, String>,
}

impl CoverageReport {
    pub fn has_gaps(&self) -> bool {
        !self.gap_dates.is_empty()
    }
}

/// Date statistics independent of where the values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSummary {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub unique_dates: usize,
    pub gap_dates: Vec<NaiveDate>,
    pub unparseable_count: usize,
}

/// Summarise raw date cells against a caller-supplied set of non-event dates.
pub fn summarize_dates<S: AsRef<str>>(
    values: &[Option<S>],
    known_non_event_dates: &BTreeSet<NaiveDate>,
) -> DateSummary {
    let mut seen = BTreeSet::new();
    let mut unparseable_count = 0;
    for value in values {
        match value.as_ref().and_then(|v| parse_calendar_date(v.as_ref())) {
            Some(date) => {
                seen.insert(date);
            }
            None => unparseable_count += 1,
        }
    }

    let min_date = seen.first().copied();
    let max_date = seen.last().copied();
    let gap_dates = match (min_date, max_date) {
        (Some(min), Some(max)) => min
            .iter_days()
            .take_while(|d| *d <= max)
            .filter(|d| !seen.contains(d) && !known_non_event_dates.contains(d))
            .collect(),
        _ => Vec::new(),
    };

    DateSummary {
        min_date,
        max_date,
        unique_dates: seen.len(),
        gap_dates,
        unparseable_count,
    }
}

fn coverage_report(
    partition: String,
    column: &str,
    values: &[Option<String>],
    known_non_event_dates: &BTreeSet<NaiveDate>,
) -> CoverageReport {
    let summary = summarize_dates(values, known_non_event_dates);
    CoverageReport {
        partition,
        column: column.to_string(),
        row_count: values.len(),
        min_date: summary.min_date,
        max_date: summary.max_date,
        unique_dates: summary.unique_dates,
        gap_dates: summary.gap_dates,
        unparseable_count: summary.unparseable_count,
        unreadable: BTreeMap::new(),
    }
}

impl DatasetVerifier {
    /// Compute min/max/unique dates and the gap set for one partition.
    ///
    /// Fails with `MissingColumn` when `date_column` is absent.
    pub async fn check_date_coverage(
        &self,
        partition: &Path,
        date_column: &str,
        known_non_event_dates: &BTreeSet<NaiveDate>,
    ) -> Result<CoverageReport, VerifyError> {
        let values = self.reader().read_column(partition, date_column).await?;
        let report = coverage_report(
            partition_key(partition),
            date_column,
            &values,
            known_non_event_dates,
        );

        tracing::info!(
            partition = %partition.display(),
            column = date_column,
            gaps = report.gap_dates.len(),
            unparseable = report.unparseable_count,
            "Date coverage check complete"
        );
        Ok(report)
    }

    /// Coverage over the union of several partitions, so that gaps falling
    /// on a partition boundary are still found. `label` names the dataset in
    /// the report. A partition that cannot be read, or lacks the column, is
    /// recorded in `unreadable` and the rest are still summarised.
    pub async fn check_dataset_coverage(
        &self,
        label: &str,
        partitions: &[PathBuf],
        date_column: &str,
        known_non_event_dates: &BTreeSet<NaiveDate>,
    ) -> Result<CoverageReport, VerifyError> {
        if partitions.is_empty() {
            return Err(VerifyError::empty_dataset(None));
        }
        let reads = join_all(
            partitions
                .iter()
                .map(|p| self.reader().read_column(p, date_column)),
        )
        .await;

        let mut values = Vec::new();
        let mut unreadable = BTreeMap::new();
        for (path, read) in partitions.iter().zip(reads) {
            match read {
                Ok(column) => values.extend(column),
                Err(e) if e.is_partition_fault() => {
                    unreadable.insert(partition_key(path), e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        let mut report =
            coverage_report(label.to_string(), date_column, &values, known_non_event_dates);
        report.unreadable = unreadable;
        tracing::info!(
            dataset = label,
            partitions = partitions.len(),
            gaps = report.gap_dates.len(),
            unreadable = report.unreadable.len(),
            "Dataset date coverage check complete"
        );
        Ok(report)
    }
}
