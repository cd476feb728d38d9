//! Race identifier format consistency over a partition column.

use super::{DatasetVerifier, PartitionReports};
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use crate::race_id::decode_race_identifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use futures::future::join_all;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierReport {
    pub partition: String,
    pub column: String,
    pub total_values: usize,
    pub valid: usize,
    pub malformed: usize,
    pub null_count: usize,
    /// Malformed values that would decode once a float rendering (`.0`) or
    /// surrounding whitespace is removed. Counted in `malformed` as well.
    pub float_rendered: usize,
    /// Distinct malformed values, sorted, capped at the verifier's sample limit.
    pub malformed_samples: Vec<String>,
    /// Valid rows per venue code.
    pub per_venue: BTreeMap<String, usize>,
    pub distinct_races: usize,
    pub years: Vec<u16>,
}

impl IdentifierReport {
    pub fn is_clean(&self) -> bool {
        self.malformed == 0
    }
}

fn is_float_rendering(raw: &str) -> bool {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    stripped != raw && decode_race_identifier(stripped).is_ok()
}

/// Pure part of the identifier check.
pub fn summarize_identifiers<S: AsRef<str>>(
    partition: String,
    column: String,
    values: &[Option<S>],
    sample_limit: usize,
) -> IdentifierReport {
    let mut valid = 0;
    let mut null_count = 0;
    let mut malformed_values = BTreeSet::new();
    let mut malformed = 0;
    let mut float_rendered = 0;
    let mut per_venue: BTreeMap<String, usize> = BTreeMap::new();
    let mut races = BTreeSet::new();
    let mut years = BTreeSet::new();

    for value in values {
        let Some(raw) = value.as_ref().map(|v| v.as_ref()) else {
            null_count += 1;
            continue;
        };
        match decode_race_identifier(raw) {
            Ok(key) => {
                valid += 1;
                *per_venue.entry(key.venue_code().to_string()).or_default() += 1;
                years.insert(key.year);
                races.insert(key);
            }
            Err(_) => {
                malformed += 1;
                if is_float_rendering(raw) {
                    float_rendered += 1;
                }
                malformed_values.insert(raw.to_string());
            }
        }
    }

    IdentifierReport {
        partition,
        column,
        total_values: values.len(),
        valid,
        malformed,
        null_count,
        float_rendered,
        malformed_samples: malformed_values.into_iter().take(sample_limit).collect(),
        per_venue,
        distinct_races: races.len(),
        years: years.into_iter().collect(),
    }
}

impl DatasetVerifier {
    /// Decode every identifier in `column` and report those that fail.
    pub async fn check_identifier_format(
        &self,
        partition: &Path,
        column: &str,
    ) -> Result<IdentifierReport, VerifyError> {
        let values = self.reader().read_column(partition, column).await?;
        let report = summarize_identifiers(
            partition_key(partition),
            column.to_string(),
            &values,
            self.sample_limit(),
        );
        tracing::info!(
            partition = %partition.display(),
            column,
            malformed = report.malformed,
            "Identifier format check complete"
        );
        Ok(report)
    }

    /// [`check_identifier_format`](Self::check_identifier_format) for every
    /// partition of a dataset. Partitions lacking the column or failing to
    /// read are recorded as unreadable.
    pub async fn identifier_format_by_partition(
        &self,
        partitions: &[PathBuf],
        column: &str,
    ) -> Result<PartitionReports<IdentifierReport>, VerifyError> {
        let results =
            join_all(partitions.iter().map(|p| self.check_identifier_format(p, column))).await;
        PartitionReports::collect(partitions.iter().cloned().zip(results))
    }
}
