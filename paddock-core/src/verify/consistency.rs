//! Logical consistency of race-result rows.
//!
//! Three row rules: a finishing position never exceeds the field size, race
//! distances fall within 100..=4000 m, and finish times within 50..=500 s.
//! A rule whose columns a partition lacks is skipped for that partition.

use super::DatasetVerifier;
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const FINISH_POSITION_COLUMN: &str = "finish_position";
pub const HEAD_COUNT_COLUMN: &str = "head_count";
pub const DISTANCE_COLUMN: &str = "distance_m";
pub const FINISH_TIME_COLUMN: &str = "finish_time_seconds";

pub const DISTANCE_RANGE_M: RangeInclusive<f64> = 100.0..=4000.0;
pub const FINISH_TIME_RANGE_S: RangeInclusive<f64> = 50.0..=500.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub partitions: Vec<String>,
    pub rows_checked: usize,
    pub position_exceeds_head_count: usize,
    pub distance_out_of_range: usize,
    pub finish_time_out_of_range: usize,
    /// Rule columns absent from some partition, per partition.
    pub skipped_columns: BTreeMap<String, Vec<String>>,
    pub unreadable: BTreeMap<String, String>,
}

impl ConsistencyReport {
    pub fn violations(&self) -> usize {
        self.position_exceeds_head_count + self.distance_out_of_range + self.finish_time_out_of_range
    }

    pub fn is_clean(&self) -> bool {
        self.violations() == 0 && self.unreadable.is_empty()
    }
}

/// Numeric view of a cell. Non-numeric cells (`中止`, `除外`) are not
/// judged by any rule.
fn numeric(cell: &Option<String>) -> Option<f64> {
    cell.as_deref().and_then(|v| v.trim().parse::<f64>().ok())
}

fn out_of_range(values: &[Option<String>], range: &RangeInclusive<f64>) -> usize {
    values
        .iter()
        .filter_map(numeric)
        .filter(|v| !range.contains(v))
        .count()
}

/// Row violations of one partition's columns. `None` marks an absent column.
pub fn count_violations(
    finish_position: Option<&[Option<String>]>,
    head_count: Option<&[Option<String>]>,
    distance: Option<&[Option<String>]>,
    finish_time: Option<&[Option<String>]>,
) -> (usize, usize, usize) {
    let positions = match (finish_position, head_count) {
        (Some(positions), Some(heads)) => positions
            .iter()
            .zip(heads)
            .filter(|(p, h)| matches!((numeric(p), numeric(h)), (Some(p), Some(h)) if p > h))
            .count(),
        _ => 0,
    };
    let distances = distance.map_or(0, |d| out_of_range(d, &DISTANCE_RANGE_M));
    let times = finish_time.map_or(0, |t| out_of_range(t, &FINISH_TIME_RANGE_S));
    (positions, distances, times)
}

impl DatasetVerifier {
    async fn optional_column(
        &self,
        partition: &Path,
        present: bool,
        column: &str,
    ) -> Result<Option<Vec<Option<String>>>, VerifyError> {
        if !present {
            return Ok(None);
        }
        Ok(Some(self.reader().read_column(partition, column).await?))
    }

    async fn partition_violations(
        &self,
        partition: &Path,
        report: &mut ConsistencyReport,
    ) -> Result<(), VerifyError> {
        let meta = self.reader().describe(partition).await?;
        let rule_columns = [
            FINISH_POSITION_COLUMN,
            HEAD_COUNT_COLUMN,
            DISTANCE_COLUMN,
            FINISH_TIME_COLUMN,
        ];
        let skipped: Vec<String> = rule_columns
            .iter()
            .filter(|c| !meta.has_column(c))
            .map(|c| c.to_string())
            .collect();

        let has_positions =
            meta.has_column(FINISH_POSITION_COLUMN) && meta.has_column(HEAD_COUNT_COLUMN);
        let positions = self
            .optional_column(partition, has_positions, FINISH_POSITION_COLUMN)
            .await?;
        let heads = self
            .optional_column(partition, has_positions, HEAD_COUNT_COLUMN)
            .await?;
        let distance = self
            .optional_column(partition, meta.has_column(DISTANCE_COLUMN), DISTANCE_COLUMN)
            .await?;
        let times = self
            .optional_column(partition, meta.has_column(FINISH_TIME_COLUMN), FINISH_TIME_COLUMN)
            .await?;

        let (p, d, t) = count_violations(
            positions.as_deref(),
            heads.as_deref(),
            distance.as_deref(),
            times.as_deref(),
        );
        report.rows_checked += meta.row_count;
        report.position_exceeds_head_count += p;
        report.distance_out_of_range += d;
        report.finish_time_out_of_range += t;
        if !skipped.is_empty() {
            report.skipped_columns.insert(partition_key(partition), skipped);
        }
        Ok(())
    }

    /// Apply the race-result consistency rules to every partition.
    pub async fn check_race_consistency(
        &self,
        partitions: &[PathBuf],
    ) -> Result<ConsistencyReport, VerifyError> {
        if partitions.is_empty() {
            return Err(VerifyError::empty_dataset(None));
        }

        let mut report = ConsistencyReport {
            partitions: partitions.iter().map(|p| partition_key(p)).collect(),
            ..ConsistencyReport::default()
        };
        for partition in partitions {
            match self.partition_violations(partition, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_partition_fault() => {
                    report.unreadable.insert(partition_key(partition), e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            partitions = partitions.len(),
            violations = report.violations(),
            "Race consistency check complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_csv;
    use pretty_assertions::assert_eq;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect()
    }

    #[test]
    fn test_count_violations() {
        let positions = cells(&["1", "17", "中止", "3"]);
        let heads = cells(&["16", "16", "16", ""]);
        let distance = cells(&["1200", "5000", "99", "2400"]);
        let times = cells(&["70.2", "49.9", "", "150.0"]);
        let counted = count_violations(
            Some(positions.as_slice()),
            Some(heads.as_slice()),
            Some(distance.as_slice()),
            Some(times.as_slice()),
        );
        assert_eq!(counted, (1, 2, 1));
    }

    #[test]
    fn test_position_rule_needs_both_columns() {
        let positions = cells(&["18"]);
        assert_eq!(count_violations(Some(positions.as_slice()), None, None, None), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_check_race_consistency_across_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let broken = dir.path().join("c.parquet");
        write_csv(
            &a,
            "race_id,finish_position,head_count,distance_m",
            &["202006030101,1,16,1200", "202006030101,18,16,1200"],
        );
        write_csv(&b, "race_id,distance_m", &["202006030201,4200"]);
        std::fs::write(&broken, b"not parquet").unwrap();

        let report = DatasetVerifier::default()
            .check_race_consistency(&[a, b.clone(), broken.clone()])
            .await
            .unwrap();
        assert_eq!(report.rows_checked, 3);
        assert_eq!(report.position_exceeds_head_count, 1);
        assert_eq!(report.distance_out_of_range, 1);
        assert_eq!(report.finish_time_out_of_range, 0);
        assert_eq!(
            report.skipped_columns.get(&partition_key(&b)),
            Some(&vec![
                "finish_position".to_string(),
                "head_count".to_string(),
                "finish_time_seconds".to_string()
            ])
        );
        assert!(report.unreadable.contains_key(&partition_key(&broken)));
        assert!(!report.is_clean());
    }
}
