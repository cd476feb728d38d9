//! A configured battery of checks, run concurrently and summarised.
//!
//! Each check runs on its own tokio task. Outcomes are collected in the order
//! the checks were planned, and one check failing never stops the others.

use crate::config::{DatasetConfig, DatasetKind, VerifierConfig, read_key_list};
use crate::data::partition::resolve_all;
use crate::error::VerifyError;
use crate::features::{ForbiddenNames, load_manifest};
use crate::verify::{
    ColumnQualityReport, ConsistencyReport, CountReport, CoverageReport, DatasetVerifier,
    IdentifierReport, LeakageReport, ManifestDiffReport, PartitionReports, QualityRules,
    RequiredColumnsReport, SchemaReport,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome severity of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Fail,
    Warning,
    Pass,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warning => "warning",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one check in a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    /// The check's full report, or null when it failed structurally.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl CheckOutcome {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    fn with_details<T: Serialize>(mut self, report: &T) -> Result<Self, VerifyError> {
        self.details = serde_json::to_value(report)?;
        Ok(self)
    }
}

/// Aggregate of a suite run, in planned check order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub checks: Vec<CheckOutcome>,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl VerificationSummary {
    pub fn from_outcomes(checks: Vec<CheckOutcome>) -> Self {
        let count = |s: CheckStatus| checks.iter().filter(|c| c.status == s).count();
        Self {
            passed: count(CheckStatus::Pass),
            warnings: count(CheckStatus::Warning),
            failed: count(CheckStatus::Fail),
            checks,
        }
    }

    /// True when nothing failed. Warnings alone do not fail a run.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.warnings == 0
    }

    pub fn by_status(&self, status: CheckStatus) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(move |c| c.status == status)
    }
}

/// What a planned check does, with the inputs it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    Schema {
        root: PathBuf,
    },
    RequiredColumns {
        root: PathBuf,
        columns: Vec<String>,
    },
    ColumnQuality {
        root: PathBuf,
        rules: QualityRules,
    },
    DateCoverage {
        root: PathBuf,
        column: String,
    },
    IdentifierFormat {
        root: PathBuf,
        column: String,
    },
    PartitionCounts {
        root: PathBuf,
        key: String,
        expected_keys: Option<PathBuf>,
    },
    RaceConsistency {
        root: PathBuf,
    },
    FeatureLeakage {
        manifest: PathBuf,
    },
    ManifestDiff {
        manifest: PathBuf,
        partition: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: String,
    pub dataset: Option<DatasetKind>,
    pub kind: CheckKind,
}

/// Inputs shared by every check of one run.
#[derive(Debug, Clone, Default)]
pub struct SuiteContext {
    pub non_event_dates: BTreeSet<NaiveDate>,
    pub forbidden: ForbiddenNames,
    pub ignored_columns: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct CheckSuite {
    verifier: DatasetVerifier,
    checks: Vec<Check>,
    context: Arc<SuiteContext>,
}

fn dataset_checks(config: &VerifierConfig, dataset: &DatasetConfig) -> Vec<Check> {
    let root = config.resolve_path(&dataset.path);
    let kind = dataset.kind;
    let check = |suffix: &str, check_kind: CheckKind| Check {
        name: format!("{kind}.{suffix}"),
        dataset: Some(kind),
        kind: check_kind,
    };

    let mut checks = vec![check("schema", CheckKind::Schema { root: root.clone() })];
    if !dataset.required_columns.is_empty() {
        checks.push(check(
            "required_columns",
            CheckKind::RequiredColumns {
                root: root.clone(),
                columns: dataset.required_columns.clone(),
            },
        ));
    }
    if dataset.has_quality_rules() {
        checks.push(check(
            "column_quality",
            CheckKind::ColumnQuality {
                root: root.clone(),
                rules: dataset.quality_rules(),
            },
        ));
    }
    if let Some(column) = &dataset.date_column {
        checks.push(check(
            "date_coverage",
            CheckKind::DateCoverage {
                root: root.clone(),
                column: column.clone(),
            },
        ));
    }
    if let Some(column) = &dataset.id_column {
        checks.push(check(
            "identifier_format",
            CheckKind::IdentifierFormat {
                root: root.clone(),
                column: column.clone(),
            },
        ));
    }
    if let Some(key) = &dataset.count_key {
        checks.push(check(
            "partition_counts",
            CheckKind::PartitionCounts {
                root: root.clone(),
                key: key.clone(),
                expected_keys: dataset
                    .expected_keys_file
                    .as_ref()
                    .map(|p| config.resolve_path(p)),
            },
        ));
    }
    if dataset.consistency {
        checks.push(check("consistency", CheckKind::RaceConsistency { root }));
    }
    checks
}

impl CheckSuite {
    /// Plan the checks a configuration asks for.
    ///
    /// Fails only on configuration problems (an unreadable non-event date
    /// file); missing data surfaces later as failed outcomes.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, VerifyError> {
        let mut seen = BTreeSet::new();
        let mut checks = Vec::new();
        for dataset in &config.datasets {
            if seen.insert(dataset.kind) {
                checks.extend(dataset_checks(config, dataset));
            }
        }

        if let Some(manifest) = &config.manifest {
            let manifest = config.resolve_path(manifest);
            checks.push(Check {
                name: "features.leakage".into(),
                dataset: Some(DatasetKind::Features),
                kind: CheckKind::FeatureLeakage {
                    manifest: manifest.clone(),
                },
            });
            let partition = config
                .manifest_partition
                .as_ref()
                .or_else(|| config.dataset(DatasetKind::Features).map(|d| &d.path))
                .map(|p| config.resolve_path(p));
            if let Some(partition) = partition {
                checks.push(Check {
                    name: "features.manifest_diff".into(),
                    dataset: Some(DatasetKind::Features),
                    kind: CheckKind::ManifestDiff {
                        manifest,
                        partition,
                    },
                });
            }
        }

        let context = SuiteContext {
            non_event_dates: config.non_event_dates()?,
            forbidden: config.forbidden(),
            ignored_columns: config.ignored(),
        };
        Ok(Self {
            verifier: DatasetVerifier::default().with_sample_limit(config.sample_limit),
            checks,
            context: Arc::new(context),
        })
    }

    pub fn new(verifier: DatasetVerifier, checks: Vec<Check>, context: SuiteContext) -> Self {
        Self {
            verifier,
            checks,
            context: Arc::new(context),
        }
    }

    /// Keep only checks belonging to the given datasets.
    pub fn retain_datasets(mut self, kinds: &[DatasetKind]) -> Self {
        self.checks
            .retain(|c| c.dataset.is_some_and(|k| kinds.contains(&k)));
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run every planned check concurrently and summarise in planned order.
    pub async fn run(&self) -> VerificationSummary {
        let handles: Vec<_> = self
            .checks
            .iter()
            .cloned()
            .map(|check| {
                let verifier = self.verifier.clone();
                let context = Arc::clone(&self.context);
                let name = check.name.clone();
                let handle =
                    tokio::spawn(async move { run_check(&verifier, &check, &context).await });
                (name, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    CheckOutcome::new(&name, CheckStatus::Fail, format!("check aborted: {e}"))
                }
            };
            tracing::debug!(check = %outcome.name, status = %outcome.status, "Check finished");
            outcomes.push(outcome);
        }

        let summary = VerificationSummary::from_outcomes(outcomes);
        tracing::info!(
            passed = summary.passed,
            warnings = summary.warnings,
            failed = summary.failed,
            "Verification suite complete"
        );
        summary
    }
}

/// Run one check, turning structural errors into a failed outcome.
pub async fn run_check(
    verifier: &DatasetVerifier,
    check: &Check,
    context: &SuiteContext,
) -> CheckOutcome {
    match evaluate(verifier, check, context).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(check = %check.name, error = %e, "Check failed structurally");
            CheckOutcome::new(&check.name, CheckStatus::Fail, e.to_string())
        }
    }
}

async fn evaluate(
    verifier: &DatasetVerifier,
    check: &Check,
    context: &SuiteContext,
) -> Result<CheckOutcome, VerifyError> {
    let name = check.name.as_str();
    match &check.kind {
        CheckKind::Schema { root } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let report = verifier.check_schema_consistency(&partitions).await?;
            schema_outcome(name, &report)
        }
        CheckKind::RequiredColumns { root, columns } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let reports = verifier
                .required_columns_by_partition(&partitions, columns)
                .await?;
            required_outcome(name, &reports)
        }
        CheckKind::ColumnQuality { root, rules } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let report = verifier.check_column_quality(&partitions, rules).await?;
            quality_outcome(name, &report)
        }
        CheckKind::DateCoverage { root, column } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let label = root.display().to_string();
            let report = verifier
                .check_dataset_coverage(&label, &partitions, column, &context.non_event_dates)
                .await?;
            coverage_outcome(name, &report)
        }
        CheckKind::IdentifierFormat { root, column } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let reports = verifier
                .identifier_format_by_partition(&partitions, column)
                .await?;
            identifier_outcome(name, &reports)
        }
        CheckKind::PartitionCounts {
            root,
            key,
            expected_keys,
        } => {
            let expected = expected_keys.as_deref().map(read_key_list).transpose()?;
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let report = verifier
                .diff_partition_counts(&partitions, key, expected.as_ref())
                .await?;
            count_outcome(name, &report)
        }
        CheckKind::RaceConsistency { root } => {
            let partitions = resolve_all(std::slice::from_ref(root))?;
            let report = verifier.check_race_consistency(&partitions).await?;
            consistency_outcome(name, &report)
        }
        CheckKind::FeatureLeakage { manifest } => {
            let manifest = load_manifest(manifest)?;
            let report = verifier.check_feature_leakage(&manifest, &context.forbidden);
            leakage_outcome(name, &report)
        }
        CheckKind::ManifestDiff {
            manifest,
            partition,
        } => {
            let manifest = load_manifest(manifest)?;
            let partitions = resolve_all(std::slice::from_ref(partition))?;
            let first = partitions
                .first()
                .ok_or_else(|| VerifyError::empty_dataset(Some(partition)))?;
            let report = verifier
                .diff_manifest_columns(&manifest, first, &context.ignored_columns, &context.forbidden)
                .await?;
            manifest_diff_outcome(name, &report)
        }
    }
}

fn schema_outcome(name: &str, report: &SchemaReport) -> Result<CheckOutcome, VerifyError> {
    let outcome = if report.is_consistent() {
        CheckOutcome::new(
            name,
            CheckStatus::Pass,
            format!(
                "{} partitions share {} columns",
                report.partitions.len(),
                report.common_columns.len()
            ),
        )
    } else {
        CheckOutcome::new(
            name,
            CheckStatus::Warning,
            format!(
                "schema drift: {} partitions missing columns, {} with extra columns, {} unreadable",
                report.per_partition_missing.len(),
                report.per_partition_extra.len(),
                report.unreadable.len()
            ),
        )
    };
    outcome.with_details(report)
}

fn required_outcome(
    name: &str,
    reports: &PartitionReports<RequiredColumnsReport>,
) -> Result<CheckOutcome, VerifyError> {
    let failing: Vec<&RequiredColumnsReport> =
        reports.reports.iter().filter(|r| !r.passed).collect();
    let outcome = match failing.first() {
        None if reports.unreadable.is_empty() => CheckOutcome::new(
            name,
            CheckStatus::Pass,
            format!(
                "all {} partitions have the required columns",
                reports.reports.len()
            ),
        ),
        None => CheckOutcome::new(
            name,
            CheckStatus::Warning,
            format!(
                "{} partitions have the required columns, {} unreadable",
                reports.reports.len(),
                reports.unreadable.len()
            ),
        ),
        Some(first) => CheckOutcome::new(
            name,
            CheckStatus::Fail,
            format!(
                "{} partitions lack required columns (e.g. {} in {})",
                failing.len(),
                first.missing.join(", "),
                first.partition
            ),
        ),
    };
    outcome.with_details(reports)
}

fn quality_outcome(name: &str, report: &ColumnQualityReport) -> Result<CheckOutcome, VerifyError> {
    let status = if report.is_clean() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };
    let mut message = format!(
        "{} rows: {} columns over the missing-rate limit, {} not numeric, {} unreadable",
        report.total_rows,
        report.high_missing.len(),
        report.non_numeric.len(),
        report.unreadable.len()
    );
    if let Some(min) = report.min_rows.filter(|_| report.below_min_rows) {
        let _ = write!(message, "; fewer than {min} rows");
    }
    CheckOutcome::new(name, status, message).with_details(report)
}

fn coverage_outcome(name: &str, report: &CoverageReport) -> Result<CheckOutcome, VerifyError> {
    let range = match (report.min_date, report.max_date) {
        (Some(min), Some(max)) => format!("{min} to {max}"),
        _ => "no parseable dates".to_string(),
    };
    let status = if report.has_gaps()
        || report.unparseable_count > 0
        || report.min_date.is_none()
        || !report.unreadable.is_empty()
    {
        CheckStatus::Warning
    } else {
        CheckStatus::Pass
    };
    CheckOutcome::new(
        name,
        status,
        format!(
            "{range}: {} unique dates, {} gaps, {} unparseable, {} partitions unreadable",
            report.unique_dates,
            report.gap_dates.len(),
            report.unparseable_count,
            report.unreadable.len()
        ),
    )
    .with_details(report)
}

fn identifier_outcome(
    name: &str,
    reports: &PartitionReports<IdentifierReport>,
) -> Result<CheckOutcome, VerifyError> {
    let total: usize = reports.reports.iter().map(|r| r.total_values).sum();
    let malformed: usize = reports.reports.iter().map(|r| r.malformed).sum();
    let float_rendered: usize = reports.reports.iter().map(|r| r.float_rendered).sum();
    let status = if malformed == 0 && reports.unreadable.is_empty() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };
    CheckOutcome::new(
        name,
        status,
        format!(
            "{malformed} of {total} identifiers malformed ({float_rendered} float-rendered), {} partitions unreadable",
            reports.unreadable.len()
        ),
    )
    .with_details(reports)
}

fn count_outcome(name: &str, report: &CountReport) -> Result<CheckOutcome, VerifyError> {
    let status = if report.is_clean() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };
    CheckOutcome::new(
        name,
        status,
        format!(
            "{} keys over {} rows: {} duplicated, {} missing, {} unreadable",
            report.total_keys,
            report.total_rows,
            report.duplicated.len(),
            report.missing.len(),
            report.unreadable.len()
        ),
    )
    .with_details(report)
}

fn consistency_outcome(
    name: &str,
    report: &ConsistencyReport,
) -> Result<CheckOutcome, VerifyError> {
    let status = if report.is_clean() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };
    CheckOutcome::new(
        name,
        status,
        format!(
            "{} rows: {} positions beyond field size, {} distances and {} finish times out of range, {} unreadable",
            report.rows_checked,
            report.position_exceeds_head_count,
            report.distance_out_of_range,
            report.finish_time_out_of_range,
            report.unreadable.len()
        ),
    )
    .with_details(report)
}

fn leakage_outcome(name: &str, report: &LeakageReport) -> Result<CheckOutcome, VerifyError> {
    let outcome = if report.passed {
        CheckOutcome::new(
            name,
            CheckStatus::Pass,
            format!("no forbidden names among {} features", report.manifest_len),
        )
    } else {
        CheckOutcome::new(
            name,
            CheckStatus::Fail,
            format!("label leakage: {}", report.leaked.join(", ")),
        )
    };
    outcome.with_details(report)
}

fn manifest_diff_outcome(
    name: &str,
    report: &ManifestDiffReport,
) -> Result<CheckOutcome, VerifyError> {
    let status = if report.is_aligned() && report.forbidden_in_data.is_empty() {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    };
    CheckOutcome::new(
        name,
        status,
        format!(
            "{} features missing in data, {} extra columns, {} forbidden columns present",
            report.missing_in_data.len(),
            report.extra_in_data.len(),
            report.forbidden_in_data.len()
        ),
    )
    .with_details(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_csv, write_parquet};
    use pretty_assertions::assert_eq;

    fn races_dataset() -> DatasetConfig {
        DatasetConfig {
            date_column: Some("race_date".into()),
            id_column: Some("race_id".into()),
            count_key: Some("race_id".into()),
            required_columns: vec!["race_id".into(), "race_date".into()],
            ..DatasetConfig::bare(DatasetKind::Races, "races")
        }
    }

    fn config_for(root: &std::path::Path) -> VerifierConfig {
        VerifierConfig {
            data_root: root.to_path_buf(),
            datasets: vec![races_dataset()],
            ..VerifierConfig::default()
        }
    }

    fn outcome<'a>(summary: &'a VerificationSummary, name: &str) -> &'a CheckOutcome {
        summary
            .checks
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no check named {name}"))
    }

    #[test]
    fn test_plan_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.manifest = Some(PathBuf::from("model.json"));
        let suite = CheckSuite::from_config(&config).unwrap();
        let names: Vec<&str> = suite.checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "races.schema",
                "races.required_columns",
                "races.date_coverage",
                "races.identifier_format",
                "races.partition_counts",
                "features.leakage",
            ]
        );
    }

    #[tokio::test]
    async fn test_clean_dataset_passes() {
        let dir = tempfile::tempdir().unwrap();
        let races = dir.path().join("races");
        std::fs::create_dir_all(&races).unwrap();
        write_csv(
            &races.join("2024-01.csv"),
            "race_id,race_date",
            &["202406010101,2024-01-06", "202406010201,2024-01-07"],
        );

        let summary = CheckSuite::from_config(&config_for(dir.path()))
            .unwrap()
            .run()
            .await;
        assert_eq!(summary.checks.len(), 5);
        assert_eq!(summary.passed, 5, "{summary:#?}");
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn test_leakage_fails_and_others_still_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("features")).unwrap();
        write_parquet(
            &dir.path().join("features").join("part-0.parquet"),
            &[("race_id", vec![Some("202406010101")]), ("odds", vec![Some("3.4")])],
        );
        std::fs::write(dir.path().join("model.json"), r#"{"features": ["odds", "age"]}"#).unwrap();

        let mut config = config_for(dir.path());
        config.manifest = Some(PathBuf::from("model.json"));
        config
            .datasets
            .push(DatasetConfig::bare(DatasetKind::Features, "features"));

        let summary = CheckSuite::from_config(&config).unwrap().run().await;
        let leakage = summary
            .checks
            .iter()
            .find(|c| c.name == "features.leakage")
            .unwrap();
        assert_eq!(leakage.status, CheckStatus::Fail);
        assert!(leakage.message.contains("odds"));

        // The races directory does not exist: its checks fail, the rest run.
        let schema = summary
            .checks
            .iter()
            .find(|c| c.name == "races.schema")
            .unwrap();
        assert_eq!(schema.status, CheckStatus::Fail);
        let diff = summary
            .checks
            .iter()
            .find(|c| c.name == "features.manifest_diff")
            .unwrap();
        assert_eq!(diff.status, CheckStatus::Warning);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_plan_includes_quality_and_consistency() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.datasets[0].numeric_columns = vec!["distance_m".into()];
        config.datasets[0].consistency = true;
        config.datasets[0].expected_keys_file = Some(PathBuf::from("expected.txt"));
        let suite = CheckSuite::from_config(&config).unwrap();
        let names: Vec<&str> = suite.checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "races.schema",
                "races.required_columns",
                "races.column_quality",
                "races.date_coverage",
                "races.identifier_format",
                "races.partition_counts",
                "races.consistency",
            ]
        );
        let counts = suite
            .checks()
            .iter()
            .find(|c| c.name == "races.partition_counts")
            .unwrap();
        assert!(matches!(
            &counts.kind,
            CheckKind::PartitionCounts { expected_keys: Some(p), .. } if p == &dir.path().join("expected.txt")
        ));
    }

    #[tokio::test]
    async fn test_corrupt_partition_keeps_findings_of_readable_ones() {
        let dir = tempfile::tempdir().unwrap();
        let races = dir.path().join("races");
        std::fs::create_dir_all(&races).unwrap();
        write_csv(
            &races.join("a.csv"),
            "race_id,race_date",
            &["202406010101,2024-01-06", "BAD,2024-01-08"],
        );
        std::fs::write(races.join("b.parquet"), b"PAR1 corrupt footer").unwrap();

        let summary = CheckSuite::from_config(&config_for(dir.path()))
            .unwrap()
            .run()
            .await;

        let ids = outcome(&summary, "races.identifier_format");
        assert_eq!(ids.status, CheckStatus::Warning);
        assert_eq!(ids.details["reports"][0]["malformed_samples"][0], "BAD");
        assert_eq!(ids.details["unreadable"].as_object().unwrap().len(), 1);

        let required = outcome(&summary, "races.required_columns");
        assert_eq!(required.status, CheckStatus::Warning);
        assert_eq!(required.details["reports"][0]["passed"], true);

        let coverage = outcome(&summary, "races.date_coverage");
        assert_eq!(coverage.status, CheckStatus::Warning);
        assert_eq!(coverage.details["gap_dates"][0], "2024-01-07");
        assert_eq!(coverage.details["unreadable"].as_object().unwrap().len(), 1);

        assert!(summary.checks.iter().all(|c| !c.details.is_null()));
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_expected_keys_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let races = dir.path().join("races");
        std::fs::create_dir_all(&races).unwrap();
        write_csv(&races.join("a.csv"), "race_id,race_date", &["202406010101,2024-01-06"]);
        std::fs::write(
            dir.path().join("expected.txt"),
            "# January card\n202406010101\n202406010102\n",
        )
        .unwrap();

        let mut config = config_for(dir.path());
        config.datasets[0].expected_keys_file = Some(PathBuf::from("expected.txt"));
        let summary = CheckSuite::from_config(&config).unwrap().run().await;

        let counts = outcome(&summary, "races.partition_counts");
        assert_eq!(counts.status, CheckStatus::Warning);
        assert_eq!(counts.details["missing"], serde_json::json!(["202406010102"]));
    }

    #[tokio::test]
    async fn test_quality_and_consistency_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let races = dir.path().join("races");
        std::fs::create_dir_all(&races).unwrap();
        write_csv(
            &races.join("a.csv"),
            "race_id,distance_m,head_count,finish_position",
            &["202406010101,1200,16,1", "202406010101,,16,18"],
        );

        let mut config = config_for(dir.path());
        config.datasets[0] = DatasetConfig {
            numeric_columns: vec!["distance_m".into(), "finish_position".into()],
            max_missing_rate: Some(0.1),
            min_rows: Some(100),
            consistency: true,
            ..DatasetConfig::bare(DatasetKind::Races, "races")
        };
        let summary = CheckSuite::from_config(&config).unwrap().run().await;

        let quality = outcome(&summary, "races.column_quality");
        assert_eq!(quality.status, CheckStatus::Warning);
        assert_eq!(quality.details["null_counts"]["distance_m"], 1);
        assert_eq!(quality.details["below_min_rows"], true);
        assert!(quality.details["high_missing"]["distance_m"].is_number());
        assert!(quality.message.contains("fewer than 100 rows"));

        let consistency = outcome(&summary, "races.consistency");
        assert_eq!(consistency.status, CheckStatus::Warning);
        assert_eq!(consistency.details["position_exceeds_head_count"], 1);
    }

    #[test]
    fn test_summary_counts() {
        let summary = VerificationSummary::from_outcomes(vec![
            CheckOutcome::new("a", CheckStatus::Pass, ""),
            CheckOutcome::new("b", CheckStatus::Warning, ""),
            CheckOutcome::new("c", CheckStatus::Warning, ""),
        ]);
        assert_eq!((summary.passed, summary.warnings, summary.failed), (1, 2, 0));
        assert!(summary.is_success());
        assert!(!summary.is_clean());
        assert_eq!(summary.by_status(CheckStatus::Warning).count(), 2);
    }
}
