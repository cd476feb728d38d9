//! End-to-end checks over parquet and CSV partitions written to a temp dir.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use paddock_core::config::{DatasetConfig, DatasetKind, VerifierConfig};
use paddock_core::{
    CheckStatus, CheckSuite, DatasetVerifier, ForbiddenNames, VerifyError, load_manifest,
    render_json, resolve_partitions,
};
use parquet::arrow::ArrowWriter;
use pretty_assertions::assert_eq;

fn write_races(path: &Path, ids: &[&str], dates: &[&str], distances: &[i64]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("race_id", DataType::Utf8, false),
        Field::new("race_date", DataType::Utf8, true),
        Field::new("distance_m", DataType::Int64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids.to_vec())),
        Arc::new(StringArray::from(dates.to_vec())),
        Arc::new(Int64Array::from(distances.to_vec())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn monthly_corpus(root: &Path) -> Vec<PathBuf> {
    let jan = root.join("year=2024").join("month=1");
    let feb = root.join("year=2024").join("month=2");
    std::fs::create_dir_all(&jan).unwrap();
    std::fs::create_dir_all(&feb).unwrap();
    write_races(
        &jan.join("part-0.parquet"),
        &["202406010101", "202406010102", "202406010201"],
        &["2024-01-06", "2024-01-06", "2024-01-07"],
        &[1200, 1800, 2000],
    );
    write_races(
        &feb.join("part-0.parquet"),
        &["202405010101", "202406010201"],
        &["2024-02-03", "2024-01-07"],
        &[1600, 2000],
    );
    resolve_partitions(root).unwrap()
}

#[tokio::test]
async fn test_reports_are_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = monthly_corpus(dir.path());
    let verifier = DatasetVerifier::default();

    let first = render_json(&verifier.check_schema_consistency(&partitions).await.unwrap()).unwrap();
    let second =
        render_json(&verifier.check_schema_consistency(&partitions).await.unwrap()).unwrap();
    assert_eq!(first, second);

    let counts_a = verifier
        .diff_partition_counts(&partitions, "race_id", None)
        .await
        .unwrap();
    let counts_b = verifier
        .diff_partition_counts(&partitions, "race_id", None)
        .await
        .unwrap();
    assert_eq!(render_json(&counts_a).unwrap(), render_json(&counts_b).unwrap());
}

#[tokio::test]
async fn test_monthly_corpus_findings() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = monthly_corpus(dir.path());
    assert_eq!(partitions.len(), 2);
    let verifier = DatasetVerifier::default();

    let schema = verifier.check_schema_consistency(&partitions).await.unwrap();
    assert!(schema.is_consistent());
    assert_eq!(schema.total_rows(), 5);
    assert!(schema.dtype_conflicts.is_empty());

    let counts = verifier
        .diff_partition_counts(&partitions, "race_id", None)
        .await
        .unwrap();
    assert_eq!(counts.duplicated.len(), 1);
    assert_eq!(counts.duplicated[0].key, "202406010201");

    let ids = verifier
        .check_identifier_format(&partitions[0], "race_id")
        .await
        .unwrap();
    assert!(ids.is_clean());
    assert_eq!(ids.distinct_races, 3);

    let coverage = verifier
        .check_dataset_coverage("races", &partitions, "race_date", &BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(
        coverage.min_date,
        Some(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap())
    );
    assert_eq!(
        coverage.max_date,
        Some(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap())
    );
    assert_eq!(coverage.unique_dates, 3);
    assert_eq!(coverage.gap_dates.len(), 26);
}

#[tokio::test]
async fn test_missing_date_column_is_structural() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = monthly_corpus(dir.path());
    let err = DatasetVerifier::default()
        .check_date_coverage(&partitions[0], "date", &BTreeSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::MissingColumn { ref column, .. } if column == "date"));
}

#[tokio::test]
async fn test_lightgbm_manifest_leakage() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.txt");
    std::fs::write(
        &model,
        "tree\nversion=v4\nnum_class=1\nfeature_names=age weight_kg odds jockey_win_rate\n",
    )
    .unwrap();

    let manifest = load_manifest(&model).unwrap();
    let report = DatasetVerifier::default()
        .check_feature_leakage(&manifest, &ForbiddenNames::outcome_defaults());
    assert!(!report.passed);
    assert_eq!(report.leaked, vec!["odds"]);
    assert_eq!(report.manifest_len, 4);
}

#[tokio::test]
async fn test_suite_over_configured_corpus() {
    let dir = tempfile::tempdir().unwrap();
    monthly_corpus(&dir.path().join("races"));

    let config = VerifierConfig {
        data_root: dir.path().to_path_buf(),
        datasets: vec![DatasetConfig {
            date_column: Some("race_date".into()),
            id_column: Some("race_id".into()),
            count_key: Some("race_id".into()),
            required_columns: vec!["race_id".into(), "race_date".into(), "venue".into()],
            numeric_columns: vec!["distance_m".into()],
            consistency: true,
            ..DatasetConfig::bare(DatasetKind::Races, PathBuf::from("races"))
        }],
        ..VerifierConfig::default()
    };

    let summary = CheckSuite::from_config(&config).unwrap().run().await;
    let status_of = |name: &str| {
        summary
            .checks
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status)
            .unwrap()
    };
    assert_eq!(status_of("races.schema"), CheckStatus::Pass);
    assert_eq!(status_of("races.required_columns"), CheckStatus::Fail);
    assert_eq!(status_of("races.date_coverage"), CheckStatus::Warning);
    assert_eq!(status_of("races.identifier_format"), CheckStatus::Pass);
    assert_eq!(status_of("races.partition_counts"), CheckStatus::Warning);
    assert_eq!(status_of("races.column_quality"), CheckStatus::Pass);
    assert_eq!(status_of("races.consistency"), CheckStatus::Pass);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
}
