//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context as _;
use chrono::NaiveDate;
use paddock_core::config::{WORKSPACE_CONFIG_FILE, read_key_list};
use paddock_core::data::parse_calendar_date;
use paddock_core::{
    CheckSuite, DatasetVerifier, ReportFormat, VerifierConfig,
    decode_race_identifier, load_manifest, render_json, render_summary, resolve_all,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Global options every handler needs.
#[derive(Debug, Clone)]
pub struct Context {
    pub workspace: PathBuf,
    pub config_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    fn load_config(&self) -> anyhow::Result<VerifierConfig> {
        let config =
            paddock_core::load_config(Some(&self.workspace), self.config_path.as_deref())
                .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
        for warning in config.validate() {
            tracing::warn!("{warning}");
        }
        Ok(config)
    }

    fn verifier(config: &VerifierConfig) -> DatasetVerifier {
        DatasetVerifier::default().with_sample_limit(config.sample_limit)
    }

    fn emit(&self, text: &str) -> anyhow::Result<()> {
        match &self.output {
            Some(path) => {
                std::fs::write(path, text)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                if !self.quiet {
                    eprintln!("Report written to {}", path.display());
                }
            }
            None => print!("{text}"),
        }
        Ok(())
    }

    fn emit_json<T: Serialize + ?Sized>(&self, report: &T) -> anyhow::Result<()> {
        self.emit(&render_json(report)?)
    }
}

#[derive(Debug, Serialize)]
struct DecodedIdentifier {
    identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    race_key: Option<paddock_core::RaceKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    venue_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn decode_one(identifier: &str) -> DecodedIdentifier {
    match decode_race_identifier(identifier) {
        Ok(key) => DecodedIdentifier {
            identifier: identifier.to_string(),
            meeting_prefix: Some(key.meeting_prefix()),
            venue_name: Some(key.venue.local_name()),
            race_key: Some(key),
            error: None,
        },
        Err(e) => DecodedIdentifier {
            identifier: identifier.to_string(),
            race_key: None,
            meeting_prefix: None,
            venue_name: None,
            error: Some(e.to_string()),
        },
    }
}

fn parse_dates(values: &[String]) -> anyhow::Result<BTreeSet<NaiveDate>> {
    values
        .iter()
        .map(|v| parse_calendar_date(v).ok_or_else(|| anyhow::anyhow!("Not a date: '{v}'")))
        .collect()
}

/// Handle a CLI subcommand. Returns whether the result was clean.
pub async fn handle_command(command: Commands, ctx: &Context) -> anyhow::Result<bool> {
    match command {
        Commands::Schema { paths } => {
            let partitions = resolve_all(&paths)?;
            let report = Context::verifier(&ctx.load_config()?)
                .check_schema_consistency(&partitions)
                .await?;
            ctx.emit_json(&report)?;
            Ok(report.is_consistent())
        }
        Commands::Coverage {
            path,
            column,
            exclude,
        } => {
            let config = ctx.load_config()?;
            let mut known = config.non_event_dates()?;
            known.extend(parse_dates(&exclude)?);
            let partitions = resolve_all(std::slice::from_ref(&path))?;
            let report = Context::verifier(&config)
                .check_dataset_coverage(&path.display().to_string(), &partitions, &column, &known)
                .await?;
            ctx.emit_json(&report)?;
            Ok(!report.has_gaps()
                && report.unparseable_count == 0
                && report.unreadable.is_empty())
        }
        Commands::Decode { identifiers } => {
            let decoded: Vec<DecodedIdentifier> =
                identifiers.iter().map(|id| decode_one(id)).collect();
            ctx.emit_json(&decoded)?;
            Ok(decoded.iter().all(|d| d.error.is_none()))
        }
        Commands::Ids { path, column } => {
            let partitions = resolve_all(std::slice::from_ref(&path))?;
            let reports = Context::verifier(&ctx.load_config()?)
                .identifier_format_by_partition(&partitions, &column)
                .await?;
            ctx.emit_json(&reports)?;
            Ok(reports.unreadable.is_empty() && reports.reports.iter().all(|r| r.is_clean()))
        }
        Commands::Leakage { manifest, forbid } => {
            let config = ctx.load_config()?;
            let mut forbidden = config.forbidden();
            forbidden.extend(forbid);
            let manifest = load_manifest(&manifest)?;
            let report = Context::verifier(&config).check_feature_leakage(&manifest, &forbidden);
            ctx.emit_json(&report)?;
            Ok(report.passed)
        }
        Commands::ManifestDiff {
            manifest,
            partition,
        } => {
            let config = ctx.load_config()?;
            let manifest = load_manifest(&manifest)?;
            let partitions = resolve_all(std::slice::from_ref(&partition))?;
            let first = partitions
                .first()
                .ok_or_else(|| anyhow::anyhow!("No partitions under {}", partition.display()))?;
            let report = Context::verifier(&config)
                .diff_manifest_columns(&manifest, first, &config.ignored(), &config.forbidden())
                .await?;
            ctx.emit_json(&report)?;
            Ok(report.is_aligned() && report.forbidden_in_data.is_empty())
        }
        Commands::Counts {
            paths,
            key,
            expected,
        } => {
            let expected = expected.as_deref().map(read_key_list).transpose()?;
            let partitions = resolve_all(&paths)?;
            let report = Context::verifier(&ctx.load_config()?)
                .diff_partition_counts(&partitions, &key, expected.as_ref())
                .await?;
            ctx.emit_json(&report)?;
            Ok(report.is_clean())
        }
        Commands::Required {
            path,
            dataset,
            columns,
        } => {
            let config = ctx.load_config()?;
            let columns = match dataset {
                Some(kind) => config
                    .dataset(kind)
                    .map(|d| d.required_columns.clone())
                    .ok_or_else(|| anyhow::anyhow!("Dataset '{kind}' is not configured"))?,
                None if columns.is_empty() => {
                    anyhow::bail!("Pass --dataset or --columns to name the required columns")
                }
                None => columns,
            };
            let partitions = resolve_all(std::slice::from_ref(&path))?;
            let reports = Context::verifier(&config)
                .required_columns_by_partition(&partitions, &columns)
                .await?;
            ctx.emit_json(&reports)?;
            Ok(reports.unreadable.is_empty() && reports.reports.iter().all(|r| r.passed))
        }
        Commands::Quality { paths, dataset } => {
            let config = ctx.load_config()?;
            let configured = config
                .dataset(dataset)
                .ok_or_else(|| anyhow::anyhow!("Dataset '{dataset}' is not configured"))?;
            let rules = configured.quality_rules();
            let partitions = resolve_all(&paths)?;
            let report = Context::verifier(&config)
                .check_column_quality(&partitions, &rules)
                .await?;
            ctx.emit_json(&report)?;
            Ok(report.is_clean())
        }
        Commands::Consistency { paths } => {
            let partitions = resolve_all(&paths)?;
            let report = Context::verifier(&ctx.load_config()?)
                .check_race_consistency(&partitions)
                .await?;
            ctx.emit_json(&report)?;
            Ok(report.is_clean())
        }
        Commands::Run {
            datasets,
            format,
            strict,
        } => {
            let config = ctx.load_config()?;
            let mut suite = CheckSuite::from_config(&config)?;
            if !datasets.is_empty() {
                suite = suite.retain_datasets(&datasets);
            }
            tracing::info!(checks = suite.checks().len(), "Running verification suite");
            let summary = suite.run().await;

            let rendered = render_summary(&summary, format)?;
            if format == ReportFormat::Json {
                tracing::info!(digest = %paddock_core::digest(&rendered), "Report digest");
            }
            ctx.emit(&rendered)?;
            if !ctx.quiet {
                eprintln!(
                    "{} passed, {} warnings, {} failed",
                    summary.passed, summary.warnings, summary.failed
                );
            }
            Ok(if strict {
                summary.is_clean()
            } else {
                summary.is_success()
            })
        }
        Commands::Config { action } => handle_config(action, ctx),
    }
}

fn handle_config(action: ConfigAction, ctx: &Context) -> anyhow::Result<bool> {
    match action {
        ConfigAction::Init => {
            let config_path = ctx.workspace.join(WORKSPACE_CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(true);
            }

            let toml_str = toml::to_string_pretty(&VerifierConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(true)
        }
        ConfigAction::Show => {
            let config = ctx.load_config()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn context(workspace: &Path) -> Context {
        Context {
            workspace: workspace.to_path_buf(),
            config_path: None,
            output: Some(workspace.join("report.json")),
            quiet: true,
        }
    }

    #[tokio::test]
    async fn test_config_init_writes_parseable_toml() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        assert!(handle_command(command, &ctx).await.unwrap());

        let content = std::fs::read_to_string(dir.path().join(WORKSPACE_CONFIG_FILE)).unwrap();
        let parsed: VerifierConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, VerifierConfig::default());
    }

    #[tokio::test]
    async fn test_decode_reports_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let command = Commands::Decode {
            identifiers: vec!["202006030101".into(), "abc".into()],
        };
        assert!(!handle_command(command, &ctx).await.unwrap());

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report[0]["meeting_prefix"], "2020060301");
        assert_eq!(report[0]["venue_name"], "中山");
        assert!(report[1]["error"].is_string());
    }

    #[tokio::test]
    async fn test_schema_over_directory() {
        let dir = tempfile::tempdir().unwrap();
        let races = dir.path().join("races");
        std::fs::create_dir_all(&races).unwrap();
        std::fs::write(races.join("a.csv"), "race_id,race_date\n202006030101,2020-03-28\n")
            .unwrap();
        std::fs::write(races.join("b.csv"), "race_id\n202006030102\n").unwrap();

        let ctx = context(dir.path());
        let command = Commands::Schema { paths: vec![races] };
        assert!(!handle_command(command, &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_with_missing_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            format!("data_root = {:?}\n", dir.path().join("nowhere").display().to_string()),
        )
        .unwrap();
        let ctx = context(dir.path());
        let command = Commands::Run {
            datasets: vec![paddock_core::DatasetKind::Races],
            format: ReportFormat::Markdown,
            strict: false,
        };
        assert!(!handle_command(command, &ctx).await.unwrap());
        let report = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        assert!(report.contains("## Failed"));
    }

    #[tokio::test]
    async fn test_counts_with_expected_keys() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys.txt");
        std::fs::write(&keys, "# expected\n202006030101\n\n202006030102\n").unwrap();
        let races = dir.path().join("races.csv");
        std::fs::write(&races, "race_id\n202006030101\n").unwrap();

        let ctx = context(dir.path());
        let command = Commands::Counts {
            paths: vec![races],
            key: "race_id".into(),
            expected: Some(keys),
        };
        assert!(!handle_command(command, &ctx).await.unwrap());
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["missing"], serde_json::json!(["202006030102"]));
    }

    #[tokio::test]
    async fn test_ids_uses_configured_sample_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_CONFIG_FILE), "sample_limit = 1\n").unwrap();
        let races = dir.path().join("races.csv");
        std::fs::write(&races, "race_id\nBAD1\nBAD2\nBAD3\n").unwrap();

        let ctx = context(dir.path());
        let command = Commands::Ids {
            path: races,
            column: "race_id".into(),
        };
        assert!(!handle_command(command, &ctx).await.unwrap());
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["reports"][0]["malformed"], 3);
        assert_eq!(report["reports"][0]["malformed_samples"], serde_json::json!(["BAD1"]));
    }
}
