//! Configuration for the verifier.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace `paddock.toml` -> environment -> explicit file. The user config
//! lives at `<config dir>/paddock/config.toml` via the `directories` crate.

use crate::data::dates::parse_calendar_date;
use crate::error::VerifyError;
use crate::features::{DEFAULT_OUTCOME_COLUMNS, ForbiddenNames};
use crate::verify::{DEFAULT_SAMPLE_LIMIT, QualityRules};
use crate::verify::leakage::DEFAULT_KEY_COLUMNS;
use chrono::NaiveDate;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the workspace-level configuration.
pub const WORKSPACE_CONFIG_FILE: &str = "paddock.toml";

pub const DEFAULT_MAX_MISSING_RATE: f64 = 0.10;
pub const DEFAULT_MIN_ROWS: usize = 1000;

/// Logical datasets the scraping pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Races,
    Shutuba,
    Horses,
    Pedigrees,
    Features,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        Self::Races,
        Self::Shutuba,
        Self::Horses,
        Self::Pedigrees,
        Self::Features,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Races => "races",
            Self::Shutuba => "shutuba",
            Self::Horses => "horses",
            Self::Pedigrees => "pedigrees",
            Self::Features => "features",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dataset '{s}'"))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dataset lives and which of its columns the checks use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    /// File or directory, relative to `data_root` unless absolute.
    pub path: PathBuf,
    /// Date column for coverage checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_column: Option<String>,
    /// Race identifier column for format checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    /// Grouping key for cross-partition count diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_key: Option<String>,
    /// File with one expected grouping key per line; keys absent from
    /// every partition are reported as missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_keys_file: Option<PathBuf>,
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Columns whose stored type must be numeric.
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// Highest tolerated fraction of null cells per column, in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_missing_rate: Option<f64>,
    /// Fewest rows the whole dataset may hold before it is flagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<usize>,
    /// Run the race-result consistency rules (finishing position against
    /// field size, distance and finish-time ranges).
    #[serde(default)]
    pub consistency: bool,
}

impl DatasetConfig {
    /// Built-in layout of the parsed corpus for one dataset kind.
    pub fn default_for(kind: DatasetKind) -> Self {
        let (path, date_column, id_column, count_key, required): (
            &str,
            Option<&str>,
            Option<&str>,
            Option<&str>,
            &[&str],
        ) = match kind {
            DatasetKind::Races => (
                "parsed/parquet/races",
                Some("race_date"),
                Some("race_id"),
                Some("race_id"),
                &[
                    "race_id",
                    "race_date",
                    "venue",
                    "distance_m",
                    "track_surface",
                    "finish_position",
                    "horse_id",
                ],
            ),
            DatasetKind::Shutuba => (
                "parsed/parquet/shutuba",
                Some("race_date"),
                Some("race_id"),
                Some("race_id"),
                &["race_id", "horse_id", "horse_number"],
            ),
            DatasetKind::Horses => (
                "parsed/parquet/horses",
                None,
                None,
                Some("horse_id"),
                &["horse_id", "horse_name"],
            ),
            DatasetKind::Pedigrees => (
                "parsed/parquet/pedigrees",
                None,
                None,
                None,
                &["horse_id", "generation", "position"],
            ),
            DatasetKind::Features => (
                "features/parquet",
                Some("race_date"),
                Some("race_id"),
                None,
                &["race_id", "horse_id"],
            ),
        };
        let numeric: &[&str] = match kind {
            DatasetKind::Races => &["distance_m", "head_count", "finish_position"],
            DatasetKind::Shutuba => &["horse_number", "morning_odds"],
            DatasetKind::Pedigrees => &["generation", "position"],
            DatasetKind::Horses | DatasetKind::Features => &[],
        };
        let parsed = kind != DatasetKind::Features;
        Self {
            kind,
            path: PathBuf::from(path),
            date_column: date_column.map(str::to_string),
            id_column: id_column.map(str::to_string),
            count_key: count_key.map(str::to_string),
            expected_keys_file: None,
            required_columns: required.iter().map(|c| c.to_string()).collect(),
            numeric_columns: numeric.iter().map(|c| c.to_string()).collect(),
            max_missing_rate: Some(DEFAULT_MAX_MISSING_RATE),
            min_rows: parsed.then_some(DEFAULT_MIN_ROWS),
            consistency: kind == DatasetKind::Races,
        }
    }

    /// A dataset at `path` with no checks beyond schema consistency.
    pub fn bare(kind: DatasetKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            date_column: None,
            id_column: None,
            count_key: None,
            expected_keys_file: None,
            required_columns: Vec::new(),
            numeric_columns: Vec::new(),
            max_missing_rate: None,
            min_rows: None,
            consistency: false,
        }
    }

    /// Whether any column-quality rule is configured.
    pub fn has_quality_rules(&self) -> bool {
        !self.numeric_columns.is_empty() || self.max_missing_rate.is_some() || self.min_rows.is_some()
    }

    pub fn quality_rules(&self) -> QualityRules {
        QualityRules {
            numeric_columns: self.numeric_columns.clone(),
            max_missing_rate: self.max_missing_rate,
            min_rows: self.min_rows,
        }
    }
}

/// Top-level verifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Root that relative dataset and manifest paths are resolved against.
    pub data_root: PathBuf,
    /// Columns that must never appear among model inputs.
    pub forbidden_names: Vec<String>,
    /// Feature manifest of the trained model (JSON sidecar or LightGBM text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Partition the manifest is diffed against; defaults to the first
    /// features partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_partition: Option<PathBuf>,
    /// Dates known to have no racing; excluded from gap reports.
    #[serde(default)]
    pub non_event_dates: Vec<NaiveDate>,
    /// File with one non-event date per line (`#` starts a comment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_event_dates_file: Option<PathBuf>,
    /// Columns ignored when diffing the manifest against data.
    pub ignored_columns: Vec<String>,
    /// Maximum malformed identifiers echoed back per report.
    pub sample_limit: usize,
    /// Kept last so it serialises as trailing `[[datasets]]` tables.
    pub datasets: Vec<DatasetConfig>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            datasets: DatasetKind::ALL
                .into_iter()
                .map(DatasetConfig::default_for)
                .collect(),
            forbidden_names: DEFAULT_OUTCOME_COLUMNS.iter().map(|c| c.to_string()).collect(),
            manifest: None,
            manifest_partition: None,
            non_event_dates: Vec::new(),
            non_event_dates_file: None,
            ignored_columns: DEFAULT_KEY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl VerifierConfig {
    /// Validate the configuration and return a list of warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = BTreeSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.kind) {
                warnings.push(format!(
                    "dataset '{}' is configured more than once; only the first entry is used",
                    dataset.kind
                ));
            }
        }
        if self.forbidden_names.is_empty() {
            warnings.push("forbidden_names is empty; leakage checks will always pass".into());
        }
        for dataset in &self.datasets {
            if let Some(rate) = dataset.max_missing_rate {
                if !(0.0..=1.0).contains(&rate) {
                    warnings.push(format!(
                        "dataset '{}': max_missing_rate {rate} is outside 0.0..=1.0",
                        dataset.kind
                    ));
                }
            }
        }
        if self.sample_limit == 0 {
            warnings.push("sample_limit is 0; malformed identifiers will not be echoed".into());
        }
        warnings
    }

    /// Resolve a configured path against `data_root`.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        }
    }

    pub fn dataset(&self, kind: DatasetKind) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.kind == kind)
    }

    pub fn forbidden(&self) -> ForbiddenNames {
        self.forbidden_names.iter().cloned().collect()
    }

    pub fn ignored(&self) -> BTreeSet<String> {
        self.ignored_columns.iter().cloned().collect()
    }

    /// Union of the inline non-event dates and those read from
    /// `non_event_dates_file`.
    pub fn non_event_dates(&self) -> Result<BTreeSet<NaiveDate>, VerifyError> {
        let mut dates: BTreeSet<NaiveDate> = self.non_event_dates.iter().copied().collect();
        if let Some(file) = &self.non_event_dates_file {
            let path = self.resolve_path(file);
            let content = std::fs::read_to_string(&path)?;
            dates.extend(parse_date_list(&content, &path)?);
        }
        Ok(dates)
    }
}

/// Parse a newline-separated key list. Blank lines and `#` comments are
/// skipped.
pub fn parse_key_list(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a key list file (see [`parse_key_list`]).
pub fn read_key_list(path: &Path) -> Result<BTreeSet<String>, VerifyError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VerifyError::config(format!("cannot read key list {}: {e}", path.display()))
    })?;
    Ok(parse_key_list(&content))
}

/// Parse a newline-separated date list. Blank lines and `#` comments are
/// skipped; any other unparseable line is an error.
pub fn parse_date_list(content: &str, origin: &Path) -> Result<Vec<NaiveDate>, VerifyError> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((i + 1, line))
        })
        .map(|(lineno, line)| {
            parse_calendar_date(line).ok_or_else(|| {
                VerifyError::config(format!(
                    "{}:{lineno}: not a date: '{line}'",
                    origin.display()
                ))
            })
        })
        .collect()
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "paddock", "paddock")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from all layers.
///
/// `explicit` is merged last and must exist when given.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<VerifierConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(VerifierConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (PADDOCK_DATA_ROOT, PADDOCK_SAMPLE_LIMIT, etc.)
    figment = figment.merge(Env::prefixed("PADDOCK_").split("__"));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment.extract().map_err(Box::new)
}
