//! Label leakage: outcome columns among a model's declared inputs.

use super::DatasetVerifier;
use crate::data::partition::partition_key;
use crate::error::VerifyError;
use crate::features::{FeatureManifest, ForbiddenNames};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Key columns that legitimately sit beside features without being inputs.
pub const DEFAULT_KEY_COLUMNS: &[&str] = &["race_id", "horse_id", "year", "month"];

/// Result of intersecting a manifest with the forbidden-name registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakageReport {
    /// False whenever `leaked` is non-empty.
    pub passed: bool,
    /// Forbidden names the manifest declares, sorted.
    pub leaked: Vec<String>,
    pub manifest_len: usize,
    /// Features listed more than once in the manifest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_features: Vec<String>,
}

/// Declared features versus the columns a feature partition actually holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDiffReport {
    pub partition: String,
    /// Features the model expects that the partition lacks.
    pub missing_in_data: Vec<String>,
    /// Partition columns the model does not consume, excluding key columns.
    pub extra_in_data: Vec<String>,
    /// Forbidden columns present in the partition (not necessarily consumed).
    pub forbidden_in_data: Vec<String>,
}

impl ManifestDiffReport {
    pub fn is_aligned(&self) -> bool {
        self.missing_in_data.is_empty() && self.extra_in_data.is_empty()
    }
}

/// Intersect the manifest with the forbidden set.
///
/// Operates on manifest contents alone; never consults a dataframe.
pub fn check_feature_leakage(
    manifest: &FeatureManifest,
    forbidden_names: &ForbiddenNames,
) -> LeakageReport {
    let leaked: BTreeSet<&str> = manifest
        .features
        .iter()
        .map(String::as_str)
        .filter(|f| forbidden_names.contains(f))
        .collect();

    LeakageReport {
        passed: leaked.is_empty(),
        leaked: leaked.into_iter().map(str::to_string).collect(),
        manifest_len: manifest.len(),
        duplicate_features: manifest.duplicates(),
    }
}

/// Compare declared features to a partition's column names.
pub fn diff_manifest_columns<'a>(
    partition: String,
    manifest: &FeatureManifest,
    columns: impl IntoIterator<Item = &'a str>,
    ignored: &BTreeSet<String>,
    forbidden_names: &ForbiddenNames,
) -> ManifestDiffReport {
    let declared = manifest.feature_set();
    let present: BTreeSet<&str> = columns.into_iter().collect();

    ManifestDiffReport {
        partition,
        missing_in_data: declared
            .difference(&present)
            .map(|c| c.to_string())
            .collect(),
        extra_in_data: present
            .difference(&declared)
            .filter(|c| !ignored.contains(**c))
            .map(|c| c.to_string())
            .collect(),
        forbidden_in_data: present
            .iter()
            .filter(|c| forbidden_names.contains(c))
            .map(|c| c.to_string())
            .collect(),
    }
}

impl DatasetVerifier {
    /// See [`check_feature_leakage`].
    pub fn check_feature_leakage(
        &self,
        manifest: &FeatureManifest,
        forbidden_names: &ForbiddenNames,
    ) -> LeakageReport {
        let report = check_feature_leakage(manifest, forbidden_names);
        if !report.passed {
            tracing::warn!(leaked = ?report.leaked, "Label leakage in feature manifest");
        }
        report
    }

    /// Diff a manifest against one feature partition's columns
    /// (metadata-only read).
    pub async fn diff_manifest_columns(
        &self,
        manifest: &FeatureManifest,
        partition: &Path,
        ignored: &BTreeSet<String>,
        forbidden_names: &ForbiddenNames,
    ) -> Result<ManifestDiffReport, VerifyError> {
        let meta = self.reader().describe(partition).await?;
        Ok(diff_manifest_columns(
            partition_key(partition),
            manifest,
            meta.column_names(),
            ignored,
            forbidden_names,
        ))
    }
}
