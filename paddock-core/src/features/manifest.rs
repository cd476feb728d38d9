//! Feature manifests: the inputs a trained model declares it consumes.
//!
//! A manifest always comes from the model artifact itself, never from a
//! training or evaluation frame.

use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Ordered feature names declared by a model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl FeatureManifest {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_set(&self) -> BTreeSet<&str> {
        self.features.iter().map(String::as_str).collect()
    }

    /// Names listed more than once, sorted.
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut dups = BTreeSet::new();
        for f in &self.features {
            if !seen.insert(f.as_str()) {
                dups.insert(f.clone());
            }
        }
        dups.into_iter().collect()
    }
}

/// Loads a manifest from a model artifact.
pub trait ManifestLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<FeatureManifest, VerifyError>;
}

/// JSON sidecar written next to the model at training time.
///
/// Accepts a bare array of names, or an object carrying one of the keys the
/// training code has used over time, checked in this order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestLoader;

const JSON_FEATURE_KEYS: [&str; 3] = ["features", "feature_names", "expected_features"];

impl ManifestLoader for JsonManifestLoader {
    fn load(&self, path: &Path) -> Result<FeatureManifest, VerifyError> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let list = match &value {
            serde_json::Value::Array(_) => &value,
            serde_json::Value::Object(map) => JSON_FEATURE_KEYS
                .iter()
                .find_map(|k| map.get(*k))
                .ok_or_else(|| {
                    VerifyError::manifest(format!(
                        "{}: none of {} present",
                        path.display(),
                        JSON_FEATURE_KEYS.join(", ")
                    ))
                })?,
            _ => {
                return Err(VerifyError::manifest(format!(
                    "{}: expected an array or object",
                    path.display()
                )));
            }
        };

        let features: Vec<String> = serde_json::from_value(list.clone()).map_err(|e| {
            VerifyError::manifest(format!("{}: feature list is not strings: {e}", path.display()))
        })?;
        Ok(FeatureManifest::new(features).with_source(path))
    }
}

/// LightGBM text model (`Booster.save_model`), which records its inputs on a
/// `feature_names=` header line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightGbmManifestLoader;

impl ManifestLoader for LightGbmManifestLoader {
    fn load(&self, path: &Path) -> Result<FeatureManifest, VerifyError> {
        let content = std::fs::read_to_string(path)?;
        let line = content
            .lines()
            .find_map(|l| l.strip_prefix("feature_names="))
            .ok_or_else(|| {
                VerifyError::manifest(format!(
                    "{}: no feature_names= line in LightGBM model",
                    path.display()
                ))
            })?;
        Ok(FeatureManifest::new(line.split_whitespace()).with_source(path))
    }
}

/// Load a manifest, choosing the loader by extension: `.json` is a sidecar,
/// `.txt`/`.model`/`.lgb` a LightGBM text model.
pub fn load_manifest(path: &Path) -> Result<FeatureManifest, VerifyError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let manifest = match ext.as_str() {
        "json" => JsonManifestLoader.load(path)?,
        "txt" | "model" | "lgb" => LightGbmManifestLoader.load(path)?,
        "pkl" | "pickle" | "joblib" => {
            return Err(VerifyError::manifest(format!(
                "{}: pickled models are opaque; export a JSON sidecar or LightGBM text model",
                path.display()
            )));
        }
        other => {
            return Err(VerifyError::manifest(format!(
                "{}: unsupported model artifact extension '{other}'",
                path.display()
            )));
        }
    };
    tracing::debug!(path = %path.display(), features = manifest.len(), "Loaded feature manifest");
    Ok(manifest)
}
