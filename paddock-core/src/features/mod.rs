//! Model feature manifests and the forbidden-name registry.

pub mod forbidden;
pub mod manifest;

pub use forbidden::{DEFAULT_OUTCOME_COLUMNS, ForbiddenNames};
pub use manifest::{
    FeatureManifest, JsonManifestLoader, LightGbmManifestLoader, ManifestLoader, load_manifest,
};
