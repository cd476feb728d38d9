//! # paddock-core
//!
//! Integrity checks for a partitioned, incrementally scraped race-data corpus:
//! schema consistency across partitions, date coverage and gap detection,
//! race identifier decoding, label leakage against a model's declared feature
//! manifest, cross-partition row-count diffs, column quality (null counts,
//! missing rates, numeric dtypes) and race-result consistency rules.
//!
//! The library never prints. Findings about the data are returned as
//! serialisable reports; only structural mistakes are errors.

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod race_id;
pub mod report;
pub mod suite;
pub mod verify;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::{DatasetConfig, DatasetKind, VerifierConfig, load_config};
pub use data::{FileReader, PartitionMeta, PartitionReader, resolve_all, resolve_partitions};
pub use error::VerifyError;
pub use features::{FeatureManifest, ForbiddenNames, ManifestLoader, load_manifest};
pub use race_id::{RaceKey, Venue, decode_race_identifier, encode_race_identifier};
pub use report::{ReportFormat, digest, render_json, render_markdown, render_summary};
pub use suite::{CheckOutcome, CheckStatus, CheckSuite, VerificationSummary};
pub use verify::{
    ColumnQualityReport, ConsistencyReport, CountReport, CoverageReport, DatasetVerifier,
    IdentifierReport, LeakageReport, ManifestDiffReport, PartitionReports, QualityRules,
    RequiredColumnsReport, SchemaReport,
};
