//! Partition descriptors and resolution of dataset paths into partition files.

use crate::data::schema::ColumnSchema;
use crate::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Storage format of a partition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionFormat {
    Parquet,
    Csv,
}

impl PartitionFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Whether column names and row counts can be read without scanning data.
    pub fn supports_metadata_only(self) -> bool {
        matches!(self, Self::Parquet)
    }
}

/// Metadata for one partition: everything the structural checks need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub path: PathBuf,
    pub format: PartitionFormat,
    pub row_count: usize,
    pub columns: Vec<ColumnSchema>,
}

impl PartitionMeta {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Stable display key for a partition in reports.
pub fn partition_key(path: &Path) -> String {
    path.display().to_string()
}

/// Expand a dataset path into its partition files.
///
/// A file resolves to itself. A directory is walked recursively (hive-style
/// `year=2024/month=1/` layouts included) and every file with a supported
/// extension is returned, sorted by path. Hidden files and Spark/pandas
/// marker files (`_SUCCESS`, `.crc`) are skipped.
pub fn resolve_partitions(root: &Path) -> Result<Vec<PathBuf>, VerifyError> {
    let meta = std::fs::metadata(root)?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| VerifyError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if PartitionFormat::from_path(entry.path()).is_some() {
            found.push(entry.into_path());
        }
    }
    found.sort();
    tracing::debug!(root = %root.display(), partitions = found.len(), "Resolved partitions");
    Ok(found)
}

/// Resolve several dataset paths, keeping the caller's order and failing with
/// `EmptyDataset` when nothing resolves.
pub fn resolve_all(roots: &[PathBuf]) -> Result<Vec<PathBuf>, VerifyError> {
    let mut all = Vec::new();
    for root in roots {
        all.extend(resolve_partitions(root)?);
    }
    if all.is_empty() {
        return Err(VerifyError::empty_dataset(roots.first().map(PathBuf::as_path)));
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            PartitionFormat::from_path(Path::new("races.parquet")),
            Some(PartitionFormat::Parquet)
        );
        assert_eq!(
            PartitionFormat::from_path(Path::new("RACES.CSV")),
            Some(PartitionFormat::Csv)
        );
        assert_eq!(PartitionFormat::from_path(Path::new("model.pkl")), None);
        assert!(PartitionFormat::Parquet.supports_metadata_only());
        assert!(!PartitionFormat::Csv.supports_metadata_only());
    }

    #[test]
    fn test_resolve_hive_layout_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for (y, m) in [("2024", "2"), ("2023", "12"), ("2024", "1")] {
            let part = dir.path().join(format!("year={y}")).join(format!("month={m}"));
            std::fs::create_dir_all(&part).unwrap();
            std::fs::write(part.join("part-0.parquet"), b"").unwrap();
            std::fs::write(part.join("_SUCCESS"), b"").unwrap();
            std::fs::write(part.join(".part-0.parquet.crc"), b"").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = resolve_partitions(dir.path()).unwrap();
        assert_eq!(found.len(), 3);
        let rel: Vec<String> = found
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            rel,
            vec![
                "year=2023/month=12/part-0.parquet",
                "year=2024/month=1/part-0.parquet",
                "year=2024/month=2/part-0.parquet",
            ]
        );
    }

    #[test]
    fn test_resolve_all_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_all(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyDataset(_)));
    }

    #[test]
    fn test_resolve_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("races.csv");
        std::fs::write(&file, "race_id\n").unwrap();
        assert_eq!(resolve_partitions(&file).unwrap(), vec![file]);
    }
}
