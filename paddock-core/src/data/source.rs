//! Partition readers for the formats the scraping pipeline emits.
//!
//! Every reader opens its file inside the call and drops the handle before
//! returning. Blocking decode work runs on tokio's blocking pool.

use crate::data::partition::{PartitionFormat, PartitionMeta};
use crate::data::schema::{ColumnSchema, column_type_from_arrow, infer_column_type};
use crate::error::VerifyError;
use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use async_trait::async_trait;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::metadata::ParquetMetaData;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Cell values of one column, rendered as text; `None` for nulls.
pub type ColumnValues = Vec<Option<String>>;

/// Columns pandas writes for a non-default index; not part of the data.
const PANDAS_INDEX_PREFIX: &str = "__index_level_";

/// Number of CSV rows sampled for dtype inference.
const CSV_INFERENCE_SAMPLE: usize = 100;

/// Trait for reading partitions.
#[async_trait]
pub trait PartitionReader: Send + Sync {
    /// Column names, dtypes and row count. Must avoid a full data read where
    /// the format allows it.
    async fn describe(&self, path: &Path) -> Result<PartitionMeta, VerifyError>;

    /// Every value of one column, in row order.
    async fn read_column(&self, path: &Path, column: &str) -> Result<ColumnValues, VerifyError>;
}

async fn run_blocking<T, F>(path: &Path, work: F) -> Result<T, VerifyError>
where
    T: Send + 'static,
    F: FnOnce(PathBuf) -> Result<T, VerifyError> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || work(owned))
        .await
        .map_err(|e| VerifyError::unreadable(path, e))?
        .map_err(|e| e.into_partition_error(path))
}

// ---------------------------------------------------------------------------
// ParquetReader
// ---------------------------------------------------------------------------

/// Apache Parquet partition reader.
///
/// `describe` decodes only the footer; `read_column` projects a single root
/// column so the other column chunks are never read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetReader;

impl ParquetReader {
    fn describe_sync(path: PathBuf) -> Result<PartitionMeta, VerifyError> {
        let file = File::open(&path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let metadata = builder.metadata();
        let row_count = metadata.file_metadata().num_rows().max(0) as usize;
        let columns = builder
            .schema()
            .fields()
            .iter()
            .filter(|f| !f.name().starts_with(PANDAS_INDEX_PREFIX))
            .map(|f| ColumnSchema {
                name: f.name().clone(),
                dtype: column_type_from_arrow(f.data_type()),
                nullable: f.is_nullable(),
                null_count: footer_null_count(metadata, f.name()),
            })
            .collect();
        Ok(PartitionMeta {
            path,
            format: PartitionFormat::Parquet,
            row_count,
            columns,
        })
    }

    fn read_column_sync(path: PathBuf, column: String) -> Result<ColumnValues, VerifyError> {
        let file = File::open(&path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let index = builder
            .schema()
            .fields()
            .iter()
            .position(|f| f.name() == &column)
            .ok_or_else(|| VerifyError::missing_column(&path, &column))?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
        let reader = builder.with_projection(mask).build()?;

        let options = FormatOptions::default();
        let mut values = Vec::new();
        for batch in reader {
            let batch = batch?;
            let array = batch.column(0);
            let formatter = ArrayFormatter::try_new(array.as_ref(), &options)?;
            for row in 0..array.len() {
                if array.is_null(row) {
                    values.push(None);
                } else {
                    values.push(Some(formatter.value(row).try_to_string()?));
                }
            }
        }
        Ok(values)
    }
}

/// Sum of per-row-group null counts for a flat top-level column. `None` when
/// the column is nested or any row group was written without statistics.
fn footer_null_count(metadata: &ParquetMetaData, column: &str) -> Option<usize> {
    let mut total = 0u64;
    for row_group in metadata.row_groups() {
        let chunk = row_group
            .columns()
            .iter()
            .find(|c| c.column_path().parts() == [column])?;
        total += chunk.statistics()?.null_count_opt()?;
    }
    Some(total as usize)
}

#[async_trait]
impl PartitionReader for ParquetReader {
    async fn describe(&self, path: &Path) -> Result<PartitionMeta, VerifyError> {
        tracing::debug!(partition = %path.display(), "Reading parquet footer");
        run_blocking(path, Self::describe_sync).await
    }

    async fn read_column(&self, path: &Path, column: &str) -> Result<ColumnValues, VerifyError> {
        tracing::debug!(partition = %path.display(), column, "Reading parquet column");
        let column = column.to_string();
        run_blocking(path, move |p| Self::read_column_sync(p, column)).await
    }
}

// ---------------------------------------------------------------------------
// CsvReader
// ---------------------------------------------------------------------------

/// CSV partition reader. CSV has no footer, so `describe` scans the file to
/// count rows and samples the head for dtype inference.
#[derive(Debug, Clone, Copy)]
pub struct CsvReader {
    pub delimiter: u8,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvReader {
    fn open(&self, path: &Path) -> Result<csv::Reader<File>, VerifyError> {
        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?)
    }

    fn describe_sync(self, path: PathBuf) -> Result<PartitionMeta, VerifyError> {
        let mut reader = self.open(&path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut sample: Vec<csv::StringRecord> = Vec::new();
        let mut row_count = 0usize;
        let mut nulls = vec![0usize; headers.len()];
        for record in reader.records() {
            let record = record?;
            for (i, n) in nulls.iter_mut().enumerate() {
                if record.get(i).is_none_or(str::is_empty) {
                    *n += 1;
                }
            }
            if sample.len() < CSV_INFERENCE_SAMPLE {
                sample.push(record);
            }
            row_count += 1;
        }

        let columns = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.starts_with(PANDAS_INDEX_PREFIX) && !name.is_empty())
            .map(|(i, name)| {
                let cells: Vec<Option<&str>> = sample.iter().map(|r| r.get(i)).collect();
                ColumnSchema {
                    name: name.clone(),
                    dtype: infer_column_type(&cells),
                    nullable: nulls[i] > 0,
                    null_count: Some(nulls[i]),
                }
            })
            .collect();

        Ok(PartitionMeta {
            path,
            format: PartitionFormat::Csv,
            row_count,
            columns,
        })
    }

    fn read_column_sync(self, path: PathBuf, column: String) -> Result<ColumnValues, VerifyError> {
        let mut reader = self.open(&path)?;
        let index = reader
            .headers()?
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == column)
            .ok_or_else(|| VerifyError::missing_column(&path, &column))?;

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cell = record.get(index).filter(|c| !c.is_empty());
            values.push(cell.map(str::to_string));
        }
        Ok(values)
    }
}

#[async_trait]
impl PartitionReader for CsvReader {
    async fn describe(&self, path: &Path) -> Result<PartitionMeta, VerifyError> {
        tracing::debug!(partition = %path.display(), "Scanning CSV partition");
        let reader = *self;
        run_blocking(path, move |p| reader.describe_sync(p)).await
    }

    async fn read_column(&self, path: &Path, column: &str) -> Result<ColumnValues, VerifyError> {
        tracing::debug!(partition = %path.display(), column, "Reading CSV column");
        let reader = *self;
        let column = column.to_string();
        run_blocking(path, move |p| reader.read_column_sync(p, column)).await
    }
}

// ---------------------------------------------------------------------------
// FileReader
// ---------------------------------------------------------------------------

/// Dispatches to the parquet or CSV reader by file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader {
    pub parquet: ParquetReader,
    pub csv: CsvReader,
}

impl FileReader {
    fn format_of(path: &Path) -> Result<PartitionFormat, VerifyError> {
        PartitionFormat::from_path(path)
            .ok_or_else(|| VerifyError::unreadable(path, "unsupported partition format"))
    }
}

#[async_trait]
impl PartitionReader for FileReader {
    async fn describe(&self, path: &Path) -> Result<PartitionMeta, VerifyError> {
        match Self::format_of(path)? {
            PartitionFormat::Parquet => self.parquet.describe(path).await,
            PartitionFormat::Csv => self.csv.describe(path).await,
        }
    }

    async fn read_column(&self, path: &Path, column: &str) -> Result<ColumnValues, VerifyError> {
        match Self::format_of(path)? {
            PartitionFormat::Parquet => self.parquet.read_column(path, column).await,
            PartitionFormat::Csv => self.csv.read_column(path, column).await,
        }
    }
}
