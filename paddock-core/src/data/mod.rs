//! Partition access: formats, metadata, column reads and date parsing.

pub mod dates;
pub mod partition;
pub mod schema;
pub mod source;

pub use dates::parse_calendar_date;
pub use partition::{PartitionFormat, PartitionMeta, partition_key, resolve_all, resolve_partitions};
pub use schema::{ColumnSchema, ColumnType};
pub use source::{ColumnValues, CsvReader, FileReader, ParquetReader, PartitionReader};
