//! Column schema and type inference for partitions.

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

/// Column data type, as far as the verifier cares to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    Date,
    DateTime,
    Null,
    Unknown,
}

impl ColumnType {
    /// Whether this type carries information worth comparing across partitions.
    ///
    /// An all-null CSV column infers as `Null`, which says nothing about the
    /// producer's intended type.
    pub fn is_informative(self) -> bool {
        !matches!(self, ColumnType::Null | ColumnType::Unknown)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    pub nullable: bool,
    /// Null cells, when the format records them without a data scan
    /// (parquet footer statistics) or the describe already scanned (CSV).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_count: Option<usize>,
}

/// Map an Arrow type (as decoded from a parquet footer) onto a `ColumnType`.
pub fn column_type_from_arrow(dtype: &DataType) -> ColumnType {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => ColumnType::Float,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::String,
        DataType::Boolean => ColumnType::Boolean,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        DataType::Timestamp(_, _) => ColumnType::DateTime,
        DataType::Null => ColumnType::Null,
        DataType::Dictionary(_, value) => column_type_from_arrow(value),
        _ => ColumnType::Unknown,
    }
}

/// Infer a column type from a sample of raw text cells (CSV).
///
/// Empty cells count as nulls. A column mixing numbers and text is `String`.
pub fn infer_column_type(values: &[Option<&str>]) -> ColumnType {
    let non_null: Vec<&str> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_empty())
        .collect();
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_date = false;
    let mut has_string = false;

    for v in &non_null {
        if v.parse::<i64>().is_ok() {
            has_int = true;
        } else if v.parse::<f64>().is_ok() {
            has_float = true;
        } else if *v == "true" || *v == "false" || *v == "True" || *v == "False" {
            has_bool = true;
        } else if crate::data::dates::parse_calendar_date(v).is_some() {
            has_date = true;
        } else {
            has_string = true;
        }
    }

    if has_string || (has_date && (has_int || has_float || has_bool)) {
        return ColumnType::String;
    }
    if has_date {
        return ColumnType::Date;
    }
    if has_bool && (has_int || has_float) {
        return ColumnType::String;
    }
    if has_float {
        return ColumnType::Float;
    }
    if has_int {
        return ColumnType::Integer;
    }
    if has_bool {
        return ColumnType::Boolean;
    }
    ColumnType::Unknown
}
