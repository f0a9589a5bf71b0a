use serde::{Deserialize, Serialize};
use thiserror::Error;

use tablesmith_core::{DependencyCycleError, SchemaError};

/// Requested output format is not one of the supported writers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported output format '{requested}'{}, expected csv or parquet", table_suffix(.table))]
pub struct OutputFormatError {
    pub requested: String,
    pub table: Option<String>,
}

impl OutputFormatError {
    pub fn for_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(table) => format!(" for table '{table}'"),
        None => String::new(),
    }
}

/// Why a foreign-key column could not be filled from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingParentReason {
    /// The target table is not in the registry.
    TableNotGenerated,
    /// The target column does not exist in the target dataset.
    ColumnNotFound,
    /// The target column holds no non-null values.
    NoValues,
}

/// A foreign-key column was emitted as null because parent data was missing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "missing parent data for {table}.{column} -> {target_table}.{target_column} ({reason:?}); emitted null"
)]
pub struct MissingParentData {
    pub table: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    pub reason: MissingParentReason,
}

/// Errors emitted by the generation pipeline.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    DependencyCycle(#[from] DependencyCycleError),
    #[error(transparent)]
    OutputFormat(#[from] OutputFormatError),
    #[error(transparent)]
    MissingParentData(#[from] MissingParentData),
    #[error("value in {table}.{column} does not match the column's other values")]
    MixedColumn { table: String, column: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl GenerationError {
    /// Stable code used in reports and log events.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Schema(_) => "schema_error",
            GenerationError::DependencyCycle(_) => "dependency_cycle",
            GenerationError::OutputFormat(_) => "output_format",
            GenerationError::MissingParentData(_) => "missing_parent_data",
            GenerationError::MixedColumn { .. } => "mixed_column",
            GenerationError::Io(_) => "io_error",
            GenerationError::Json(_) => "json_error",
            GenerationError::Csv(_) => "csv_error",
            GenerationError::Arrow(_) => "arrow_error",
            GenerationError::Parquet(_) => "parquet_error",
        }
    }
}
