use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Decimal128Array, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use tablesmith_core::{ColumnType, TableSpec};

use super::CountingWriter;
use crate::errors::GenerationError;
use crate::generators::GeneratedValue;
use crate::registry::Dataset;

/// Widest precision an Arrow 128-bit decimal carries.
const ARROW_MAX_DECIMAL_PRECISION: u8 = 38;
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Physical representation of one output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int,
    Float,
    Decimal { precision: u8, scale: u8 },
    Text,
    Date,
    Timestamp,
}

impl ColumnKind {
    /// Kind implied by a value, refined with the declared type for decimals.
    fn of_value(value: &GeneratedValue, declared: Option<&ColumnType>) -> Option<Self> {
        let kind = match value {
            GeneratedValue::Null => return None,
            GeneratedValue::Bool(_) => ColumnKind::Boolean,
            GeneratedValue::Int(_) => ColumnKind::Int,
            GeneratedValue::Float(_) => ColumnKind::Float,
            GeneratedValue::Decimal(decimal) => match declared {
                Some(ColumnType::Decimal { precision, scale }) => ColumnKind::Decimal {
                    precision: *precision,
                    scale: *scale,
                },
                _ => ColumnKind::Decimal {
                    precision: ARROW_MAX_DECIMAL_PRECISION,
                    scale: decimal.scale() as u8,
                },
            },
            GeneratedValue::Text(_) => ColumnKind::Text,
            GeneratedValue::Date(_) => ColumnKind::Date,
            GeneratedValue::Timestamp(_) => ColumnKind::Timestamp,
        };
        Some(kind)
    }

    /// Kind used when a column holds no values at all.
    fn of_declared(declared: Option<&ColumnType>) -> Self {
        match declared {
            Some(ColumnType::Integer | ColumnType::BigInteger) => ColumnKind::Int,
            Some(ColumnType::Boolean) => ColumnKind::Boolean,
            Some(ColumnType::Float) => ColumnKind::Float,
            Some(ColumnType::Decimal { precision, scale }) => ColumnKind::Decimal {
                precision: *precision,
                scale: *scale,
            },
            Some(ColumnType::Timestamp) => ColumnKind::Timestamp,
            Some(ColumnType::BusinessDate) => ColumnKind::Date,
            Some(ColumnType::Text | ColumnType::Other { .. }) | None => ColumnKind::Text,
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Decimal { precision, scale } => {
                DataType::Decimal128(*precision, *scale as i8)
            }
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Date => DataType::Date32,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }
}

/// Write a dataset as a single-row-group Parquet file.
///
/// Column types follow the first non-null value of each column, falling back
/// to the declared type when a column is entirely null.
pub fn write_dataset_parquet(
    path: &Path,
    table: &TableSpec,
    dataset: &Dataset,
) -> Result<u64, GenerationError> {
    let mut fields = Vec::with_capacity(dataset.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.columns.len());

    for column in &dataset.columns {
        let declared = table.column(column).map(|spec| &spec.column_type);
        let kind = dataset
            .column_values(column)
            .find_map(|value| ColumnKind::of_value(value, declared))
            .unwrap_or_else(|| ColumnKind::of_declared(declared));
        fields.push(Field::new(column.as_str(), kind.data_type(), true));
        arrays.push(build_array(&table.name, column, kind, dataset)?);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    let file = BufWriter::new(File::create(path)?);
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(CountingWriter::new(file), schema, Some(props))?;
    writer.write(&batch)?;
    let counting = writer.into_inner()?;
    Ok(counting.bytes_written())
}

fn build_array(
    table: &str,
    column: &str,
    kind: ColumnKind,
    dataset: &Dataset,
) -> Result<ArrayRef, GenerationError> {
    let mixed = || GenerationError::MixedColumn {
        table: table.to_string(),
        column: column.to_string(),
    };
    let values = dataset.column_values(column);

    let array: ArrayRef = match kind {
        ColumnKind::Boolean => Arc::new(BooleanArray::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Bool(flag) => Ok(Some(*flag)),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        ColumnKind::Int => Arc::new(Int64Array::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Int(number) => Ok(Some(*number)),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        ColumnKind::Float => Arc::new(Float64Array::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Float(number) => Ok(Some(*number)),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        ColumnKind::Decimal { precision, scale } => {
            let mantissas = values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Decimal(decimal) => {
                        let mut decimal = *decimal;
                        decimal.rescale(u32::from(scale));
                        Ok(Some(decimal.mantissa()))
                    }
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(
                Decimal128Array::from(mantissas)
                    .with_precision_and_scale(precision, scale as i8)?,
            )
        }
        ColumnKind::Text => Arc::new(StringArray::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Text(text) => Ok(Some(text.clone())),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        ColumnKind::Date => Arc::new(Date32Array::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Date(date) => Ok(Some(days_since_epoch(*date))),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        ColumnKind::Timestamp => Arc::new(TimestampMicrosecondArray::from(
            values
                .map(|value| match value {
                    GeneratedValue::Null => Ok(None),
                    GeneratedValue::Timestamp(moment) => {
                        Ok(Some(moment.and_utc().timestamp_micros()))
                    }
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
    };
    Ok(array)
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
