use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest precision a fixed-point column may declare.
pub const MAX_DECIMAL_PRECISION: u8 = 28;

static DECIMAL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^decimal\s*\(\s*([^,\s]*)\s*,\s*([^)\s]*)\s*\)$").expect("valid decimal regex")
});

/// Semantic column type, resolved once from the schema's type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    BigInteger,
    Text,
    Timestamp,
    Boolean,
    Float,
    Decimal { precision: u8, scale: u8 },
    BusinessDate,
    /// Tag not understood by the generator; kept verbatim for reporting.
    Other { tag: String },
}

/// A type tag that looks like a fixed-point type but carries bad parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeTagError {
    #[error("malformed decimal tag '{0}', expected decimal(precision,scale)")]
    MalformedDecimal(String),
    #[error("decimal parameters in '{tag}' must be positive integers")]
    NonPositive { tag: String },
    #[error("decimal scale {scale} exceeds precision {precision}")]
    ScaleExceedsPrecision { precision: u32, scale: u32 },
    #[error("decimal precision {precision} exceeds the maximum of {max}", max = MAX_DECIMAL_PRECISION)]
    PrecisionTooLarge { precision: u32 },
}

impl ColumnType {
    /// Resolve a raw type tag such as `int`, `string` or `decimal(10,2)`.
    pub fn from_tag(tag: &str) -> Result<Self, TypeTagError> {
        let normalized = tag.trim().to_ascii_lowercase();
        let column_type = match normalized.as_str() {
            "int" | "integer" => ColumnType::Integer,
            "bigint" => ColumnType::BigInteger,
            "string" | "text" => ColumnType::Text,
            "timestamp" => ColumnType::Timestamp,
            "boolean" | "bool" => ColumnType::Boolean,
            "double" | "float" => ColumnType::Float,
            "business_date" => ColumnType::BusinessDate,
            other if other.starts_with("decimal") => parse_decimal(other)?,
            _ => ColumnType::Other {
                tag: tag.trim().to_string(),
            },
        };
        Ok(column_type)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ColumnType::Other { .. })
    }
}

fn parse_decimal(tag: &str) -> Result<ColumnType, TypeTagError> {
    let captures = DECIMAL_TAG
        .captures(tag)
        .ok_or_else(|| TypeTagError::MalformedDecimal(tag.to_string()))?;
    let parse = |index: usize| -> Result<u32, TypeTagError> {
        captures[index]
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| TypeTagError::NonPositive {
                tag: tag.to_string(),
            })
    };
    let precision = parse(1)?;
    let scale = parse(2)?;

    if scale > precision {
        return Err(TypeTagError::ScaleExceedsPrecision { precision, scale });
    }
    if precision > u32::from(MAX_DECIMAL_PRECISION) {
        return Err(TypeTagError::PrecisionTooLarge { precision });
    }

    Ok(ColumnType::Decimal {
        precision: precision as u8,
        scale: scale as u8,
    })
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("int"),
            ColumnType::BigInteger => f.write_str("bigint"),
            ColumnType::Text => f.write_str("string"),
            ColumnType::Timestamp => f.write_str("timestamp"),
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::Float => f.write_str("double"),
            ColumnType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            ColumnType::BusinessDate => f.write_str("business_date"),
            ColumnType::Other { tag } => f.write_str(tag),
        }
    }
}
