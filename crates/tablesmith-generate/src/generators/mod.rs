use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use tablesmith_core::ColumnType;

use crate::faker::ValueProvider;
use crate::model::{DateFormat, GenerationContext};

/// Upper bound of the provider's default integer range.
const DEFAULT_INT_MAX: i64 = 9999;
const BIG_INT_FACTOR: i64 = 1_000_000;
const FLOAT_LEFT_DIGITS: u32 = 5;
const FLOAT_RIGHT_DIGITS: u32 = 2;
/// Width of the business-date window, in years before the reference year.
const BUSINESS_DATE_YEARS: i32 = 5;
/// Highest day-of-month valid in every month.
const BUSINESS_DATE_MAX_DAY: i64 = 28;

/// Generated value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn to_csv(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => format!("{value:.2}"),
            GeneratedValue::Decimal(value) => value.to_string(),
            GeneratedValue::Text(value) => value.clone(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            GeneratedValue::Date(value) => Some(*value),
            GeneratedValue::Timestamp(value) => Some(value.date()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            GeneratedValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }
}

/// Produce one value for a column type.
///
/// Unrecognized types always yield [`GeneratedValue::Null`].
pub fn synthesize(
    column_type: &ColumnType,
    ctx: &GenerationContext,
    provider: &mut dyn ValueProvider,
) -> GeneratedValue {
    match column_type {
        ColumnType::Integer => GeneratedValue::Int(provider.int_range(0, DEFAULT_INT_MAX)),
        ColumnType::BigInteger => {
            GeneratedValue::Int(provider.int_range(0, DEFAULT_INT_MAX) * BIG_INT_FACTOR)
        }
        ColumnType::Text => GeneratedValue::Text(provider.word()),
        ColumnType::Timestamp => GeneratedValue::Timestamp(provider.date_time()),
        ColumnType::Boolean => GeneratedValue::Bool(provider.boolean()),
        ColumnType::Float => {
            GeneratedValue::Float(provider.float(FLOAT_LEFT_DIGITS, FLOAT_RIGHT_DIGITS))
        }
        ColumnType::Decimal { precision, scale } => GeneratedValue::Decimal(
            provider.decimal(u32::from(precision - scale), u32::from(*scale)),
        ),
        ColumnType::BusinessDate => {
            business_date(ctx.reference_year(), ctx.date_format, provider)
        }
        ColumnType::Other { .. } => GeneratedValue::Null,
    }
}

/// Calendar-safe date within the five years ending at `reference_year`.
pub fn business_date(
    reference_year: i32,
    format: DateFormat,
    provider: &mut dyn ValueProvider,
) -> GeneratedValue {
    let year = provider.int_range(
        i64::from(reference_year - BUSINESS_DATE_YEARS),
        i64::from(reference_year),
    ) as i32;
    let month = provider.int_range(1, 12) as u32;
    let day = provider.int_range(1, BUSINESS_DATE_MAX_DAY) as u32;

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => match format {
            DateFormat::Iso => GeneratedValue::Date(date),
            DateFormat::Compact => GeneratedValue::Int(compact_date(date)),
        },
        None => GeneratedValue::Null,
    }
}

fn compact_date(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faker::FakerProvider;

    fn ctx(format: DateFormat) -> GenerationContext {
        GenerationContext {
            reference_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            date_format: format,
            ..GenerationContext::new(10)
        }
    }

    fn provider() -> FakerProvider {
        FakerProvider::new(42, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn business_dates_stay_in_window() {
        let mut provider = provider();
        for _ in 0..500 {
            let value = business_date(2026, DateFormat::Iso, &mut provider);
            let date = value.as_date().expect("iso business date");
            assert!((2021..=2026).contains(&date.year()));
            assert!((1..=28).contains(&date.day()));
        }
    }

    #[test]
    fn compact_business_dates_are_eight_digit_integers() {
        let mut provider = provider();
        for _ in 0..200 {
            let value = business_date(2026, DateFormat::Compact, &mut provider);
            let raw = value.as_i64().expect("compact business date");
            assert!((20210101..=20261228).contains(&raw));
            let day = raw % 100;
            let month = (raw / 100) % 100;
            assert!((1..=28).contains(&day));
            assert!((1..=12).contains(&month));
        }
    }

    #[test]
    fn fixed_point_values_have_exact_scale() {
        let ctx = ctx(DateFormat::Iso);
        let mut provider = provider();
        let column_type = ColumnType::Decimal {
            precision: 10,
            scale: 2,
        };
        for _ in 0..300 {
            let value = synthesize(&column_type, &ctx, &mut provider);
            let text = value.to_csv();
            let (whole, fraction) = text.split_once('.').expect("decimal point");
            assert_eq!(fraction.len(), 2, "{text}");
            assert!(whole.len() <= 8, "{text}");
            assert!(!whole.starts_with('-'), "{text}");
        }
    }

    #[test]
    fn floats_render_with_two_fractional_digits() {
        let ctx = ctx(DateFormat::Iso);
        let mut provider = provider();
        for _ in 0..500 {
            let text = synthesize(&ColumnType::Float, &ctx, &mut provider).to_csv();
            let (whole, fraction) = text.split_once('.').expect("decimal point");
            assert_eq!(fraction.len(), 2, "{text}");
            assert!(whole.trim_start_matches('-').len() <= 5, "{text}");
        }
        assert_eq!(GeneratedValue::Float(12345.5).to_csv(), "12345.50");
        assert_eq!(GeneratedValue::Float(-7.0).to_csv(), "-7.00");
    }

    #[test]
    fn big_integers_are_scaled() {
        let ctx = ctx(DateFormat::Iso);
        let mut provider = provider();
        for _ in 0..50 {
            let value = synthesize(&ColumnType::BigInteger, &ctx, &mut provider)
                .as_i64()
                .expect("int");
            assert_eq!(value % BIG_INT_FACTOR, 0);
            assert!((0..=DEFAULT_INT_MAX * BIG_INT_FACTOR).contains(&value));
        }
    }

    #[test]
    fn dispatches_each_type_to_its_shape() {
        let ctx = ctx(DateFormat::Iso);
        let mut provider = provider();
        assert!(matches!(
            synthesize(&ColumnType::Integer, &ctx, &mut provider),
            GeneratedValue::Int(0..=9999)
        ));
        assert!(matches!(
            synthesize(&ColumnType::Text, &ctx, &mut provider),
            GeneratedValue::Text(ref word) if !word.is_empty()
        ));
        assert!(matches!(
            synthesize(&ColumnType::Boolean, &ctx, &mut provider),
            GeneratedValue::Bool(_)
        ));
        assert!(matches!(
            synthesize(&ColumnType::Timestamp, &ctx, &mut provider),
            GeneratedValue::Timestamp(_)
        ));
        assert!(matches!(
            synthesize(&ColumnType::Float, &ctx, &mut provider),
            GeneratedValue::Float(_)
        ));
        assert_eq!(
            synthesize(
                &ColumnType::Other {
                    tag: "uuid".to_string()
                },
                &ctx,
                &mut provider
            ),
            GeneratedValue::Null
        );
    }
}
