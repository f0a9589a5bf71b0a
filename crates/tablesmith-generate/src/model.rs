use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{GenerationError, MissingParentData};
use crate::faker::FakerProvider;

/// How business dates are rendered; fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD` date values.
    #[default]
    Iso,
    /// `YYYYMMDD` integers.
    Compact,
}

/// Per-run configuration, passed explicitly to every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Rows generated for every table.
    pub rows: u64,
    /// Output format selector, validated when a table is persisted.
    pub output_format: String,
    /// Directory receiving one file per table.
    pub output_dir: PathBuf,
    /// Seed for the per-table value streams.
    pub seed: u64,
    /// "Today" for the business-date window and timestamp upper bound.
    pub reference_date: NaiveDate,
    pub date_format: DateFormat,
}

impl GenerationContext {
    pub fn new(rows: u64) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_date.year()
    }

    /// Deterministic provider for one table, derived from the run seed.
    pub fn provider_for(&self, table: &str) -> FakerProvider {
        FakerProvider::new(hash_seed(self.seed, table), self.reference_date)
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self {
            rows: 1000,
            output_format: "csv".to_string(),
            output_dir: PathBuf::from("output_files"),
            seed: 0,
            reference_date: Utc::now().date_naive(),
            date_format: DateFormat::Iso,
        }
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub source: String,
    pub level: usize,
    pub rows_requested: u64,
    pub rows_generated: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub bytes_written: u64,
}

/// Structured generation issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
            column: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "error".to_string(),
            code: code.to_string(),
            ..Self::warning(code, message)
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl From<&MissingParentData> for GenerationIssue {
    fn from(warning: &MissingParentData) -> Self {
        GenerationIssue::warning("missing_parent_data", warning.to_string())
            .with_table(&warning.table)
            .with_column(&warning.column)
    }
}

impl From<&GenerationError> for GenerationIssue {
    fn from(error: &GenerationError) -> Self {
        let issue = GenerationIssue::error(error.code(), error.to_string());
        match error {
            GenerationError::Schema(err) => match &err.column {
                Some(column) => issue.with_table(&err.origin).with_column(column),
                None => issue.with_table(&err.origin),
            },
            GenerationError::OutputFormat(err) => match &err.table {
                Some(table) => issue.with_table(table),
                None => issue,
            },
            GenerationError::MissingParentData(err) => {
                issue.with_table(&err.table).with_column(&err.column)
            }
            GenerationError::MixedColumn { table, column } => {
                issue.with_table(table).with_column(column)
            }
            _ => issue,
        }
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub rows_per_table: u64,
    pub output_format: String,
    pub reference_date: NaiveDate,
    pub tables: Vec<TableReport>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub errors_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
    pub errors: Vec<GenerationIssue>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, ctx: &GenerationContext) -> Self {
        Self {
            run_id,
            seed: ctx.seed,
            rows_per_table: ctx.rows,
            output_format: ctx.output_format.clone(),
            reference_date: ctx.reference_date,
            tables: Vec::new(),
            warnings_by_code: BTreeMap::new(),
            errors_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn record_error(&mut self, issue: GenerationIssue) {
        *self.errors_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.errors.push(issue);
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }
}
