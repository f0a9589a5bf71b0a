//! Dataset persistence: output format selection and file sinks.

pub mod csv;
pub mod parquet;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tablesmith_core::TableSpec;

use crate::errors::{GenerationError, OutputFormatError};
use crate::model::GenerationContext;
use crate::registry::Dataset;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    /// Case-insensitive lookup of a format selector.
    pub fn parse(raw: &str) -> Result<Self, OutputFormatError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            _ => Err(OutputFormatError {
                requested: raw.to_string(),
                table: None,
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// File written for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOutput {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Destination for generated datasets.
pub trait DatasetSink {
    /// Persist one table. Returns `None` when nothing was written to disk.
    fn persist(
        &mut self,
        table: &TableSpec,
        dataset: &Dataset,
    ) -> Result<Option<PersistedOutput>, GenerationError>;
}

/// Writes `<dir>/<table>.<ext>` for each table.
///
/// The format selector is validated per table, so an unsupported format
/// fails each table individually rather than the whole run.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    format: String,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            format: format.into(),
        }
    }

    pub fn from_context(ctx: &GenerationContext) -> Self {
        Self::new(ctx.output_dir.clone(), ctx.output_format.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a table would be written to, if the format is valid.
    pub fn path_for(&self, table: &str) -> Result<PathBuf, OutputFormatError> {
        let format = OutputFormat::parse(&self.format).map_err(|err| err.for_table(table))?;
        Ok(self.dir.join(format!("{table}.{}", format.extension())))
    }
}

impl DatasetSink for FileSink {
    fn persist(
        &mut self,
        table: &TableSpec,
        dataset: &Dataset,
    ) -> Result<Option<PersistedOutput>, GenerationError> {
        let format =
            OutputFormat::parse(&self.format).map_err(|err| err.for_table(&table.name))?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.{}", table.name, format.extension()));

        let bytes_written = match format {
            OutputFormat::Csv => csv::write_dataset_csv(&path, dataset)?,
            OutputFormat::Parquet => parquet::write_dataset_parquet(&path, table, dataset)?,
        };
        debug!(
            table = %table.name,
            path = %path.display(),
            format = %format,
            bytes_written,
            "dataset persisted"
        );

        Ok(Some(PersistedOutput {
            path,
            bytes_written,
        }))
    }
}

/// Sink that keeps nothing; useful when only in-memory datasets matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DatasetSink for NullSink {
    fn persist(
        &mut self,
        _table: &TableSpec,
        _dataset: &Dataset,
    ) -> Result<Option<PersistedOutput>, GenerationError> {
        Ok(None)
    }
}

pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
