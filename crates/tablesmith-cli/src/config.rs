use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tablesmith_generate::{DateFormat, GenerationContext};

use crate::{CliError, CliResult};

pub const DEFAULT_CONFIG_FILE: &str = "tablesmith.toml";
const DEFAULT_SCHEMA_DIR: &str = "schemas";
const DEFAULT_OUTPUT_DIR: &str = "output_files";
const DEFAULT_ROWS: u64 = 1000;
const DEFAULT_FORMAT: &str = "csv";

/// Settings read from `tablesmith.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub schema_dir: Option<PathBuf>,
    pub rows: Option<u64>,
    pub format: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub date_format: Option<DateFormat>,
    pub reference_date: Option<NaiveDate>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub schema_dir: Option<PathBuf>,
    pub rows: Option<u64>,
    pub format: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub date_format: Option<DateFormat>,
    pub reference_date: Option<NaiveDate>,
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub schema_dir: PathBuf,
    pub rows: u64,
    pub format: String,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub date_format: DateFormat,
    pub reference_date: NaiveDate,
}

impl RunSettings {
    pub fn context(&self) -> GenerationContext {
        GenerationContext {
            rows: self.rows,
            output_format: self.format.clone(),
            output_dir: self.output_dir.clone(),
            seed: self.seed,
            reference_date: self.reference_date,
            date_format: self.date_format,
        }
    }
}

/// Load the configuration file.
///
/// An explicit path must exist. Without one, `tablesmith.toml` in the current
/// directory is used when present.
pub fn load_config(path: Option<&Path>) -> CliResult<FileConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|err| {
        CliError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
    })?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Merge file values and overrides; an unset seed draws a fresh one.
pub fn resolve(file: FileConfig, overrides: Overrides) -> CliResult<RunSettings> {
    let rows = overrides.rows.or(file.rows).unwrap_or(DEFAULT_ROWS);
    let format = overrides
        .format
        .or(file.format)
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    if format.trim().is_empty() {
        return Err(CliError::InvalidConfig(
            "output format must not be empty".to_string(),
        ));
    }

    Ok(RunSettings {
        schema_dir: overrides
            .schema_dir
            .or(file.schema_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR)),
        rows,
        format,
        output_dir: overrides
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        seed: overrides
            .seed
            .or(file.seed)
            .unwrap_or_else(|| uuid::Uuid::new_v4().as_u64_pair().0),
        date_format: overrides.date_format.or(file.date_format).unwrap_or_default(),
        reference_date: overrides
            .reference_date
            .or(file.reference_date)
            .unwrap_or_else(|| Utc::now().date_naive()),
    })
}
