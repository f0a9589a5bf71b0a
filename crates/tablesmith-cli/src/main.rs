mod config;
mod logging;
mod report;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use tablesmith_core::{DependencyCycleError, SchemaError, order_tables};
use tablesmith_generate::{
    DateFormat, FileSink, GenerationError, GenerationPipeline, SchemaSource,
    discover_schema_files, load_tables,
};

use config::{Overrides, RunSettings, load_config, resolve};
use logging::{LogOptions, init_logging};
use report::write_report;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    DependencyCycle(#[from] DependencyCycleError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("generation finished with {0} error(s); see the run report")]
    RunFailed(usize),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "tablesmith", version, about = "Schema-driven multi-table test data generator")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    /// Append logs to a file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one output file per schema, parents first.
    Generate(RunArgs),
    /// Print the generation order and dependency levels without generating.
    Order(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file (defaults to ./tablesmith.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding one JSON schema per table.
    #[arg(long, value_name = "DIR")]
    schemas: Option<PathBuf>,
    /// Rows generated per table.
    #[arg(long)]
    rows: Option<u64>,
    /// Output format: csv or parquet.
    #[arg(long)]
    format: Option<String>,
    /// Output directory.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Business date rendering.
    #[arg(long, value_enum)]
    date_format: Option<DateFormatArg>,
    /// Reference "today" for business dates and timestamps (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    reference_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateFormatArg {
    Iso,
    Compact,
}

impl From<DateFormatArg> for DateFormat {
    fn from(value: DateFormatArg) -> Self {
        match value {
            DateFormatArg::Iso => DateFormat::Iso,
            DateFormatArg::Compact => DateFormat::Compact,
        }
    }
}

impl RunArgs {
    fn settings(&self) -> CliResult<RunSettings> {
        let file = load_config(self.config.as_deref())?;
        resolve(
            file,
            Overrides {
                schema_dir: self.schemas.clone(),
                rows: self.rows,
                format: self.format.clone(),
                output_dir: self.out.clone(),
                seed: self.seed,
                date_format: self.date_format.map(DateFormat::from),
                reference_date: self.reference_date,
            },
        )
    }
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(&LogOptions {
        json: cli.log_json,
        file: cli.log_file.clone(),
    })?;

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Order(args) => run_order(args),
    }
}

fn schema_sources(settings: &RunSettings) -> CliResult<Vec<SchemaSource>> {
    let files = discover_schema_files(&settings.schema_dir)?;
    if files.is_empty() {
        tracing::warn!(
            schema_dir = %settings.schema_dir.display(),
            "no schema files found"
        );
    }
    Ok(files.into_iter().map(SchemaSource::File).collect())
}

fn run_generate(args: RunArgs) -> CliResult<()> {
    let settings = args.settings()?;
    tracing::info!(
        schema_dir = %settings.schema_dir.display(),
        output_dir = %settings.output_dir.display(),
        rows = settings.rows,
        format = %settings.format,
        seed = settings.seed,
        reference_date = %settings.reference_date,
        "run configured"
    );

    let sources = schema_sources(&settings)?;
    let ctx = settings.context();
    let mut sink = FileSink::from_context(&ctx);
    let outcome = GenerationPipeline::new(ctx).run(&sources, &mut sink)?;

    let report_path = write_report(&settings.output_dir, &outcome.report)?;
    tracing::info!(path = %report_path.display(), "report written");

    if outcome.errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::RunFailed(outcome.errors.len()))
    }
}

fn run_order(args: RunArgs) -> CliResult<()> {
    let settings = args.settings()?;
    let sources = schema_sources(&settings)?;

    let (tables, schema_errors) = load_tables(&sources);

    let order = order_tables(tables)?;
    for (level, names) in order.levels().iter().enumerate() {
        println!("level {level}: {}", names.join(", "));
    }
    for unresolved in &order.unresolved {
        println!(
            "unresolved: {}.{} -> {}.{}",
            unresolved.table,
            unresolved.foreign_key.column,
            unresolved.foreign_key.target_table,
            unresolved.foreign_key.target_column
        );
    }

    if schema_errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::RunFailed(schema_errors.len()))
    }
}
