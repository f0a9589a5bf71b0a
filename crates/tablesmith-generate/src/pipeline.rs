//! Run driver: parse sources, order tables, generate, persist, report.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use tablesmith_core::{
    DependencyCycleError, SchemaError, TableSpec, UnresolvedReason, order_tables, parse_file,
    parse_str,
};

use crate::engine::generate_table;
use crate::errors::{GenerationError, MissingParentData};
use crate::model::{GenerationContext, GenerationIssue, GenerationReport, TableReport};
use crate::output::DatasetSink;
use crate::registry::{DataRegistry, Dataset};

/// Where a schema description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    File(PathBuf),
    /// JSON text held in memory; `id` stands in for the file name.
    Inline { id: String, text: String },
}

impl SchemaSource {
    pub fn inline(id: impl Into<String>, text: impl Into<String>) -> Self {
        SchemaSource::Inline {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn id(&self) -> String {
        match self {
            SchemaSource::File(path) => path.display().to_string(),
            SchemaSource::Inline { id, .. } => id.clone(),
        }
    }

    pub fn load(&self) -> Result<TableSpec, SchemaError> {
        match self {
            SchemaSource::File(path) => parse_file(path),
            SchemaSource::Inline { id, text } => parse_str(text, id),
        }
    }
}

/// List the `*.json` files of a directory, sorted by file name.
pub fn discover_schema_files(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        SchemaError::new(
            dir.display().to_string(),
            format!("cannot read schema directory: {err}"),
        )
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            SchemaError::new(
                dir.display().to_string(),
                format!("cannot read schema directory: {err}"),
            )
        })?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Parse every source, keeping the first table of each name.
///
/// A source that fails to parse, or repeats an earlier table name, is logged
/// and returned as a [`SchemaError`] instead of a table.
pub fn load_tables(sources: &[SchemaSource]) -> (Vec<TableSpec>, Vec<SchemaError>) {
    let mut tables = Vec::with_capacity(sources.len());
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for source in sources {
        let parsed = source.load().and_then(|table| {
            if seen.insert(table.name.clone()) {
                Ok(table)
            } else {
                Err(SchemaError::new(
                    source.id(),
                    format!("duplicate table name '{}'", table.name),
                ))
            }
        });
        match parsed {
            Ok(table) => tables.push(table),
            Err(err) => {
                warn!(code = "schema_error", source = %source.id(), error = %err, "skipping schema");
                errors.push(err);
            }
        }
    }
    (tables, errors)
}

/// Everything a run produced, including what went wrong along the way.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub datasets: BTreeMap<String, Arc<Dataset>>,
    pub errors: Vec<GenerationError>,
    pub warnings: Vec<MissingParentData>,
    pub report: GenerationReport,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Sequential generation driver over one run context.
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    ctx: GenerationContext,
}

impl GenerationPipeline {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    /// Generate every table described by `sources` in dependency order.
    ///
    /// Schema and output failures are collected per table; only a foreign-key
    /// cycle aborts the run.
    pub fn run(
        &self,
        sources: &[SchemaSource],
        sink: &mut dyn DatasetSink,
    ) -> Result<PipelineOutcome, DependencyCycleError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut report = GenerationReport::new(run_id.clone(), &self.ctx);
        let mut errors: Vec<GenerationError> = Vec::new();
        let mut warnings: Vec<MissingParentData> = Vec::new();

        info!(
            run_id = %run_id,
            sources = sources.len(),
            rows = self.ctx.rows,
            seed = self.ctx.seed,
            format = %self.ctx.output_format,
            "generation started"
        );

        let (tables, schema_errors) = load_tables(sources);
        for err in schema_errors {
            record_error(&mut report, &mut errors, err.into());
        }

        let order = match order_tables(tables) {
            Ok(order) => order,
            Err(err) => {
                warn!(
                    code = "dependency_cycle",
                    cycle = %err.cycle.join(" -> "),
                    unplaced = err.unplaced.len(),
                    "generation aborted"
                );
                return Err(err);
            }
        };

        for unresolved in &order.unresolved {
            let target = format!(
                "{}.{}",
                unresolved.foreign_key.target_table, unresolved.foreign_key.target_column
            );
            let detail = match unresolved.reason {
                UnresolvedReason::MissingTable => "target table is not part of the run",
                UnresolvedReason::MissingColumn => "target column does not exist",
            };
            warn!(
                code = "unresolved_foreign_key",
                table = %unresolved.table,
                column = %unresolved.foreign_key.column,
                target = %target,
                "{detail}"
            );
        }

        let mut registry = DataRegistry::new();
        for ordered in &order.tables {
            let table = &ordered.spec;
            let table_start = Instant::now();
            info!(
                table = %table.name,
                rows = self.ctx.rows,
                level = ordered.level,
                "generating table"
            );

            let mut provider = self.ctx.provider_for(&table.name);
            let output = generate_table(table, self.ctx.rows, &registry, &self.ctx, &mut provider);
            for warning in &output.warnings {
                report.record_warning(GenerationIssue::from(warning));
            }
            warnings.extend(output.warnings);

            let rows_generated = output.dataset.len() as u64;
            let dataset = registry.put(output.dataset);

            let persisted = match sink.persist(table, &dataset) {
                Ok(persisted) => persisted,
                Err(err) => {
                    warn!(
                        code = err.code(),
                        table = %table.name,
                        error = %err,
                        "table output failed"
                    );
                    record_error(&mut report, &mut errors, err);
                    None
                }
            };

            report.tables.push(TableReport {
                table: table.name.clone(),
                source: table.source.clone(),
                level: ordered.level,
                rows_requested: self.ctx.rows,
                rows_generated,
                output: persisted.as_ref().map(|out| out.path.clone()),
                bytes_written: persisted.as_ref().map_or(0, |out| out.bytes_written),
            });

            info!(
                table = %table.name,
                rows_generated,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(PipelineOutcome {
            datasets: registry.into_inner(),
            errors,
            warnings,
            report,
        })
    }
}

fn record_error(
    report: &mut GenerationReport,
    errors: &mut Vec<GenerationError>,
    error: GenerationError,
) {
    report.record_error(GenerationIssue::from(&error));
    errors.push(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NullSink;

    #[test]
    fn duplicate_table_names_reject_the_later_source() {
        let sources = vec![
            SchemaSource::inline("a.json", r#"{"table_name": "dim", "columns": {"id": "int"}}"#),
            SchemaSource::inline("b.json", r#"{"table_name": "dim", "columns": {"code": "string"}}"#),
        ];
        let outcome = GenerationPipeline::new(GenerationContext::new(3))
            .run(&sources, &mut NullSink)
            .unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].to_string().contains("b.json"));
        assert_eq!(outcome.datasets["dim"].columns, vec!["id"]);
    }

    #[test]
    fn load_tables_keeps_the_first_of_duplicate_names() {
        let sources = vec![
            SchemaSource::inline("a.json", r#"{"table_name": "dim", "columns": {"id": "int"}}"#),
            SchemaSource::inline("b.json", r#"{"table_name": "dim", "columns": {"code": "string"}}"#),
            SchemaSource::inline("c.json", "{ nope"),
        ];
        let (tables, errors) = load_tables(&sources);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].source, "a.json");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("b.json"));
        assert!(errors[0].to_string().contains("duplicate table name 'dim'"));
        assert!(errors[1].to_string().contains("c.json"));
    }

    #[test]
    fn null_sink_keeps_datasets_in_memory() {
        let sources = vec![SchemaSource::inline("dim_store.json", r#"{"store_id": "int"}"#)];
        let outcome = GenerationPipeline::new(GenerationContext::new(4))
            .run(&sources, &mut NullSink)
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.datasets["dim_store"].len(), 4);
        let table = outcome.report.table("dim_store").unwrap();
        assert_eq!(table.rows_generated, 4);
        assert!(table.output.is_none());
    }
}
