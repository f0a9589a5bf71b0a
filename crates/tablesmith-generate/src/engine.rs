use std::time::Instant;

use tracing::{debug, warn};

use tablesmith_core::{ColumnType, TableSpec};

use crate::errors::MissingParentData;
use crate::faker::ValueProvider;
use crate::generators::{GeneratedValue, business_date, synthesize};
use crate::model::GenerationContext;
use crate::registry::{DataRegistry, Dataset, ParentColumn, Row};

/// Dataset for one table plus the warnings raised while filling it.
#[derive(Debug, Clone)]
pub struct TableOutput {
    pub dataset: Dataset,
    pub warnings: Vec<MissingParentData>,
}

/// How each value of a column is produced, decided once per table.
enum ColumnPlan<'a> {
    Parent(ParentColumn),
    BusinessDate,
    Synthesized(&'a ColumnType),
    Null,
}

/// Generate `rows` rows for `table`, sampling foreign keys from `registry`.
///
/// Foreign-key columns whose parent data is unavailable are filled with
/// nulls; one warning is returned per such column.
pub fn generate_table(
    table: &TableSpec,
    rows: u64,
    registry: &DataRegistry,
    ctx: &GenerationContext,
    provider: &mut dyn ValueProvider,
) -> TableOutput {
    let start = Instant::now();
    let mut warnings = Vec::new();
    let plans: Vec<(&str, ColumnPlan<'_>)> = table
        .columns
        .iter()
        .map(|column| {
            let plan = match &column.foreign_key {
                Some(foreign_key) => match registry.resolve(&table.name, foreign_key) {
                    Ok(parent) => ColumnPlan::Parent(parent),
                    Err(missing) => {
                        warn!(
                            table = %table.name,
                            column = %column.name,
                            target = %format!("{}.{}", missing.target_table, missing.target_column),
                            reason = ?missing.reason,
                            "parent data missing; emitting nulls"
                        );
                        warnings.push(missing);
                        ColumnPlan::Null
                    }
                },
                None if column.column_type == ColumnType::BusinessDate => ColumnPlan::BusinessDate,
                None if column.column_type.is_known() => {
                    ColumnPlan::Synthesized(&column.column_type)
                }
                None => ColumnPlan::Null,
            };
            (column.name.as_str(), plan)
        })
        .collect();

    let mut dataset = Dataset::new(
        table.name.clone(),
        table.columns.iter().map(|column| column.name.clone()).collect(),
    );
    dataset.rows.reserve(rows as usize);
    for _ in 0..rows {
        let mut row = Row::with_capacity(plans.len());
        for (name, plan) in &plans {
            let value = match plan {
                ColumnPlan::Parent(parent) => parent.sample(provider),
                ColumnPlan::BusinessDate => {
                    business_date(ctx.reference_year(), ctx.date_format, provider)
                }
                ColumnPlan::Synthesized(column_type) => synthesize(column_type, ctx, provider),
                ColumnPlan::Null => GeneratedValue::Null,
            };
            row.insert((*name).to_string(), value);
        }
        dataset.rows.push(row);
    }

    debug!(
        table = %table.name,
        rows = dataset.len(),
        warnings = warnings.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "table rows generated"
    );

    TableOutput { dataset, warnings }
}
