use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tablesmith_core::ForeignKeyRef;

use crate::errors::{MissingParentData, MissingParentReason};
use crate::faker::ValueProvider;
use crate::generators::GeneratedValue;

static NULL: GeneratedValue = GeneratedValue::Null;

/// One generated row, keyed by column name.
pub type Row = HashMap<String, GeneratedValue>;

/// Rows generated for one table, with the column order of its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Values of one column in row order; missing cells read as null.
    pub fn column_values<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a GeneratedValue> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&NULL))
    }
}

/// Non-null values of a parent column, ready to be sampled.
#[derive(Debug, Clone)]
pub struct ParentColumn {
    dataset: Arc<Dataset>,
    column: String,
    indices: Vec<usize>,
}

impl ParentColumn {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Uniformly pick one of the parent values.
    pub fn sample(&self, provider: &mut dyn ValueProvider) -> GeneratedValue {
        if self.indices.is_empty() {
            return GeneratedValue::Null;
        }
        let index = self.indices[provider.pick_index(self.indices.len())];
        self.dataset.rows[index]
            .get(&self.column)
            .cloned()
            .unwrap_or(GeneratedValue::Null)
    }
}

/// Datasets produced so far in a run, keyed by table name.
///
/// Entries are shared so callers can keep reading parents while children
/// are being generated.
#[derive(Debug, Default, Clone)]
pub struct DataRegistry {
    tables: BTreeMap<String, Arc<Dataset>>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a dataset, replacing any earlier one for the same table.
    pub fn put(&mut self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        self.tables
            .insert(dataset.table.clone(), Arc::clone(&dataset));
        dataset
    }

    pub fn get(&self, table: &str) -> Option<&Arc<Dataset>> {
        self.tables.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Arc<Dataset>> {
        self.tables
    }

    /// Look up the parent column a foreign key points at.
    pub fn resolve(
        &self,
        table: &str,
        foreign_key: &ForeignKeyRef,
    ) -> Result<ParentColumn, MissingParentData> {
        let missing = |reason| MissingParentData {
            table: table.to_string(),
            column: foreign_key.column.clone(),
            target_table: foreign_key.target_table.clone(),
            target_column: foreign_key.target_column.clone(),
            reason,
        };

        let dataset = self
            .tables
            .get(&foreign_key.target_table)
            .ok_or_else(|| missing(MissingParentReason::TableNotGenerated))?;
        if !dataset.has_column(&foreign_key.target_column) {
            return Err(missing(MissingParentReason::ColumnNotFound));
        }

        let indices: Vec<usize> = dataset
            .column_values(&foreign_key.target_column)
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, _)| index)
            .collect();
        if indices.is_empty() {
            return Err(missing(MissingParentReason::NoValues));
        }

        Ok(ParentColumn {
            dataset: Arc::clone(dataset),
            column: foreign_key.target_column.clone(),
            indices,
        })
    }

    /// Pick one non-null value from `table.column`.
    pub fn sample(
        &self,
        table: &str,
        column: &str,
        provider: &mut dyn ValueProvider,
    ) -> Result<GeneratedValue, MissingParentData> {
        let reference = ForeignKeyRef {
            column: column.to_string(),
            target_table: table.to_string(),
            target_column: column.to_string(),
        };
        let parent = self.resolve(table, &reference)?;
        Ok(parent.sample(provider))
    }
}
