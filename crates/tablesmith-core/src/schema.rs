use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ColumnType;

/// Single-column reference from a child table into a parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Column of the owning table that holds the reference.
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Column metadata for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            foreign_key: None,
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}

/// A table parsed from one schema description. Immutable after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Path or identifier the description was read from.
    pub source: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyRef> {
        self.columns
            .iter()
            .filter_map(|column| column.foreign_key.as_ref())
    }

    /// Names of the tables this table references.
    pub fn referenced_tables(&self) -> BTreeSet<&str> {
        self.foreign_keys()
            .map(|fk| fk.target_table.as_str())
            .collect()
    }
}
