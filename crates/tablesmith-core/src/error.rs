use thiserror::Error;

/// A schema description could not be located, decoded, or normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema error in '{origin}'{}: {message}", column_suffix(.column))]
pub struct SchemaError {
    /// Path or identifier of the offending schema description.
    pub origin: String,
    /// Column the error refers to, when there is one.
    pub column: Option<String>,
    pub message: String,
}

impl SchemaError {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            column: None,
            message: message.into(),
        }
    }

    pub fn for_column(
        origin: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            column: Some(column.into()),
            message: message.into(),
        }
    }
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(column) => format!(" (column '{column}')"),
        None => String::new(),
    }
}

/// Foreign keys form a cycle, so no generation order exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("foreign key cycle detected: {}", .cycle.join(" -> "))]
pub struct DependencyCycleError {
    /// One concrete cycle, first table repeated at the end.
    pub cycle: Vec<String>,
    /// Every table that could not be placed in the order.
    pub unplaced: Vec<String>,
}

/// Core error type shared across tablesmith crates.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    DependencyCycle(#[from] DependencyCycleError),
}

/// Convenience alias for results returned by tablesmith-core.
pub type Result<T> = std::result::Result<T, Error>;
