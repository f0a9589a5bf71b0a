//! Schema description parsing.
//!
//! A description is a JSON document in one of two shapes:
//!
//! - structured: `{"table_name": ..., "columns": {...}, "foreign_keys": [...]}`
//! - flat: every top-level key is a column (`table_name` and `foreign_keys`
//!   stay reserved).
//!
//! A column is either a bare type tag (`"int"`) or a descriptor
//! `{"type": "int", "foreign_key": {"target_table": ..., "fk_name": ...}}`.
//! Both forms, and the top-level `foreign_keys` list, normalize into the same
//! [`ForeignKeyRef`] shape.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::{ColumnSpec, ForeignKeyRef, TableSpec};
use crate::types::ColumnType;

const TABLE_NAME_KEY: &str = "table_name";
const COLUMNS_KEY: &str = "columns";
const FOREIGN_KEYS_KEY: &str = "foreign_keys";
const BUSINESS_DATE_COLUMN: &str = "business_date";

#[derive(Debug, Deserialize)]
struct ColumnForeignKey {
    target_table: Option<String>,
    fk_name: Option<String>,
    target_col_nm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableForeignKey {
    target_table: Option<String>,
    local_col_nm: Option<String>,
    target_col_nm: Option<String>,
    fk_name: Option<String>,
}

/// Read and parse a schema description file.
pub fn parse_file(path: &Path) -> Result<TableSpec, SchemaError> {
    let origin = path.display().to_string();
    let contents = std::fs::read_to_string(path)
        .map_err(|err| SchemaError::new(&origin, format!("cannot read schema file: {err}")))?;
    parse_str(&contents, &origin)
}

/// Parse a schema description from JSON text.
pub fn parse_str(contents: &str, origin: &str) -> Result<TableSpec, SchemaError> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|err| SchemaError::new(origin, format!("invalid JSON: {err}")))?;
    parse_value(&value, origin)
}

/// Parse an already decoded schema description.
pub fn parse_value(value: &Value, origin: &str) -> Result<TableSpec, SchemaError> {
    let Value::Object(document) = value else {
        return Err(SchemaError::new(
            origin,
            "schema description must be a JSON object",
        ));
    };

    let name = table_name(document, origin)?;

    let mut columns = Vec::new();
    for (column_name, descriptor) in column_entries(document, origin)? {
        if columns
            .iter()
            .any(|column: &ColumnSpec| column.name == *column_name)
        {
            return Err(SchemaError::for_column(
                origin,
                column_name,
                "duplicate column name",
            ));
        }
        columns.push(parse_column(column_name, descriptor, origin)?);
    }

    if columns.is_empty() {
        return Err(SchemaError::new(origin, "schema declares no columns"));
    }

    if let Some(foreign_keys) = document.get(FOREIGN_KEYS_KEY) {
        apply_table_foreign_keys(&mut columns, foreign_keys, origin)?;
    }

    Ok(TableSpec {
        name,
        source: origin.to_string(),
        columns,
    })
}

fn table_name(document: &Map<String, Value>, origin: &str) -> Result<String, SchemaError> {
    match document.get(TABLE_NAME_KEY) {
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.trim().to_string()),
        Some(Value::String(_)) => Err(SchemaError::new(origin, "table_name must not be empty")),
        Some(_) => Err(SchemaError::new(origin, "table_name must be a string")),
        None => {
            let stem = Path::new(origin)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty())
                .unwrap_or(origin);
            Ok(stem.to_string())
        }
    }
}

fn column_entries<'a>(
    document: &'a Map<String, Value>,
    origin: &str,
) -> Result<Vec<(&'a String, &'a Value)>, SchemaError> {
    match document.get(COLUMNS_KEY) {
        Some(Value::Object(columns)) => Ok(columns.iter().collect()),
        // A flat description may legitimately have a column called `columns`.
        None | Some(Value::String(_)) => Ok(document
            .iter()
            .filter(|(key, _)| key.as_str() != TABLE_NAME_KEY && key.as_str() != FOREIGN_KEYS_KEY)
            .collect()),
        Some(_) => Err(SchemaError::new(origin, "columns must be an object")),
    }
}

fn parse_column(name: &str, descriptor: &Value, origin: &str) -> Result<ColumnSpec, SchemaError> {
    let (tag, foreign_key) = match descriptor {
        Value::String(tag) => (tag.as_str(), None),
        Value::Object(fields) => {
            let tag = fields.get("type").and_then(Value::as_str).ok_or_else(|| {
                SchemaError::for_column(origin, name, "column descriptor requires a string `type`")
            })?;
            let foreign_key = match fields.get("foreign_key") {
                None | Some(Value::Null) => None,
                Some(raw) => Some(parse_column_foreign_key(name, raw, origin)?),
            };
            (tag, foreign_key)
        }
        _ => {
            return Err(SchemaError::for_column(
                origin,
                name,
                "column must be a type tag string or a descriptor object",
            ));
        }
    };

    let column_type = if name == BUSINESS_DATE_COLUMN {
        ColumnType::BusinessDate
    } else {
        ColumnType::from_tag(tag)
            .map_err(|err| SchemaError::for_column(origin, name, err.to_string()))?
    };

    Ok(ColumnSpec {
        name: name.to_string(),
        column_type,
        foreign_key,
    })
}

fn parse_column_foreign_key(
    column: &str,
    raw: &Value,
    origin: &str,
) -> Result<ForeignKeyRef, SchemaError> {
    let fk: ColumnForeignKey = serde_json::from_value(raw.clone()).map_err(|err| {
        SchemaError::for_column(origin, column, format!("invalid foreign_key: {err}"))
    })?;
    let target_table = required(fk.target_table, column, "foreign_key.target_table", origin)?;
    let target_column = required(
        fk.fk_name.or(fk.target_col_nm),
        column,
        "foreign_key.fk_name or foreign_key.target_col_nm",
        origin,
    )?;

    Ok(ForeignKeyRef {
        column: column.to_string(),
        target_table,
        target_column,
    })
}

fn apply_table_foreign_keys(
    columns: &mut [ColumnSpec],
    raw: &Value,
    origin: &str,
) -> Result<(), SchemaError> {
    let Value::Array(entries) = raw else {
        return Err(SchemaError::new(origin, "foreign_keys must be an array"));
    };

    for (index, entry) in entries.iter().enumerate() {
        let fk: TableForeignKey = serde_json::from_value(entry.clone()).map_err(|err| {
            SchemaError::new(origin, format!("invalid foreign_keys[{index}]: {err}"))
        })?;
        let local = fk.local_col_nm.filter(|value| !value.is_empty()).ok_or_else(|| {
            SchemaError::new(
                origin,
                format!("foreign_keys[{index}] requires local_col_nm"),
            )
        })?;
        let target_table = required(fk.target_table, &local, "target_table", origin)?;
        let target_column = required(
            fk.target_col_nm.or(fk.fk_name),
            &local,
            "target_col_nm",
            origin,
        )?;
        let reference = ForeignKeyRef {
            column: local.clone(),
            target_table,
            target_column,
        };

        let column = columns
            .iter_mut()
            .find(|column| column.name == local)
            .ok_or_else(|| {
                SchemaError::for_column(
                    origin,
                    &local,
                    "foreign key refers to a column the table does not declare",
                )
            })?;

        match &column.foreign_key {
            Some(existing) if *existing == reference => {}
            Some(existing) => {
                return Err(SchemaError::for_column(
                    origin,
                    &local,
                    format!(
                        "conflicting foreign keys: {}.{} and {}.{}",
                        existing.target_table,
                        existing.target_column,
                        reference.target_table,
                        reference.target_column
                    ),
                ));
            }
            None => column.foreign_key = Some(reference),
        }
    }

    Ok(())
}

fn required(
    value: Option<String>,
    column: &str,
    field: &str,
    origin: &str,
) -> Result<String, SchemaError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SchemaError::for_column(origin, column, format!("missing {field}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_structured_description() {
        let value = json!({
            "table_name": "dim_store",
            "columns": {"store_id": "int", "name": "string", "revenue": "decimal(10,2)"}
        });
        let table = parse_value(&value, "schemas/dim_store.json").expect("parse");
        assert_eq!(table.name, "dim_store");
        assert_eq!(table.column_names(), vec!["store_id", "name", "revenue"]);
        assert_eq!(
            table.column("revenue").map(|c| &c.column_type),
            Some(&ColumnType::Decimal {
                precision: 10,
                scale: 2
            })
        );
        assert_eq!(table.foreign_keys().count(), 0);
    }

    #[test]
    fn derives_table_name_from_origin() {
        let value = json!({"columns": {"id": "int"}});
        let table = parse_value(&value, "schemas/dim_product.json").expect("parse");
        assert_eq!(table.name, "dim_product");
    }

    #[test]
    fn parses_flat_description_in_declaration_order() {
        let value = json!({"sale_id": "int", "amount": "double", "business_date": "string"});
        let table = parse_value(&value, "fact_sales.json").expect("parse");
        assert_eq!(table.name, "fact_sales");
        assert_eq!(table.column_names(), vec!["sale_id", "amount", "business_date"]);
        assert_eq!(
            table.column("business_date").map(|c| &c.column_type),
            Some(&ColumnType::BusinessDate)
        );
    }

    #[test]
    fn normalizes_both_foreign_key_styles() {
        let per_column = json!({
            "table_name": "fact_sales",
            "columns": {
                "sale_id": "int",
                "store_id": {"type": "int", "foreign_key": {"target_table": "dim_store", "fk_name": "store_id"}}
            }
        });
        let top_level = json!({
            "table_name": "fact_sales",
            "columns": {"sale_id": "int", "store_id": "int"},
            "foreign_keys": [{"target_table": "dim_store", "local_col_nm": "store_id", "target_col_nm": "store_id"}]
        });

        let a = parse_value(&per_column, "a.json").expect("parse per column");
        let b = parse_value(&top_level, "b.json").expect("parse top level");
        let expected = ForeignKeyRef {
            column: "store_id".to_string(),
            target_table: "dim_store".to_string(),
            target_column: "store_id".to_string(),
        };
        assert_eq!(a.foreign_keys().collect::<Vec<_>>(), vec![&expected]);
        assert_eq!(b.foreign_keys().collect::<Vec<_>>(), vec![&expected]);
    }

    #[test]
    fn accepts_target_col_nm_in_column_descriptor() {
        let value = json!({
            "columns": {
                "store_ref": {"type": "int", "foreign_key": {"target_table": "dim_store", "target_col_nm": "store_id"}}
            }
        });
        let table = parse_value(&value, "t.json").expect("parse");
        let fk = table.foreign_keys().next().expect("fk");
        assert_eq!(fk.target_column, "store_id");
    }

    #[test]
    fn rejects_foreign_key_without_target_column() {
        let value = json!({
            "columns": {"store_id": {"type": "int", "foreign_key": {"target_table": "dim_store"}}}
        });
        let err = parse_value(&value, "t.json").expect_err("missing target column");
        assert_eq!(err.column.as_deref(), Some("store_id"));
    }

    #[test]
    fn rejects_top_level_foreign_key_on_unknown_column() {
        let value = json!({
            "columns": {"id": "int"},
            "foreign_keys": [{"target_table": "dim_store", "local_col_nm": "store_id", "target_col_nm": "store_id"}]
        });
        let err = parse_value(&value, "t.json").expect_err("unknown local column");
        assert_eq!(err.column.as_deref(), Some("store_id"));
    }

    #[test]
    fn rejects_conflicting_foreign_keys() {
        let value = json!({
            "columns": {
                "store_id": {"type": "int", "foreign_key": {"target_table": "dim_store", "fk_name": "store_id"}}
            },
            "foreign_keys": [{"target_table": "dim_shop", "local_col_nm": "store_id", "target_col_nm": "id"}]
        });
        assert!(parse_value(&value, "t.json").is_err());
    }

    #[test]
    fn rejects_invalid_decimal_with_column_context() {
        let value = json!({"columns": {"price": "decimal(2,5)"}});
        let err = parse_value(&value, "t.json").expect_err("bad decimal");
        assert_eq!(err.column.as_deref(), Some("price"));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_value(&json!([1, 2]), "t.json").is_err());
        assert!(parse_value(&json!({"columns": [1]}), "t.json").is_err());
        assert!(parse_value(&json!({"columns": {}}), "t.json").is_err());
        assert!(parse_value(&json!({"columns": {"id": 5}}), "t.json").is_err());
        assert!(parse_value(&json!({"columns": {"id": {"foreign_key": {}}}}), "t.json").is_err());
        assert!(parse_str("{not json", "t.json").is_err());
    }

    #[test]
    fn keeps_unknown_type_tags() {
        let value = json!({"columns": {"id": "int", "blob": "binary"}});
        let table = parse_value(&value, "t.json").expect("parse");
        assert!(!table.column("blob").expect("blob").column_type.is_known());
    }
}
