use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DependencyCycleError;
use crate::schema::{ForeignKeyRef, TableSpec};

/// Table placed in the generation order.
#[derive(Debug, Clone)]
pub struct OrderedTable {
    pub spec: TableSpec,
    /// Dependency depth: 0 for tables without resolvable foreign keys,
    /// otherwise one more than the deepest referenced table.
    pub level: usize,
}

/// Why a foreign key cannot be satisfied by any table in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    MissingTable,
    MissingColumn,
}

/// Foreign key whose target is not part of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedForeignKey {
    pub table: String,
    pub foreign_key: ForeignKeyRef,
    pub reason: UnresolvedReason,
}

/// Dependency-respecting order for a set of tables.
#[derive(Debug, Clone)]
pub struct GenerationOrder {
    pub tables: Vec<OrderedTable>,
    pub unresolved: Vec<UnresolvedForeignKey>,
}

impl GenerationOrder {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|table| table.spec.name.as_str())
            .collect()
    }

    /// Tables grouped by dependency level; tables inside one level do not
    /// reference each other.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let depth = self.tables.iter().map(|t| t.level + 1).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); depth];
        for table in &self.tables {
            levels[table.level].push(table.spec.name.as_str());
        }
        levels
    }
}

/// Order tables so every foreign-key target precedes the tables that
/// reference it.
///
/// Ties are broken by input position, so the result is deterministic and
/// independent of table names. Table names are expected to be unique; a
/// reference to a duplicated name resolves to its first occurrence.
pub fn order_tables(tables: Vec<TableSpec>) -> Result<GenerationOrder, DependencyCycleError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (position, table) in tables.iter().enumerate() {
        index.entry(table.name.as_str()).or_insert(position);
    }

    let mut parents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
    let mut children: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
    let mut unresolved = Vec::new();

    for (position, table) in tables.iter().enumerate() {
        for fk in table.foreign_keys() {
            match index.get(fk.target_table.as_str()) {
                Some(&target) => {
                    if !tables[target].has_column(&fk.target_column) {
                        unresolved.push(UnresolvedForeignKey {
                            table: table.name.clone(),
                            foreign_key: fk.clone(),
                            reason: UnresolvedReason::MissingColumn,
                        });
                    }
                    // Still an ordering edge: the parent exists even if the
                    // referenced column does not.
                    parents[position].insert(target);
                    children[target].insert(position);
                }
                None => unresolved.push(UnresolvedForeignKey {
                    table: table.name.clone(),
                    foreign_key: fk.clone(),
                    reason: UnresolvedReason::MissingTable,
                }),
            }
        }
    }

    let mut indegree: Vec<usize> = parents.iter().map(BTreeSet::len).collect();
    let mut levels = vec![0_usize; tables.len()];
    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(position, count)| (*count == 0).then_some(position))
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while let Some(position) = ready.pop_first() {
        order.push(position);
        for &child in &children[position] {
            levels[child] = levels[child].max(levels[position] + 1);
            indegree[child] = indegree[child].saturating_sub(1);
            if indegree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() != tables.len() {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let remaining: BTreeSet<usize> = (0..tables.len())
            .filter(|position| !placed.contains(position))
            .collect();
        let cycle = find_cycle(&parents, &remaining)
            .into_iter()
            .map(|position| tables[position].name.clone())
            .collect();
        let unplaced = remaining
            .iter()
            .map(|&position| tables[position].name.clone())
            .collect();
        return Err(DependencyCycleError { cycle, unplaced });
    }

    let mut slots: Vec<Option<TableSpec>> = tables.into_iter().map(Some).collect();
    let tables = order
        .into_iter()
        .filter_map(|position| {
            slots[position].take().map(|spec| OrderedTable {
                spec,
                level: levels[position],
            })
        })
        .collect();

    Ok(GenerationOrder { tables, unresolved })
}

/// Walk parent edges inside the unplaced set until a table repeats.
///
/// Every unplaced table still waits on at least one unplaced parent, so the
/// walk always closes a loop.
fn find_cycle(parents: &[BTreeSet<usize>], remaining: &BTreeSet<usize>) -> Vec<usize> {
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };

    let mut path = Vec::new();
    let mut seen: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    loop {
        if let Some(&at) = seen.get(&current) {
            let mut cycle = path[at..].to_vec();
            cycle.push(current);
            return cycle;
        }
        seen.insert(current, path.len());
        path.push(current);

        match parents[current]
            .iter()
            .find(|parent| remaining.contains(*parent))
        {
            Some(&parent) => current = parent,
            None => return path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::types::ColumnType;

    fn table(name: &str, fks: &[(&str, &str, &str)]) -> TableSpec {
        let mut columns = vec![ColumnSpec::new("id", ColumnType::Integer)];
        for (column, target_table, target_column) in fks {
            columns.push(ColumnSpec {
                name: column.to_string(),
                column_type: ColumnType::Integer,
                foreign_key: Some(ForeignKeyRef {
                    column: column.to_string(),
                    target_table: target_table.to_string(),
                    target_column: target_column.to_string(),
                }),
            });
        }
        TableSpec {
            name: name.to_string(),
            source: format!("{name}.json"),
            columns,
        }
    }

    fn position(order: &GenerationOrder, name: &str) -> usize {
        order
            .table_names()
            .iter()
            .position(|item| *item == name)
            .unwrap()
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let order = order_tables(vec![
            table("orders", &[("user_id", "users", "id"), ("item_id", "items", "id")]),
            table("users", &[]),
            table("items", &[("vendor_id", "vendors", "id")]),
            table("vendors", &[]),
        ])
        .expect("acyclic");

        assert!(position(&order, "users") < position(&order, "orders"));
        assert!(position(&order, "items") < position(&order, "orders"));
        assert!(position(&order, "vendors") < position(&order, "items"));
        assert!(order.unresolved.is_empty());
    }

    #[test]
    fn breaks_ties_by_input_position_not_name() {
        // Names deliberately invert the usual dim/fact convention.
        let order = order_tables(vec![
            table("fact_zeta", &[]),
            table("dim_alpha", &[("zeta_id", "fact_zeta", "id")]),
            table("fact_beta", &[]),
        ])
        .expect("acyclic");

        assert_eq!(order.table_names(), vec!["fact_zeta", "dim_alpha", "fact_beta"]);
    }

    #[test]
    fn assigns_dependency_levels() {
        let order = order_tables(vec![
            table("c", &[("b_id", "b", "id")]),
            table("b", &[("a_id", "a", "id")]),
            table("a", &[]),
            table("d", &[]),
        ])
        .expect("acyclic");

        assert_eq!(order.levels(), vec![vec!["a", "d"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn reports_mutual_reference_as_cycle() {
        let err = order_tables(vec![
            table("a", &[("b_id", "b", "id")]),
            table("b", &[("a_id", "a", "id")]),
        ])
        .expect_err("cycle");

        assert_eq!(err.cycle.first(), err.cycle.last());
        assert!(err.cycle.contains(&"a".to_string()));
        assert!(err.cycle.contains(&"b".to_string()));
        assert_eq!(err.unplaced, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reports_self_reference_as_cycle() {
        let err = order_tables(vec![table("users", &[("manager_id", "users", "id")])])
            .expect_err("self cycle");
        assert_eq!(err.cycle, vec!["users".to_string(), "users".to_string()]);
    }

    #[test]
    fn transitive_cycle_lists_dependents_as_unplaced() {
        let err = order_tables(vec![
            table("a", &[("c_id", "c", "id")]),
            table("b", &[("a_id", "a", "id")]),
            table("c", &[("b_id", "b", "id")]),
            table("d", &[("a_id", "a", "id")]),
            table("e", &[]),
        ])
        .expect_err("cycle");

        assert_eq!(err.cycle.len(), 4);
        assert!(!err.cycle.contains(&"d".to_string()));
        assert!(err.unplaced.contains(&"d".to_string()));
        assert!(!err.unplaced.contains(&"e".to_string()));
    }

    #[test]
    fn marks_missing_targets_as_unresolved() {
        let order = order_tables(vec![
            table("sales", &[("store_id", "stores", "id"), ("user_id", "users", "uid")]),
            table("users", &[]),
        ])
        .expect("missing targets are not fatal");

        assert_eq!(order.table_names(), vec!["users", "sales"]);
        let reasons: Vec<_> = order
            .unresolved
            .iter()
            .map(|item| (item.foreign_key.column.as_str(), item.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("store_id", UnresolvedReason::MissingTable),
                ("user_id", UnresolvedReason::MissingColumn)
            ]
        );
    }
}
