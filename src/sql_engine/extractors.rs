//! Table and FROM-entry extraction from sqlparser ASTs

use std::ops::ControlFlow;

use sqlparser::ast::{
    ObjectName, Query, SetExpr, Statement, TableFactor, TableWithJoins, Visit, Visitor,
};

use super::parsed_query::{FromEntry, TableRef};

/// Collect every table referenced anywhere in a statement, in visiting order.
///
/// This includes tables inside CTE bodies, joins and subqueries in
/// expressions, as well as references to CTE names. Table-valued function
/// calls such as `generate_series(1, 3)` are not tables and are skipped.
/// Each qualified name appears once.
pub fn get_table_refs(statement: &Statement) -> Vec<TableRef> {
    let mut collector = TableCollector::default();
    let _ = statement.visit(&mut collector);
    collector.tables
}

#[derive(Default)]
struct TableCollector {
    tables: Vec<TableRef>,
}

impl Visitor for TableCollector {
    type Break = ();

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table {
            name, args: None, ..
        } = table_factor
        {
            let table = table_ref(name);
            if !table.parts.is_empty() && !self.tables.contains(&table) {
                self.tables.push(table);
            }
        }
        ControlFlow::Continue(())
    }
}

fn table_ref(name: &ObjectName) -> TableRef {
    TableRef {
        parts: name.0.iter().map(|ident| ident.value.clone()).collect(),
        quoted: name.0.last().is_some_and(|ident| ident.quote_style.is_some()),
    }
}

/// Unwrap parenthesized queries down to a `SELECT`, if there is one
pub fn select_from(query: &Query) -> Option<&[TableWithJoins]> {
    match &*query.body {
        SetExpr::Select(select) => Some(&select.from),
        SetExpr::Query(inner) if inner.with.is_none() => select_from(inner),
        _ => None,
    }
}

/// Short name of a query body shape, used when a body is skipped
pub fn set_expr_shape(expr: &SetExpr) -> &'static str {
    match expr {
        SetExpr::Select(_) => "select",
        SetExpr::Query(_) => "nested query",
        SetExpr::SetOperation { .. } => "set operation",
        SetExpr::Values(_) => "values",
        SetExpr::Insert(_) => "insert",
        SetExpr::Update(_) => "update",
        SetExpr::Table(_) => "table",
        _ => "other",
    }
}

/// One entry per FROM relation and per JOIN relation, in source order
pub fn get_from_entries(from: &[TableWithJoins]) -> Vec<FromEntry> {
    let mut entries = Vec::new();

    for table_with_joins in from {
        entries.push(from_entry(&table_with_joins.relation));
        for join in &table_with_joins.joins {
            entries.push(from_entry(&join.relation));
        }
    }

    entries
}

/// A relation only resolves to a table name when it is a plain table
fn from_entry(relation: &TableFactor) -> FromEntry {
    match relation {
        TableFactor::Table {
            name, args: None, ..
        } => match name.0.last() {
            Some(ident) => FromEntry {
                table: Some(ident.value.clone()),
                quoted: ident.quote_style.is_some(),
            },
            None => FromEntry::unresolved(),
        },
        // Derived tables, table functions, UNNEST and nested joins
        _ => FromEntry::unresolved(),
    }
}
