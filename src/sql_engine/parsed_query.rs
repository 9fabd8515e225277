//! A fixed view over the parts of a parsed query that lineage needs
//!
//! Only three shapes are modeled: the ordered CTE list, the outermost FROM
//! list, and the flat list of referenced tables. Anything else in the AST is
//! ignored on purpose.
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Query, Statement};
use sqlparser::dialect::{dialect_from_str, Dialect};
use sqlparser::parser::Parser;
use tracing::debug;

use super::extractors;
use crate::error::{LineageError, Result};

/// Lookup key of an identifier: unquoted names fold to lower case, quoted
/// names are kept exactly as written
pub fn normalize_ident(value: &str, quoted: bool) -> String {
    if quoted {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

/// A possibly qualified table reference, e.g. `catalog.schema.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Segments as written
    pub parts: Vec<String>,
    /// Whether the final segment was quoted
    #[serde(default)]
    pub quoted: bool,
}

impl TableRef {
    pub fn new(qualified: &str) -> Self {
        Self {
            parts: qualified.split('.').map(str::to_string).collect(),
            quoted: false,
        }
    }

    /// The final, unqualified segment as written
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// The final segment, normalized for matching against CTE names
    pub fn key(&self) -> String {
        normalize_ident(self.name(), self.quoted)
    }

    pub fn qualified_name(&self) -> String {
        self.parts.join(".")
    }
}

/// One relation listed in a FROM clause or a JOIN
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FromEntry {
    /// `None` for derived tables, table functions and other non-table relations
    pub table: Option<String>,
    #[serde(default)]
    pub quoted: bool,
}

impl FromEntry {
    pub fn table(name: &str) -> Self {
        Self {
            table: Some(name.to_string()),
            quoted: false,
        }
    }

    pub fn quoted_table(name: &str) -> Self {
        Self {
            table: Some(name.to_string()),
            quoted: true,
        }
    }

    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<String> {
        self.table
            .as_deref()
            .map(|name| normalize_ident(name, self.quoted))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CteBody {
    Select { from: Vec<FromEntry> },
    /// UNION, VALUES, DML and anything else that is not a plain SELECT
    Unsupported { shape: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CteDefinition {
    /// Name as declared
    pub name: String,
    #[serde(default)]
    pub quoted: bool,
    pub body: CteBody,
}

impl CteDefinition {
    pub fn new(name: &str, body: CteBody) -> Self {
        Self {
            name: name.to_string(),
            quoted: false,
            body,
        }
    }

    pub fn key(&self) -> String {
        normalize_ident(&self.name, self.quoted)
    }
}

/// The parts of a query that lineage is built from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// CTE definitions in declaration order
    #[serde(default)]
    pub ctes: Vec<CteDefinition>,
    /// FROM entries of the outermost query
    #[serde(default)]
    pub from: Vec<FromEntry>,
    /// Every table referenced anywhere in the statement
    #[serde(default)]
    pub tables: Vec<TableRef>,
}

impl ParsedQuery {
    pub fn from_query(statement: &Statement, query: &Query) -> Self {
        let ctes = query
            .with
            .iter()
            .flat_map(|with| &with.cte_tables)
            .map(|cte| CteDefinition {
                name: cte.alias.name.value.clone(),
                quoted: cte.alias.name.quote_style.is_some(),
                body: match extractors::select_from(&cte.query) {
                    Some(from) => CteBody::Select {
                        from: extractors::get_from_entries(from),
                    },
                    None => CteBody::Unsupported {
                        shape: extractors::set_expr_shape(&cte.query.body).to_string(),
                    },
                },
            })
            .collect();

        let from = extractors::select_from(query)
            .map(extractors::get_from_entries)
            .unwrap_or_default();

        Self {
            ctes,
            from,
            tables: extractors::get_table_refs(statement),
        }
    }
}

/// Parse query text with the given dialect.
///
/// Only the first statement is modeled and it has to be a query.
pub fn parse_query(sql: &str, dialect: &dyn Dialect) -> Result<ParsedQuery> {
    if sql.trim().is_empty() {
        return Err(LineageError::Parse("query text is empty".to_string()));
    }

    let statements = Parser::parse_sql(dialect, sql)?;
    let statement_count = statements.len();
    let statement = statements
        .into_iter()
        .next()
        .ok_or_else(|| LineageError::Parse("no SQL statement found".to_string()))?;

    if statement_count > 1 {
        debug!(
            ignored = statement_count - 1,
            "only the first statement is used for lineage"
        );
    }

    match &statement {
        Statement::Query(query) => Ok(ParsedQuery::from_query(&statement, query)),
        other => {
            let rendered = other.to_string();
            let keyword = rendered.split_whitespace().next().unwrap_or("unknown");
            Err(LineageError::Parse(format!(
                "expected a query statement, found {}",
                keyword.to_uppercase()
            )))
        }
    }
}

/// Look up a sqlparser dialect by name (`duckdb`, `postgres`, `bigquery`, ...)
pub fn dialect_by_name(name: &str) -> Result<Box<dyn Dialect>> {
    dialect_from_str(name)
        .ok_or_else(|| LineageError::Config(format!("unknown SQL dialect '{}'", name)))
}
