//! SQL Engine module for turning query text into lineage graphs

pub mod extractors;
pub mod lineage;
pub mod parsed_query;

pub use lineage::{build_lineage_graph, lineage_from_sql, LineageGraphBuilder};
pub use parsed_query::{
    dialect_by_name, parse_query, CteBody, CteDefinition, FromEntry, ParsedQuery, TableRef,
};

#[cfg(test)]
mod tests;
