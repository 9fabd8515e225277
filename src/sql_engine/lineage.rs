//! Table-level lineage graph construction
//!
//! Turns a [`ParsedQuery`] into a [`LineageGraph`] whose edges read "feeds
//! data into": source tables and CTEs point at the CTEs that select from
//! them, and everything the outermost query selects from points at the
//! single output node.
use sqlparser::dialect::Dialect;
use tracing::debug;

use super::parsed_query::{parse_query, CteBody, FromEntry, ParsedQuery};
use crate::error::Result;
use crate::graph::model::OUTPUT_NODE_LABEL;
use crate::graph::{EdgeKind, LineageGraph, Node, NodeKind, OUTPUT_NODE_ID};

/// Builds a lineage graph from one parsed query
pub struct LineageGraphBuilder<'a> {
    parsed: &'a ParsedQuery,
    graph: LineageGraph,
}

impl<'a> LineageGraphBuilder<'a> {
    pub fn new(parsed: &'a ParsedQuery) -> Self {
        Self {
            parsed,
            graph: LineageGraph::new(),
        }
    }

    pub fn build(mut self) -> LineageGraph {
        self.add_source_tables();
        self.add_cte_edges();
        self.graph
            .add_node(Node::new(OUTPUT_NODE_ID, NodeKind::OutputSelect).with_label(OUTPUT_NODE_LABEL));
        self.add_output_edges();

        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "built lineage graph"
        );
        self.graph
    }

    /// One node per referenced table, keyed by its normalized unqualified name
    fn add_source_tables(&mut self) {
        for table in &self.parsed.tables {
            let key = table.key();
            if key.is_empty() {
                continue;
            }
            self.graph
                .add_node(Node::new(node_id(&key), NodeKind::SourceTable).with_label(table.name()));
        }
    }

    fn add_cte_edges(&mut self) {
        for cte in &self.parsed.ctes {
            let from = match &cte.body {
                CteBody::Select { from } => from,
                CteBody::Unsupported { shape } => {
                    debug!(cte = %cte.name, shape = %shape, "skipping CTE with non-SELECT body");
                    continue;
                }
            };

            let cte_id = node_id(&cte.key());
            // A table-list node with this name is really this CTE
            self.graph.promote_to_cte(&cte_id, &cte.name);

            for source in resolvable_tables(from, &cte.name) {
                if !self.graph.contains_node(&cte_id) {
                    self.graph
                        .add_node(Node::new(cte_id.as_str(), NodeKind::Cte).with_label(cte.name.as_str()));
                }
                self.graph.add_edge(&source, &cte_id, EdgeKind::CteDerived);
            }
        }
    }

    fn add_output_edges(&mut self) {
        for source in resolvable_tables(&self.parsed.from, "output") {
            self.graph.add_edge(&source, OUTPUT_NODE_ID, EdgeKind::Plain);
        }
    }
}

/// Node id for a table or CTE key.
///
/// Keys starting with the reserved output id get a trailing `'`. The mapping
/// stays one-to-one and never yields the output id itself.
pub fn node_id(key: &str) -> String {
    if key.starts_with(OUTPUT_NODE_ID) {
        format!("{}'", key)
    } else {
        key.to_string()
    }
}

/// Node ids of the entries that name a table; the rest are skipped
fn resolvable_tables(from: &[FromEntry], context: &str) -> Vec<String> {
    let skipped = from.iter().filter(|entry| entry.table.is_none()).count();
    if skipped > 0 {
        debug!(context, skipped, "skipping FROM entries without a table name");
    }

    from.iter()
        .filter_map(FromEntry::key)
        .map(|key| node_id(&key))
        .collect()
}

/// Build the lineage graph for an already parsed query
pub fn build_lineage_graph(parsed: &ParsedQuery) -> LineageGraph {
    LineageGraphBuilder::new(parsed).build()
}

/// Parse `sql` and build its lineage graph. Nothing is built on a parse error.
pub fn lineage_from_sql(sql: &str, dialect: &dyn Dialect) -> Result<LineageGraph> {
    let parsed = parse_query(sql, dialect)?;
    Ok(build_lineage_graph(&parsed))
}
