//! Nodes, edges and the lineage graph container
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved id of the node that stands for the final query result
pub const OUTPUT_NODE_ID: &str = "__query_result__";

/// Label shown for the output node
pub const OUTPUT_NODE_LABEL: &str = "SELECT result";

/// What a node represents in the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    SourceTable,
    Cte,
    OutputSelect,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::SourceTable => write!(f, "table"),
            NodeKind::Cte => write!(f, "cte"),
            NodeKind::OutputSelect => write!(f, "output"),
        }
    }
}

/// Routing hint for the renderer, has no effect on layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Plain,
    CteDerived,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    /// Set by the layout engine
    pub rank: Option<usize>,
    /// Set by the layout engine
    pub order_index: Option<usize>,
    /// Set by the layout engine
    pub position: Option<Position>,
}

impl Node {
    /// Create an un-positioned node whose label is its id
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            rank: None,
            order_index: None,
            position: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_positioned(&self) -> bool {
        self.rank.is_some() && self.order_index.is_some() && self.position.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: edge_id(&source, &target),
            source,
            target,
            kind,
        }
    }
}

/// Deterministic edge id for an ordered `(source, target)` pair
pub fn edge_id(source: &str, target: &str) -> String {
    format!("{}->{}", source, target)
}

/// Nodes and edges of a query's lineage, kept in discovery order.
///
/// Node ids are unique. Edge ids are derived from the ordered endpoint pair,
/// so adding the same pair twice replaces the first edge in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphParts")]
pub struct LineageGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    edge_index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl From<GraphParts> for LineageGraph {
    fn from(parts: GraphParts) -> Self {
        let mut graph = Self {
            nodes: parts.nodes,
            edges: parts.edges,
            ..Self::default()
        };
        graph.reindex();
        graph
    }
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same id already exists.
    ///
    /// Returns `true` when the node was inserted.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Add or replace the edge for `(source, target)`.
    ///
    /// Endpoints are not checked here; the layout engine reports dangling
    /// edges as `MissingReference`.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) {
        let edge = Edge::new(source, target, kind);
        match self.edge_index.get(&edge.id) {
            Some(&slot) => self.edges[slot] = edge,
            None => {
                self.edge_index.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    /// Turn a node created from the flat table list into a CTE node,
    /// labelled with the CTE's declared spelling
    pub fn promote_to_cte(&mut self, id: &str, label: &str) {
        if let Some(node) = self.node_mut(id) {
            if node.kind == NodeKind::SourceTable {
                node.kind = NodeKind::Cte;
                node.label = label.to_string();
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.node_index.get(id) {
            Some(&i) => self.nodes.get_mut(i),
            None => None,
        }
    }

    /// Position of a node in discovery order
    pub fn discovery_index(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn output_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == NodeKind::OutputSelect)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether every node carries rank, order and position
    pub fn is_laid_out(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(Node::is_positioned)
    }

    /// Drop all layout annotations, keeping the topology
    pub fn clear_layout(&mut self) {
        for node in &mut self.nodes {
            node.rank = None;
            node.order_index = None;
            node.position = None;
        }
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.edge_index = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }
}
