//! Output shapes handed to renderers: the JSON node/edge contract and Graphviz DOT
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, LineageGraph, NodeKind, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    /// Absent only for a degraded, un-positioned graph
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Node and edge lists in discovery order, so output diffs cleanly between rebuilds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl From<&LineageGraph> for RenderGraph {
    fn from(graph: &LineageGraph) -> Self {
        Self {
            nodes: graph
                .nodes()
                .iter()
                .map(|node| RenderNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    kind: node.kind,
                    position: node.position,
                })
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|edge| RenderEdge {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    kind: edge.kind,
                })
                .collect(),
        }
    }
}

/// Pretty-printed JSON of the renderer contract
pub fn to_json(graph: &LineageGraph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&RenderGraph::from(graph))
}

fn escape_dot(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate a graph representation of the lineage (dot format for Graphviz)
pub fn to_dot(graph: &LineageGraph) -> String {
    let mut result = String::from("digraph lineage {\n");
    result.push_str("  rankdir=TB;\n");
    result.push_str("  node [shape=box];\n");

    for node in graph.nodes() {
        let style = match node.kind {
            NodeKind::SourceTable => "",
            NodeKind::Cte => ", style=rounded",
            NodeKind::OutputSelect => ", style=filled, fillcolor=lightblue",
        };
        result.push_str(&format!(
            "  \"{}\" [label=\"{}\"{}];\n",
            escape_dot(&node.id),
            escape_dot(&node.label),
            style
        ));
    }

    for edge in graph.edges() {
        let style = match edge.kind {
            EdgeKind::Plain => "",
            EdgeKind::CteDerived => " [style=dashed]",
        };
        result.push_str(&format!(
            "  \"{}\" -> \"{}\"{};\n",
            escape_dot(&edge.source),
            escape_dot(&edge.target),
            style
        ));
    }

    let max_rank = graph.nodes().iter().filter_map(|n| n.rank).max();
    if let Some(max_rank) = max_rank {
        for rank in 0..=max_rank {
            let mut members: Vec<_> = graph.nodes().iter().filter(|n| n.rank == Some(rank)).collect();
            members.sort_by_key(|n| n.order_index);

            result.push_str(&format!("  subgraph rank_{} {{\n", rank));
            result.push_str("    rank=same;\n");
            for node in members {
                result.push_str(&format!("    \"{}\";\n", escape_dot(&node.id)));
            }
            result.push_str("  }\n");
        }
    }

    result.push_str("}\n");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineageConfig;
    use crate::graph::{Node, OUTPUT_NODE_ID};
    use crate::pipeline::rebuild;
    use pretty_assertions::assert_eq;

    fn laid_out(sql: &str) -> LineageGraph {
        rebuild(sql, &LineageConfig::default()).unwrap()
    }

    #[test]
    fn test_render_graph_keeps_discovery_order() {
        let graph = laid_out("with a as (select * from t1) select * from a join t2 on a.id = t2.id");
        let render = RenderGraph::from(&graph);

        let ids: Vec<&str> = render.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "a", "t2", OUTPUT_NODE_ID]);
        assert!(render.nodes.iter().all(|n| n.position.is_some()));
        assert_eq!(render.edges.len(), 3);
    }

    #[test]
    fn test_json_contract_fields() {
        let graph = laid_out("select * from t1");
        let json: serde_json::Value = serde_json::from_str(&to_json(&graph).unwrap()).unwrap();

        let node = &json["nodes"][0];
        assert_eq!(node["id"], "t1");
        assert_eq!(node["label"], "t1");
        assert_eq!(node["kind"], "source_table");
        assert!(node["position"]["x"].is_number());

        let edge = &json["edges"][0];
        assert_eq!(edge["source"], "t1");
        assert_eq!(edge["target"], OUTPUT_NODE_ID);
        assert_eq!(edge["kind"], "plain");
    }

    #[test]
    fn test_json_omits_missing_positions() {
        let mut graph = LineageGraph::new();
        graph.add_node(Node::new("t1", NodeKind::SourceTable));

        let json: serde_json::Value = serde_json::from_str(&to_json(&graph).unwrap()).unwrap();
        assert!(json["nodes"][0].get("position").is_none());
    }

    #[test]
    fn test_dot_output() {
        let graph = laid_out("with a as (select * from t1) select * from a");
        let dot = to_dot(&graph);

        assert!(dot.starts_with("digraph lineage {"));
        assert!(dot.contains("\"t1\" -> \"a\" [style=dashed];"));
        assert!(dot.contains(&format!("\"a\" -> \"{}\";", OUTPUT_NODE_ID)));
        assert!(dot.contains("subgraph rank_2 {"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_dot_escapes_quotes() {
        let mut graph = LineageGraph::new();
        graph.add_node(Node::new("we\"ird", NodeKind::SourceTable));

        assert!(to_dot(&graph).contains("\"we\\\"ird\""));
    }
}
