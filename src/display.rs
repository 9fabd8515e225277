use colored::*;

use crate::graph::{LineageGraph, Node, NodeKind};

/// Returns the sqlviz ASCII art logo
pub fn get_logo() -> String {
    let logo = r#"
   ___  ___  _    __   _____ ____
  / __|/ _ \| |   \ \ / /_ _|_  /
  \__ \ (_) | |__  \ V / | | / /
  |___/\__\_\____|  \_/ |___/___|
    "#;

    logo.to_string()
}

/// Returns a colored version of the logo
pub fn get_colored_logo() -> ColoredString {
    get_logo().bright_cyan()
}

/// Display version information with the ASCII art logo
pub fn display_version() {
    println!("{}", get_colored_logo());
    println!("sqlviz version {}", env!("CARGO_PKG_VERSION"));
    println!("Table-level lineage graphs for SQL queries");
    println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
}

fn colored_kind(node: &Node) -> ColoredString {
    match node.kind {
        NodeKind::SourceTable => node.kind.to_string().green(),
        NodeKind::Cte => node.kind.to_string().yellow(),
        NodeKind::OutputSelect => node.kind.to_string().bright_blue(),
    }
}

/// Human readable listing of a graph, grouped by rank
pub fn graph_to_text(graph: &LineageGraph) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n--- {} ---\n", "Lineage Graph".green()));

    let max_rank = graph.nodes().iter().filter_map(|n| n.rank).max();
    match max_rank {
        Some(max_rank) => {
            for rank in 0..=max_rank {
                let mut members: Vec<&Node> =
                    graph.nodes().iter().filter(|n| n.rank == Some(rank)).collect();
                members.sort_by_key(|n| n.order_index);

                out.push_str(&format!("\nRank {}:\n", rank));
                for node in members {
                    push_node(&mut out, graph, node);
                }
            }
        }
        None => {
            out.push_str(&format!("\n{}\n", "(not laid out)".dimmed()));
            for node in graph.nodes() {
                push_node(&mut out, graph, node);
            }
        }
    }

    out.push_str(&format!(
        "\n{} nodes, {} edges\n",
        graph.node_count(),
        graph.edge_count()
    ));
    out
}

fn push_node(out: &mut String, graph: &LineageGraph, node: &Node) {
    out.push_str(&format!("  • {} [{}]", node.label.bold(), colored_kind(node)));
    if let Some(p) = node.position {
        out.push_str(&format!(" at ({:.0}, {:.0})", p.x, p.y));
    }
    out.push('\n');

    let targets: Vec<&str> = graph
        .edges()
        .iter()
        .filter(|e| e.source == node.id)
        .map(|e| {
            graph
                .node(&e.target)
                .map(|t| t.label.as_str())
                .unwrap_or(e.target.as_str())
        })
        .collect();
    if !targets.is_empty() {
        out.push_str(&format!("      → {}\n", targets.join(", ")));
    }
}
