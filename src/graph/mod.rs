//! Lineage graph model and the layered layout engine

pub mod layout;
pub mod model;

pub use layout::{count_crossings, LayoutConfig, LayoutEngine, LayoutStats};
pub use model::{Edge, EdgeKind, LineageGraph, Node, NodeKind, Position, OUTPUT_NODE_ID};

#[cfg(test)]
mod tests;
