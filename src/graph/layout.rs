//! Layered (Sugiyama style) layout for lineage graphs
//!
//! Three phases run on the node indices of a [`LineageGraph`]:
//! 1. Rank assignment: longest path from any source, via topological sort
//! 2. Ordering: alternating median/barycenter sweeps to cut edge crossings
//! 3. Coordinates: fixed-size boxes on a grid, each rank centered
//!
//! The engine is deterministic. Ties are always broken by discovery order,
//! so laying out the same topology twice gives identical coordinates.
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{LineageGraph, Position};
use crate::error::{LineageError, Result};

/// Box sizes and spacing used when placing nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
    /// Upper bound on ordering sweeps (each sweep is one direction)
    pub max_sweeps: usize,
    /// Shift each rank so narrow ranks sit under the middle of wide ones
    pub center_ranks: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 172.0,
            node_height: 36.0,
            horizontal_gap: 40.0,
            vertical_gap: 60.0,
            max_sweeps: 8,
            center_ranks: true,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let dimensions = [
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("horizontal_gap", self.horizontal_gap),
            ("vertical_gap", self.vertical_gap),
        ];

        for (name, value) in dimensions {
            if !value.is_finite() || value <= 0.0 {
                return Err(LineageError::Config(format!(
                    "layout.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    fn column_width(&self) -> f64 {
        self.node_width + self.horizontal_gap
    }

    fn row_height(&self) -> f64 {
        self.node_height + self.vertical_gap
    }
}

/// Numbers describing one layout run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    pub ranks: usize,
    pub sweeps_run: usize,
    pub crossings: usize,
}

/// Assigns rank, order index and position to every node of a graph
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `graph`, overwriting any previous annotations.
    ///
    /// Fails with `MissingReference` for dangling edges and with
    /// `CycleDetected` when ranks cannot be assigned. No partial layout is
    /// produced in either case.
    pub fn layout(&self, graph: LineageGraph) -> Result<LineageGraph> {
        self.layout_with_stats(graph).map(|(graph, _)| graph)
    }

    pub fn layout_with_stats(&self, mut graph: LineageGraph) -> Result<(LineageGraph, LayoutStats)> {
        let adjacency = Adjacency::from_graph(&graph)?;
        let ranks = assign_ranks(&graph, &adjacency)?;
        let ordering = order_layers(&ranks, &adjacency, self.config.max_sweeps);

        self.assign_coordinates(&mut graph, &ranks, &ordering.layers);

        let stats = LayoutStats {
            ranks: ordering.layers.len(),
            sweeps_run: ordering.sweeps_run,
            crossings: ordering.crossings,
        };
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            ranks = stats.ranks,
            sweeps = stats.sweeps_run,
            crossings = stats.crossings,
            "layout finished"
        );

        Ok((graph, stats))
    }

    fn assign_coordinates(&self, graph: &mut LineageGraph, ranks: &[usize], layers: &[Vec<usize>]) {
        let column = self.config.column_width();
        let row = self.config.row_height();

        let layer_width = |len: usize| {
            if len == 0 {
                0.0
            } else {
                len as f64 * column - self.config.horizontal_gap
            }
        };
        let widest = layers.iter().map(|l| layer_width(l.len())).fold(0.0, f64::max);

        let nodes = graph.nodes_mut();
        for layer in layers {
            let offset = if self.config.center_ranks {
                (widest - layer_width(layer.len())) / 2.0
            } else {
                0.0
            };

            for (order, &v) in layer.iter().enumerate() {
                let node = &mut nodes[v];
                node.rank = Some(ranks[v]);
                node.order_index = Some(order);
                node.position = Some(Position {
                    x: offset + order as f64 * column,
                    y: ranks[v] as f64 * row,
                });
            }
        }
    }
}

/// Successor and predecessor lists keyed by discovery index
struct Adjacency {
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
}

impl Adjacency {
    fn from_graph(graph: &LineageGraph) -> Result<Self> {
        let n = graph.node_count();
        let mut succ = vec![Vec::new(); n];
        let mut pred = vec![Vec::new(); n];
        let mut edges = Vec::with_capacity(graph.edge_count());

        for edge in graph.edges() {
            let lookup = |endpoint: &str| {
                graph
                    .discovery_index(endpoint)
                    .ok_or_else(|| LineageError::MissingReference {
                        edge: edge.id.clone(),
                        endpoint: endpoint.to_string(),
                    })
            };
            let s = lookup(&edge.source)?;
            let t = lookup(&edge.target)?;

            succ[s].push(t);
            pred[t].push(s);
            edges.push((s, t));
        }

        Ok(Self { succ, pred, edges })
    }

    fn len(&self) -> usize {
        self.succ.len()
    }
}

/// Longest-path ranks; every edge ends up pointing to a strictly higher rank
fn assign_ranks(graph: &LineageGraph, adjacency: &Adjacency) -> Result<Vec<usize>> {
    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(adjacency.len(), adjacency.edges.len());
    for _ in 0..adjacency.len() {
        dag.add_node(());
    }
    for &(s, t) in &adjacency.edges {
        dag.add_edge(NodeIndex::new(s), NodeIndex::new(t), ());
    }

    let topo = toposort(&dag, None).map_err(|cycle| LineageError::CycleDetected {
        node: graph.nodes()[cycle.node_id().index()].id.clone(),
    })?;

    let mut ranks = vec![0usize; adjacency.len()];
    for u in topo {
        let u = u.index();
        for &v in &adjacency.succ[u] {
            ranks[v] = ranks[v].max(ranks[u] + 1);
        }
    }

    Ok(ranks)
}

struct Ordering {
    layers: Vec<Vec<usize>>,
    sweeps_run: usize,
    crossings: usize,
}

/// Reorder each rank with alternating top-down and bottom-up sweeps.
///
/// The ordering with the fewest crossings seen is kept, so the result is
/// never worse than discovery order.
fn order_layers(ranks: &[usize], adjacency: &Adjacency, max_sweeps: usize) -> Ordering {
    let num_layers = ranks.iter().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); num_layers];
    for (v, &r) in ranks.iter().enumerate() {
        layers[r].push(v);
    }

    let mut position = vec![0usize; ranks.len()];
    refresh_positions(&layers, &mut position);

    let mut best_crossings = layer_crossings(ranks, &position, &adjacency.edges);
    let mut best_layers = layers.clone();
    let mut sweeps_run = 0;
    let mut stable_sweeps = 0;

    for sweep in 0..max_sweeps {
        if best_crossings == 0 || stable_sweeps >= 2 {
            break;
        }
        let downward = sweep % 2 == 0;

        let order: Vec<usize> = if downward {
            (1..num_layers).collect()
        } else {
            (0..num_layers.saturating_sub(1)).rev().collect()
        };

        let mut changed = false;
        for layer_idx in order {
            let neighbors = if downward {
                &adjacency.pred
            } else {
                &adjacency.succ
            };
            changed |= median_sort(&mut layers[layer_idx], neighbors, &mut position);
        }
        sweeps_run += 1;

        if changed {
            stable_sweeps = 0;
            let crossings = layer_crossings(ranks, &position, &adjacency.edges);
            if crossings < best_crossings {
                best_crossings = crossings;
                best_layers = layers.clone();
            }
        } else {
            stable_sweeps += 1;
        }
    }

    Ordering {
        layers: best_layers,
        sweeps_run,
        crossings: best_crossings,
    }
}

/// Sort one layer by the median position of its neighbors.
///
/// `neighbors` holds every upstream (or downstream) node of a vertex, not
/// only the ones in the adjacent rank, so an edge that skips ranks still
/// pulls on the order. No dummy nodes are inserted for such edges.
/// An even neighbor count falls back to the barycenter. Nodes without
/// neighbors keep their current index. Returns whether the order changed.
fn median_sort(layer: &mut Vec<usize>, neighbors: &[Vec<usize>], position: &mut [usize]) -> bool {
    let mut keyed: Vec<(f64, usize)> = layer
        .iter()
        .map(|&v| {
            let mut around: Vec<f64> = neighbors[v].iter().map(|&u| position[u] as f64).collect();
            around.sort_by(f64::total_cmp);

            let key = match around.len() {
                0 => position[v] as f64,
                len if len % 2 == 1 => around[len / 2],
                len => around.iter().sum::<f64>() / len as f64,
            };
            (key, v)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let reordered: Vec<usize> = keyed.into_iter().map(|(_, v)| v).collect();
    if reordered == *layer {
        return false;
    }

    for (i, &v) in reordered.iter().enumerate() {
        position[v] = i;
    }
    *layer = reordered;
    true
}

fn refresh_positions(layers: &[Vec<usize>], position: &mut [usize]) {
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            position[v] = i;
        }
    }
}

/// Count crossings between edges that span the same pair of ranks
fn layer_crossings(ranks: &[usize], position: &[usize], edges: &[(usize, usize)]) -> usize {
    let mut crossings = 0;
    for (i, &(s1, t1)) in edges.iter().enumerate() {
        for &(s2, t2) in &edges[i + 1..] {
            if ranks[s1] != ranks[s2] || ranks[t1] != ranks[t2] {
                continue;
            }
            let a = position[s1] as i64 - position[s2] as i64;
            let b = position[t1] as i64 - position[t2] as i64;
            if a * b < 0 {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Edge crossings of an already laid out graph.
///
/// Edges touching a node without rank or order are ignored.
pub fn count_crossings(graph: &LineageGraph) -> usize {
    let placed: Vec<(usize, usize, usize, usize)> = graph
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = graph.node(&edge.source)?;
            let target = graph.node(&edge.target)?;
            Some((
                source.rank?,
                source.order_index?,
                target.rank?,
                target.order_index?,
            ))
        })
        .collect();

    let mut crossings = 0;
    for (i, &(rs1, os1, rt1, ot1)) in placed.iter().enumerate() {
        for &(rs2, os2, rt2, ot2) in &placed[i + 1..] {
            if rs1 != rs2 || rt1 != rt2 {
                continue;
            }
            let a = os1 as i64 - os2 as i64;
            let b = ot1 as i64 - ot2 as i64;
            if a * b < 0 {
                crossings += 1;
            }
        }
    }
    crossings
}
