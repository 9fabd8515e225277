use std::collections::{HashMap, HashSet};

use pretty_assertions::assert_eq;
use sqlparser::dialect::DuckDbDialect;
use test_case::test_case;

use crate::error::LineageError;
use crate::graph::{
    count_crossings, EdgeKind, LayoutConfig, LayoutEngine, LineageGraph, Node, NodeKind,
    OUTPUT_NODE_ID,
};
use crate::sql_engine::lineage_from_sql;

fn engine() -> LayoutEngine {
    LayoutEngine::new(LayoutConfig::default()).unwrap()
}

fn graph_from_edges(nodes: &[&str], edges: &[(&str, &str)]) -> LineageGraph {
    let mut graph = LineageGraph::new();
    for id in nodes {
        graph.add_node(Node::new(*id, NodeKind::SourceTable));
    }
    for (s, t) in edges {
        graph.add_edge(s, t, EdgeKind::Plain);
    }
    graph
}

fn rank_of(graph: &LineageGraph, id: &str) -> usize {
    graph.node(id).unwrap().rank.unwrap()
}

fn order_of(graph: &LineageGraph, id: &str) -> usize {
    graph.node(id).unwrap().order_index.unwrap()
}

const WIDE_QUERY: &str = "
    with orders_clean as (select * from raw.orders),
         customers_clean as (select * from raw.customers),
         payments_clean as (select * from raw.payments),
         order_totals as (
             select * from orders_clean join payments_clean on orders_clean.id = payments_clean.order_id
         ),
         customer_orders as (
             select * from customers_clean join order_totals on customers_clean.id = order_totals.customer_id
         )
    select * from customer_orders join regions on customer_orders.region_id = regions.id";

#[test]
fn test_cte_chain_ranks() {
    let graph = lineage_from_sql("with a as (select * from t1) select * from a", &DuckDbDialect {})
        .unwrap();
    let graph = engine().layout(graph).unwrap();

    assert_eq!(rank_of(&graph, "t1"), 0);
    assert_eq!(rank_of(&graph, "a"), 1);
    assert_eq!(rank_of(&graph, OUTPUT_NODE_ID), 2);
}

#[test]
fn test_rank_is_longest_path() {
    // a -> b -> c and a shortcut a -> c
    let graph = graph_from_edges(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
    let graph = engine().layout(graph).unwrap();

    assert_eq!(rank_of(&graph, "a"), 0);
    assert_eq!(rank_of(&graph, "b"), 1);
    assert_eq!(rank_of(&graph, "c"), 2);
}

#[test]
fn test_every_edge_goes_down_a_rank() {
    let graph = lineage_from_sql(WIDE_QUERY, &DuckDbDialect {}).unwrap();
    let graph = engine().layout(graph).unwrap();

    for edge in graph.edges() {
        assert!(
            rank_of(&graph, &edge.source) < rank_of(&graph, &edge.target),
            "edge {} is not monotonic",
            edge.id
        );
    }
}

#[test]
fn test_order_indices_form_a_permutation_per_rank() {
    let graph = lineage_from_sql(WIDE_QUERY, &DuckDbDialect {}).unwrap();
    let graph = engine().layout(graph).unwrap();

    let mut by_rank: HashMap<usize, Vec<usize>> = HashMap::new();
    for node in graph.nodes() {
        by_rank
            .entry(node.rank.unwrap())
            .or_default()
            .push(node.order_index.unwrap());
    }

    for (rank, mut orders) in by_rank {
        orders.sort_unstable();
        let expected: Vec<usize> = (0..orders.len()).collect();
        assert_eq!(orders, expected, "rank {} has gaps or duplicates", rank);
    }
}

#[test]
fn test_no_two_nodes_share_coordinates() {
    let graph = lineage_from_sql(WIDE_QUERY, &DuckDbDialect {}).unwrap();
    let graph = engine().layout(graph).unwrap();

    let mut seen = HashSet::new();
    for node in graph.nodes() {
        let p = node.position.unwrap();
        assert!(
            seen.insert((p.x.to_bits(), p.y.to_bits())),
            "{} overlaps another node",
            node.id
        );
    }
}

#[test]
fn test_layout_is_idempotent() {
    let graph = lineage_from_sql(WIDE_QUERY, &DuckDbDialect {}).unwrap();
    let engine = engine();

    let first = engine.layout(graph).unwrap();
    let second = engine.layout(first.clone()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_coordinates_follow_grid() {
    let config = LayoutConfig {
        node_width: 100.0,
        node_height: 20.0,
        horizontal_gap: 10.0,
        vertical_gap: 30.0,
        center_ranks: false,
        ..LayoutConfig::default()
    };
    let graph = graph_from_edges(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
    let graph = LayoutEngine::new(config).unwrap().layout(graph).unwrap();

    let a = graph.node("a").unwrap().position.unwrap();
    let b = graph.node("b").unwrap().position.unwrap();
    let c = graph.node("c").unwrap().position.unwrap();

    assert_eq!((a.x, a.y), (0.0, 0.0));
    assert_eq!((b.x, b.y), (110.0, 0.0));
    assert_eq!((c.x, c.y), (0.0, 50.0));
}

#[test]
fn test_narrow_ranks_are_centered() {
    let config = LayoutConfig {
        node_width: 100.0,
        horizontal_gap: 10.0,
        ..LayoutConfig::default()
    };
    let graph = graph_from_edges(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
    let graph = LayoutEngine::new(config).unwrap().layout(graph).unwrap();

    // rank 0 spans 210 units, so the single node of rank 1 starts at 55
    assert_eq!(graph.node("c").unwrap().position.unwrap().x, 55.0);
}

#[test]
fn test_sweeps_remove_a_simple_crossing() {
    // discovery order puts a,b over d,c; a feeds c and b feeds d
    let graph = graph_from_edges(&["a", "b", "d", "c"], &[("a", "c"), ("b", "d")]);
    let (graph, stats) = engine().layout_with_stats(graph).unwrap();

    assert_eq!(stats.crossings, 0);
    assert_eq!(count_crossings(&graph), 0);
    assert!(order_of(&graph, "c") < order_of(&graph, "d"));
}

#[test]
fn test_rank_skipping_edges_pull_on_order() {
    // q and p only differ in their rank 0 parents, reached over edges that skip rank 1
    let graph = graph_from_edges(
        &["b", "a", "m", "q", "p"],
        &[("b", "m"), ("m", "q"), ("m", "p"), ("a", "q"), ("b", "p")],
    );
    let (graph, stats) = engine().layout_with_stats(graph).unwrap();

    assert_eq!(rank_of(&graph, "q"), 2);
    assert_eq!(rank_of(&graph, "p"), 2);
    assert_eq!(order_of(&graph, "p"), 0);
    assert_eq!(order_of(&graph, "q"), 1);
    assert_eq!(stats.crossings, 0);
}

#[test]
fn test_zero_sweeps_keep_discovery_order() {
    let config = LayoutConfig {
        max_sweeps: 0,
        ..LayoutConfig::default()
    };
    let graph = graph_from_edges(&["a", "b", "d", "c"], &[("a", "c"), ("b", "d")]);
    let graph = LayoutEngine::new(config).unwrap().layout(graph).unwrap();

    assert_eq!(order_of(&graph, "d"), 0);
    assert_eq!(order_of(&graph, "c"), 1);
    assert_eq!(count_crossings(&graph), 1);
}

#[test]
fn test_ties_are_broken_by_discovery_order() {
    let graph = graph_from_edges(&["root", "z", "y", "x"], &[("root", "z"), ("root", "y"), ("root", "x")]);
    let graph = engine().layout(graph).unwrap();

    assert_eq!(order_of(&graph, "z"), 0);
    assert_eq!(order_of(&graph, "y"), 1);
    assert_eq!(order_of(&graph, "x"), 2);
}

#[test]
fn test_crossings_never_increase() {
    let graph = lineage_from_sql(WIDE_QUERY, &DuckDbDialect {}).unwrap();

    let unsorted = LayoutEngine::new(LayoutConfig {
        max_sweeps: 0,
        ..LayoutConfig::default()
    })
    .unwrap()
    .layout(graph.clone())
    .unwrap();
    let sorted = engine().layout(graph).unwrap();

    assert!(count_crossings(&sorted) <= count_crossings(&unsorted));
}

#[test]
fn test_back_edge_is_reported_as_cycle() {
    let graph = lineage_from_sql("with a as (select * from t1) select * from a", &DuckDbDialect {})
        .unwrap();
    let mut graph = engine().layout(graph).unwrap();
    // output feeds back into t1
    graph.add_edge(OUTPUT_NODE_ID, "t1", EdgeKind::Plain);

    let err = engine().layout(graph).unwrap_err();
    assert!(matches!(err, LineageError::CycleDetected { .. }));
    assert!(err.allows_degraded_view());
}

#[test]
fn test_self_referencing_cte_is_a_cycle() {
    let graph = lineage_from_sql("with a as (select * from a) select * from a", &DuckDbDialect {})
        .unwrap();

    let err = engine().layout(graph).unwrap_err();
    match err {
        LineageError::CycleDetected { node } => assert_eq!(node, "a"),
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_dangling_edge_is_missing_reference() {
    let mut graph = graph_from_edges(&["a"], &[]);
    graph.add_edge("a", "ghost", EdgeKind::Plain);

    let err = engine().layout(graph).unwrap_err();
    match err {
        LineageError::MissingReference { edge, endpoint } => {
            assert_eq!(edge, "a->ghost");
            assert_eq!(endpoint, "ghost");
        }
        other => panic!("expected a missing reference, got {:?}", other),
    }
}

#[test]
fn test_empty_graph_lays_out_to_nothing() {
    let (graph, stats) = engine().layout_with_stats(LineageGraph::new()).unwrap();

    assert!(graph.is_empty());
    assert_eq!(stats.ranks, 0);
}

#[test_case(0.0, 36.0, 40.0, 60.0 ; "zero width")]
#[test_case(172.0, -1.0, 40.0, 60.0 ; "negative height")]
#[test_case(172.0, 36.0, f64::NAN, 60.0 ; "nan gap")]
#[test_case(172.0, 36.0, 40.0, f64::INFINITY ; "infinite gap")]
fn test_invalid_config_is_rejected(width: f64, height: f64, hgap: f64, vgap: f64) {
    let config = LayoutConfig {
        node_width: width,
        node_height: height,
        horizontal_gap: hgap,
        vertical_gap: vgap,
        ..LayoutConfig::default()
    };
    assert!(matches!(
        LayoutEngine::new(config),
        Err(LineageError::Config(_))
    ));
}
