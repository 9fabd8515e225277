//! Tests for the graph model and the layered layout engine

mod layout_tests;
