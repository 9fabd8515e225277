//! Tests for lineage graph construction
