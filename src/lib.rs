//! Lineage graphs for SQL queries.
//!
//! A query's `WITH`/`SELECT` structure is turned into a directed acyclic graph
//! of source tables, CTEs and the final result, which is then laid out in
//! ranks for display:
//!
//! ```no_run
//! use sql_lineage_viz::{config::LineageConfig, pipeline::rebuild, render::to_json};
//!
//! let graph = rebuild("with a as (select * from t1) select * from a", &LineageConfig::default())?;
//! println!("{}", to_json(&graph)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod render;
pub mod sql_engine;

pub use error::{LineageError, Result};
