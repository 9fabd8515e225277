use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sql_lineage_viz::config::read_config;
use sql_lineage_viz::display::graph_to_text;
use sql_lineage_viz::graph::LineageGraph;
use sql_lineage_viz::pipeline::Pipeline;
use sql_lineage_viz::render::{to_dot, to_json};

/// Options of the `graph` subcommand
pub struct GraphOptions {
    pub file: Option<PathBuf>,
    pub format: String,
    pub dialect: Option<String>,
    pub config: Option<PathBuf>,
}

/// Run the graph command
pub fn graph_command(options: GraphOptions) -> Result<()> {
    let start_time = Instant::now();

    let mut config = read_config(options.config.clone()).context("Failed to load configuration")?;
    if let Some(dialect) = options.dialect {
        config.dialect = dialect;
    }
    let pipeline = Pipeline::from_config(&config).context("Invalid configuration")?;

    let sql = read_query(options.file.as_deref())?;
    let graph = match pipeline.rebuild(&sql) {
        Ok(graph) => graph,
        Err(failure) => match failure.topology {
            Some(topology) => {
                eprintln!(
                    "{} {}; showing the un-positioned graph",
                    "Warning:".yellow(),
                    failure.error
                );
                topology
            }
            None => return Err(failure.error).context("Failed to build lineage graph"),
        },
    };

    tracing::debug!(elapsed = ?start_time.elapsed(), "graph command finished");
    println!("{}", render(&graph, &options.format)?);
    Ok(())
}

/// Render the graph in the requested output format
pub fn render(graph: &LineageGraph, format: &str) -> Result<String> {
    match format {
        "text" => Ok(graph_to_text(graph)),
        "dot" => Ok(to_dot(graph)),
        "json" => to_json(graph).context("Failed to serialize graph"),
        _ => {
            eprintln!(
                "Unsupported output format: {}. Using text format instead.",
                format
            );
            Ok(graph_to_text(graph))
        }
    }
}

/// Read query text from a file, or from stdin when no file is given
fn read_query(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file: {}", path.display())),
        None => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .context("Failed to read SQL from stdin")?;
            Ok(sql)
        }
    }
}
