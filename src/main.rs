use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::graph::{graph_command, GraphOptions};

/// sqlviz CLI - lineage graphs for SQL queries
#[derive(Parser)]
#[clap(name = "sqlviz", about = "sqlviz - SQL lineage graph tool", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and lay out the lineage graph of a query
    Graph {
        /// SQL file to read (stdin when omitted)
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Output format for the graph (text, json, dot)
        #[clap(long, default_value = "text")]
        format: String,

        /// SQL dialect, overrides the config file
        #[clap(short, long)]
        dialect: Option<String>,

        /// Path to a configuration file (defaults to ./lineage.yaml)
        #[clap(short, long)]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "sql_lineage_viz=warn,sqlviz=warn",
        1 => "sql_lineage_viz=debug,sqlviz=debug",
        _ => "sql_lineage_viz=trace,sqlviz=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Graph {
            file,
            format,
            dialect,
            config,
        } => {
            let options = GraphOptions {
                file,
                format,
                dialect,
                config,
            };
            if let Err(err) = graph_command(options) {
                eprintln!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Command::Version => sql_lineage_viz::display::display_version(),
    }
}
