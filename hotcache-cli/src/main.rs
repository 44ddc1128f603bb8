//! hotcache - build text templates through a hot-reloading artifact cache
//!
//! Usage:
//!   hotcache get <KEY>...          Print artifacts
//!   hotcache watch <KEY>           Re-print an artifact whenever it changes
//!   hotcache list                  List buildable keys
//!   hotcache graph [KEY]...        Dump the dependency graph

mod commands;
mod template;

use clap::{Parser, Subcommand};
use commands::Session;
use commands::graph::GraphFormat;
use hotcache::CacheConfig;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hotcache")]
#[command(about = "Build text templates through a hot-reloading artifact cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root holding the templates
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Extension of template files
    #[arg(short, long, default_value = "txt", global = true)]
    ext: String,

    /// Cache configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the artifact for each key
    Get {
        /// Keys to build, e.g. `web.Index`
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Re-request a key periodically and print it when it changes
    Watch {
        /// Key to watch
        key: String,

        /// Milliseconds between polls
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Stop after this many polls (default: run forever)
        #[arg(long)]
        count: Option<usize>,
    },

    /// List buildable keys under the root
    List,

    /// Build keys (all of them if none given) and dump the dependency graph
    Graph {
        /// Keys to build first
        keys: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: GraphFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "hotcache=debug"
    } else {
        "hotcache=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> commands::CommandResult {
    let config = match &cli.config {
        Some(path) => CacheConfig::load(path)?,
        None => CacheConfig::default(),
    };
    let session = Session::open(&cli.root, &cli.ext, config);
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Get { keys } => commands::get::run(&session, &keys, &mut out),
        Commands::Watch {
            key,
            interval_ms,
            count,
        } => commands::watch::run(
            &session,
            &key,
            Duration::from_millis(interval_ms),
            count,
            &mut out,
        ),
        Commands::List => commands::list::run(&session, &mut out),
        Commands::Graph { keys, format } => commands::graph::run(&session, &keys, format, &mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_graph_options() {
        let cli = Cli::parse_from(["hotcache", "--root", "site", "graph", "--format", "json", "web.Index"]);
        assert_eq!(cli.root, PathBuf::from("site"));
        assert_eq!(cli.ext, "txt");
        match cli.command {
            Commands::Graph { keys, format } => {
                assert_eq!(keys, vec!["web.Index".to_string()]);
                assert_eq!(format, GraphFormat::Json);
            }
            _ => panic!("expected the graph command"),
        }
    }

    #[test]
    fn test_get_requires_a_key() {
        assert!(Cli::try_parse_from(["hotcache", "get"]).is_err());
    }
}
