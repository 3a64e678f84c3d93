use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use codegraph::graph::props;
use codegraph::indexing::GraphUpdater;
use codegraph::ingest::{CypherIngestor, Ingestor, NullTransport};
use codegraph::{Settings, logging};

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Polyglot code indexer that builds a property graph of code entities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full scan of a repository into the graph store
    Index {
        /// Path to the repository root
        repo: PathBuf,

        /// Graph store host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Graph store port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Delete the project's existing graph before scanning
        #[arg(long)]
        clean: bool,
    },

    /// Run a full scan, then watch for changes and update incrementally
    Watch {
        /// Path to the repository root
        repo: PathBuf,

        /// Graph store host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Graph store port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Quiet period in seconds before a changed file is re-indexed
        #[arg(long, value_parser = parse_non_negative)]
        debounce: Option<f64>,

        /// Hard deadline in seconds after which a continuously-edited
        /// file is re-indexed anyway
        #[arg(long = "max-wait", value_parser = parse_non_negative)]
        max_wait: Option<f64>,
    },
}

fn parse_non_negative(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if parsed < 0.0 {
        return Err(format!("'{value}' must be non-negative"));
    }
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().context("failed to load configuration")?;
    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Index {
            repo,
            host,
            port,
            clean,
        } => {
            if let Some(host) = host {
                settings.graph.host = host;
            }
            if let Some(port) = port {
                settings.graph.port = port;
            }

            let mut updater = GraphUpdater::new(&repo, &settings)?;
            let mut ingestor =
                CypherIngestor::new(NullTransport::default(), settings.graph.batch_size);

            if clean {
                info!("cleaning existing graph for project '{}'", updater.project());
                ingestor.execute_write(
                    "MATCH (p:Project {name: $name})-[*0..]->(n) DETACH DELETE p, n",
                    props([("name", json!(updater.project()))]),
                )?;
            }

            updater.full_scan(&mut ingestor)?;
            info!("scan complete for {}", repo.display());
        }
        Commands::Watch {
            repo,
            host,
            port,
            debounce,
            max_wait,
        } => {
            if let Some(host) = host {
                settings.graph.host = host;
            }
            if let Some(port) = port {
                settings.graph.port = port;
            }
            if let Some(debounce) = debounce {
                settings.watch.debounce_seconds = debounce;
            }
            if let Some(max_wait) = max_wait {
                settings.watch.max_wait_seconds = max_wait;
            }

            let mut updater = GraphUpdater::new(&repo, &settings)?;
            let mut ingestor =
                CypherIngestor::new(NullTransport::default(), settings.graph.batch_size);

            let cancel = updater.cancel_handle();
            updater.full_scan(&mut ingestor)?;
            info!("initial scan complete, watching {}", repo.display());

            codegraph::watcher::run(updater, ingestor, &settings.watch, cancel)?;
        }
    }
    Ok(())
}
