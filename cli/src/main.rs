//! topoplan command-line front-end
//!
//! Loads a JSON topology document and runs the reachability or planning
//! analysis over it, emitting JSON on stdout.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use topoplan_core::{load_path, plans, reachable, Application};

#[derive(Parser)]
#[command(name = "topoplan")]
#[command(about = "Analyze applications modeled as interacting finite-state machines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a topology document and report its shape
    Check {
        /// Topology document (JSON)
        file: PathBuf,
    },
    /// Enumerate every reachable global configuration
    Reach {
        /// Topology document (JSON)
        file: PathBuf,

        /// Print only the number of configurations
        #[arg(long)]
        count: bool,
    },
    /// Compute all-pairs move counts and first-step witnesses
    Plan {
        /// Topology document (JSON)
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load(file: &PathBuf) -> anyhow::Result<Application> {
    load_path(file).with_context(|| format!("loading {}", file.display()))
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { file } => {
            let app = load(&file)?;
            let states: usize = app
                .nodes()
                .values()
                .map(|inst| inst.spec().states.len())
                .sum();
            println!("nodes: {}", app.nodes().len());
            println!("states: {states}");
            println!("hard reset: {}", app.has_hard_reset());
            println!("initial: {}", app.global_state());
        }
        Command::Reach { file, count } => {
            let app = load(&file)?;
            let reached = reachable(&app);
            info!(configurations = reached.len(), "reachability done");
            if count {
                println!("{}", reached.len());
            } else {
                let keys: Vec<&str> = reached.keys().map(|k| k.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&keys)?);
            }
        }
        Command::Plan { file } => {
            let app = load(&file)?;
            let all = plans(&app);
            info!(configurations = all.costs.len(), "planning done");
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }

    Ok(())
}
