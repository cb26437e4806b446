//! Autosave CLI - autosave command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli_lib::settings::{self, Overrides};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Autosave - debounced, ordered saving of a changing JSON document
#[derive(Parser)]
#[command(name = "autosave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/autosave/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session fed by JSON lines on stdin
    Run {
        /// Snapshot store directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Quiet period before saving, in milliseconds
        #[arg(long)]
        frequency: Option<u64>,

        /// Top-level field to ignore when comparing documents (repeatable)
        #[arg(long = "ignore", value_name = "FIELD")]
        ignore: Vec<String>,

        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Show saved snapshots
    Log {
        /// Snapshot store directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Number of snapshots to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show configuration
    Config {
        /// Print the config file path
        #[arg(long, conflicts_with = "example")]
        path: bool,

        /// Print an example config file
        #[arg(long)]
        example: bool,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Guard flushes the log file on exit
    let log_file = match &cli.command {
        Commands::Run { log_file, .. } => log_file.as_deref(),
        _ => None,
    };
    let _guard = init_logging(log_file)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            store,
            frequency,
            ignore,
            log_file: _,
        } => {
            let overrides = Overrides {
                store,
                frequency_ms: frequency,
            };
            let settings = settings::resolve(config_path, &overrides)?;
            cmd::run::run(&settings, ignore).await
        }
        Commands::Log { store, limit } => {
            let overrides = Overrides {
                store,
                ..Default::default()
            };
            let settings = settings::resolve(config_path, &overrides)?;
            cmd::log::run(&settings, limit).await
        }
        Commands::Config { path, example } => {
            if path {
                cmd::config::run_path(config_path).await
            } else if example {
                cmd::config::run_example().await
            } else {
                let settings = settings::resolve(config_path, &Overrides::default())?;
                cmd::config::run_show(&settings, config_path).await
            }
        }
    }
}
