//! reldb shell
//!
//! # Usage
//!
//! ```bash
//! # Start interactive shell on ./DB
//! reldb
//!
//! # Execute statements and exit
//! reldb -c "CREATE TABLE t (id INT); SHOW TABLES;"
//!
//! # Use another data directory
//! reldb --data-dir /tmp/db --verbose
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod display;
mod shell;

use config::Config;
use reldb::Database;
use shell::Shell;

/// Relational database shell
#[derive(Parser, Debug)]
#[command(name = "reldb", version, about = "Interactive SQL shell for reldb")]
struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", env = "RELDB_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the database files
    #[arg(short = 'd', long, value_name = "DIR", env = "RELDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Execute the given statements and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(args.verbose, config.log_filter.as_deref());

    let db = Database::open(&config.data_dir)
        .with_context(|| format!("opening database in {}", config.data_dir.display()))?;
    info!(dir = %config.data_dir.display(), "database ready");

    let mut shell = Shell::new(db, &config);
    match &args.command {
        Some(sql) => shell.run_batch(sql).map(|_| ()),
        None => shell.run(),
    }
}

/// `RUST_LOG` wins, then `--verbose`, then the configured filter.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("reldb=debug")
        } else {
            EnvFilter::new(configured.unwrap_or("reldb=warn"))
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}
