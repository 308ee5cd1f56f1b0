//! FinSync CLI
//!
//! Command-line tools for FinSync local store maintenance.
//!
//! # Commands
//!
//! - `inspect` - Display per-table row, unsynced and tombstone counts
//! - `verify` - Check journal integrity without modifying it
//! - `compact` - Rewrite the journal as a single snapshot frame
//! - `dump-journal` - Dump journal frames for debugging

mod commands;

use clap::{Parser, Subcommand};
use commands::{CliError, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// FinSync command-line store tools.
#[derive(Parser)]
#[command(name = "finsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Display store statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Verify journal integrity
    Verify,

    /// Rewrite the journal as one snapshot frame
    Compact {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Dump journal frames for debugging
    DumpJournal {
        /// Maximum number of frames to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    debug!(command = ?cli.command, path = ?cli.path, "running command");
    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or(CliError::MissingPath("inspect"))?;
            commands::inspect::run(&path, format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or(CliError::MissingPath("verify"))?;
            commands::verify::run(&path)?;
        }
        Commands::Compact { dry_run } => {
            let path = cli.path.ok_or(CliError::MissingPath("compact"))?;
            commands::compact::run(&path, dry_run)?;
        }
        Commands::DumpJournal { limit, format } => {
            let path = cli.path.ok_or(CliError::MissingPath("dump-journal"))?;
            commands::dump_journal::run(&path, limit, format)?;
        }
        Commands::Version => {
            println!("FinSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("FinSync Core v{}", finsync_core::VERSION);
        }
    }

    Ok(())
}
