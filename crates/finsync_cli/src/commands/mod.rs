//! CLI command implementations.

pub mod compact;
pub mod dump_journal;
pub mod inspect;
pub mod verify;

use finsync_core::{CoreError, JOURNAL_FILE};
use finsync_storage::StorageError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format of reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors reported by the CLI.
#[derive(Error, Debug)]
pub enum CliError {
    /// A command needs `--path`.
    #[error("store path required for {0}")]
    MissingPath(&'static str),

    /// The directory has no journal.
    #[error("no FinSync store found at {}", .0.display())]
    NoStore(PathBuf),

    /// The store reported an error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The journal file could not be read.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON output failed.
    #[error("json output: {0}")]
    Json(#[from] serde_json::Error),

    /// Verification found a problem.
    #[error("verification failed: {0}")]
    Verify(String),
}

/// Result type of CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Returns the journal path of the store at `path`, which must exist.
pub(crate) fn journal_path(path: &Path) -> CliResult<PathBuf> {
    let journal = path.join(JOURNAL_FILE);
    if journal.is_file() {
        Ok(journal)
    } else {
        Err(CliError::NoStore(path.to_path_buf()))
    }
}
