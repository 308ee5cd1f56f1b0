//! Inspect command implementation.

use super::{journal_path, CliResult, OutputFormat};
use finsync_core::{LocalStore, StoreConfig};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Number of journal frames.
    pub frames: u64,
    /// Sequence of the last committed write.
    pub last_sequence: u64,
    /// Bytes of a torn trailing frame dropped on open.
    pub truncated_bytes: u64,
    /// Per-table statistics.
    pub tables: Vec<TableInfo>,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Number of rows.
    pub rows: usize,
    /// Rows waiting to be pushed.
    pub unsynced: usize,
    /// Deletes waiting to reach the remote.
    pub tombstones: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> CliResult<()> {
    let result = inspect(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

/// Opens the store at `path` and collects its statistics.
pub fn inspect(path: &Path) -> CliResult<InspectResult> {
    journal_path(path)?;
    let store = LocalStore::open_dir(path, StoreConfig::default().create_if_missing(false))?;
    let stats = store.stats()?;

    Ok(InspectResult {
        path: path.display().to_string(),
        journal_bytes: stats.journal_bytes,
        frames: stats.frames,
        last_sequence: stats.last_sequence,
        truncated_bytes: store.replay_stats().truncated_bytes,
        tables: stats
            .tables
            .into_iter()
            .map(|t| TableInfo {
                name: t.name,
                rows: t.rows,
                unsynced: t.unsynced,
                tombstones: t.tombstones,
            })
            .collect(),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("FinSync Store: {}", result.path);
    println!();
    println!("Journal:");
    println!("  Size:          {} bytes", result.journal_bytes);
    println!("  Frames:        {}", result.frames);
    println!("  Last sequence: {}", result.last_sequence);
    if result.truncated_bytes > 0 {
        println!("  Torn tail:     {} bytes dropped", result.truncated_bytes);
    }
    println!();
    println!(
        "  {:<24} {:>8} {:>10} {:>12}",
        "Table", "Rows", "Unsynced", "Tombstones"
    );
    for table in &result.tables {
        println!(
            "  {:<24} {:>8} {:>10} {:>12}",
            table.name, table.rows, table.unsynced, table.tombstones
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_core::{EntityId, Goal, OwnerId};

    #[test]
    fn counts_rows_per_table() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open_dir(dir.path(), StoreConfig::default()).unwrap();
            let goals = store.table::<Goal>();
            for n in 0..3 {
                goals
                    .upsert(&Goal {
                        id: EntityId::from(format!("g{n}")),
                        owner_id: OwnerId::new("u1"),
                        name: "Trip".into(),
                        target_amount: 100,
                        saved_amount: 0,
                        currency: "EUR".into(),
                        deadline: None,
                        color: "#fff".into(),
                        is_synced: false,
                    })
                    .unwrap();
            }
            goals.mark_synced(&EntityId::from("g0")).unwrap();
        }

        let result = inspect(dir.path()).unwrap();
        let goals = result.tables.iter().find(|t| t.name == "goals").unwrap();
        assert_eq!(goals.rows, 3);
        assert_eq!(goals.unsynced, 2);
        assert_eq!(result.frames, 4);
    }

    #[test]
    fn missing_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            inspect(dir.path()),
            Err(super::super::CliError::NoStore(_))
        ));
    }
}
