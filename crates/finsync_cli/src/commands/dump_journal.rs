//! Dump journal command implementation.

use super::{journal_path, CliResult, OutputFormat};
use finsync_core::{JournalOp, JournalReader};
use finsync_storage::FileBackend;
use serde::Serialize;
use std::path::Path;

/// Journal frame representation for output.
#[derive(Debug, Serialize)]
pub struct FrameInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Encoded length including envelope and checksum.
    pub len: u64,
    /// Store sequence.
    pub sequence: u64,
    /// Operations of the frame.
    pub ops: Vec<OpInfo>,
}

/// Journal operation representation for output.
#[derive(Debug, Serialize)]
pub struct OpInfo {
    /// Operation kind.
    pub kind: &'static str,
    /// Table name.
    pub table: String,
    /// Row id.
    pub id: String,
    /// Owner (puts and tombstones).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Stored sync flag (puts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
    /// Payload size in bytes (puts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
}

impl From<&JournalOp> for OpInfo {
    fn from(op: &JournalOp) -> Self {
        let mut info = Self {
            kind: op.kind(),
            table: op.table().to_owned(),
            id: String::new(),
            owner_id: None,
            synced: None,
            payload_size: None,
        };
        match op {
            JournalOp::Put {
                id,
                owner_id,
                synced,
                payload,
                ..
            } => {
                info.id = id.to_string();
                info.owner_id = Some(owner_id.to_string());
                info.synced = Some(*synced);
                info.payload_size = Some(payload.len());
            }
            JournalOp::Tombstone { id, owner_id, .. } => {
                info.id = id.to_string();
                info.owner_id = Some(owner_id.to_string());
            }
            JournalOp::Delete { id, .. }
            | JournalOp::MarkSynced { id, .. }
            | JournalOp::ClearTombstone { id, .. } => info.id = id.to_string(),
        }
        info
    }
}

/// Runs the dump-journal command.
pub fn run(path: &Path, limit: Option<usize>, format: OutputFormat) -> CliResult<()> {
    let frames = read_frames(path, limit)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&frames)?),
        OutputFormat::Text => print_text_output(&frames),
    }
    Ok(())
}

/// Reads up to `limit` frames from the start of the journal.
pub fn read_frames(path: &Path, limit: Option<usize>) -> CliResult<Vec<FrameInfo>> {
    let backend = FileBackend::open(&journal_path(path)?)?;
    let reader = JournalReader::new(&backend)?;

    reader
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| -> CliResult<FrameInfo> {
            let record = record?;
            Ok(FrameInfo {
                offset: record.offset,
                len: record.len,
                sequence: record.frame.sequence,
                ops: record.frame.ops.iter().map(OpInfo::from).collect(),
            })
        })
        .collect()
}

fn print_text_output(frames: &[FrameInfo]) {
    println!("Journal frames ({} shown):", frames.len());
    println!();
    for frame in frames {
        println!(
            "@{:08x} seq={} len={} ops={}",
            frame.offset,
            frame.sequence,
            frame.len,
            frame.ops.len()
        );
        for op in &frame.ops {
            print!("    {:<16} {}/{}", op.kind, op.table, op.id);
            if let Some(owner) = &op.owner_id {
                print!(" owner={owner}");
            }
            if let Some(synced) = op.synced {
                print!(" synced={synced}");
            }
            if let Some(size) = op.payload_size {
                print!(" payload={size}B");
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_core::{EntityId, LocalStore, OwnerId, Portfolio, StoreConfig};

    #[test]
    fn lists_frames_in_order_with_limit() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open_dir(dir.path(), StoreConfig::default()).unwrap();
            let portfolios = store.table::<Portfolio>();
            let p = Portfolio {
                id: EntityId::from("p1"),
                owner_id: OwnerId::new("u1"),
                name: "ETF".into(),
                currency: "EUR".into(),
                is_synced: false,
            };
            portfolios.upsert(&p).unwrap();
            portfolios.mark_synced(&p.id).unwrap();
            portfolios.delete_by_id(&p.id).unwrap();
        }

        let frames = read_frames(dir.path(), None).unwrap();
        let kinds: Vec<_> = frames.iter().map(|f| f.ops[0].kind).collect();
        assert_eq!(kinds, ["put", "mark_synced", "delete"]);
        assert_eq!(frames[0].ops[0].owner_id.as_deref(), Some("u1"));
        assert_eq!(frames[0].ops[0].synced, Some(false));

        let limited = read_frames(dir.path(), Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].sequence, 1);
    }
}
