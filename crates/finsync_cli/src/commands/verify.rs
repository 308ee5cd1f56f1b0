//! Verify command implementation.

use super::{journal_path, CliError, CliResult};
use finsync_core::JournalReader;
use finsync_storage::FileBackend;
use std::path::Path;

/// Journal verification result.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Intact frames.
    pub frames: u64,
    /// Journal size in bytes.
    pub bytes: u64,
    /// Bytes after the last intact frame that do not form a whole frame.
    pub torn_tail_bytes: u64,
    /// Sequence of the last intact frame.
    pub last_sequence: u64,
    /// First problem found, if any.
    pub problem: Option<String>,
}

/// Runs the verify command.
pub fn run(path: &Path) -> CliResult<()> {
    println!("Verifying journal at {}", path.display());
    let report = verify(path)?;

    println!("  Frames:        {}", report.frames);
    println!("  Size:          {} bytes", report.bytes);
    println!("  Last sequence: {}", report.last_sequence);
    if report.torn_tail_bytes > 0 {
        println!(
            "  Torn tail:     {} bytes (dropped on next open)",
            report.torn_tail_bytes
        );
    }

    match report.problem {
        Some(problem) => Err(CliError::Verify(problem)),
        None => {
            println!("✓ Journal is intact");
            Ok(())
        }
    }
}

/// Reads every frame of the journal at `path` without modifying it.
pub fn verify(path: &Path) -> CliResult<VerifyReport> {
    let backend = FileBackend::open(&journal_path(path)?)?;
    let mut reader = JournalReader::new(&backend)?;
    let mut report = VerifyReport {
        bytes: reader.size(),
        ..VerifyReport::default()
    };

    for record in reader.by_ref() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                report.problem = Some(err.to_string());
                return Ok(report);
            }
        };
        let sequence = record.frame.sequence;
        if sequence <= report.last_sequence {
            report.problem = Some(format!(
                "frame at offset {} has sequence {} after {}",
                record.offset, sequence, report.last_sequence
            ));
            return Ok(report);
        }
        report.frames += 1;
        report.last_sequence = sequence;
    }

    report.torn_tail_bytes = reader.size() - reader.valid_end();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_core::{EntityId, LocalStore, OwnerId, Portfolio, StoreConfig, JOURNAL_FILE};
    use std::fs::OpenOptions;
    use std::io::Write;

    fn seeded_store() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path(), StoreConfig::default()).unwrap();
        for n in 0..2 {
            store
                .table::<Portfolio>()
                .upsert(&Portfolio {
                    id: EntityId::from(format!("p{n}")),
                    owner_id: OwnerId::new("u1"),
                    name: "ETF".into(),
                    currency: "EUR".into(),
                    is_synced: false,
                })
                .unwrap();
        }
        dir
    }

    #[test]
    fn intact_journal_verifies() {
        let dir = seeded_store();
        let report = verify(dir.path()).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.last_sequence, 2);
        assert_eq!(report.torn_tail_bytes, 0);
        assert!(report.problem.is_none());
    }

    #[test]
    fn torn_tail_is_reported_but_not_fatal() {
        let dir = seeded_store();
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(JOURNAL_FILE))
            .unwrap();
        file.write_all(b"FJNL\x01\x00").unwrap();
        drop(file);

        let report = verify(dir.path()).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.torn_tail_bytes, 6);
        assert!(report.problem.is_none());
    }

    #[test]
    fn flipped_byte_is_a_problem() {
        let dir = seeded_store();
        let journal = dir.path().join(JOURNAL_FILE);
        let mut bytes = std::fs::read(&journal).unwrap();
        bytes[12] ^= 0xff;
        std::fs::write(&journal, bytes).unwrap();

        let report = verify(dir.path()).unwrap();
        assert_eq!(report.frames, 0);
        assert!(report.problem.is_some());
    }
}
