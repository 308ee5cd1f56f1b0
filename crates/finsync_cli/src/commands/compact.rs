//! Compact command implementation.

use super::{journal_path, CliResult};
use finsync_core::compact_dir;
use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> CliResult<()> {
    journal_path(path)?;

    println!("Compacting journal at {}", path.display());
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let report = compact_dir(path, dry_run)?;
    let saved = report.bytes_before.saturating_sub(report.bytes_after);

    println!("Compaction Analysis:");
    println!("  Frames before: {}", report.frames_before);
    println!("  Size before:   {} bytes", report.bytes_before);
    println!("  Size after:    {} bytes", report.bytes_after);
    println!(
        "  Space saved:   {} bytes ({:.1}%)",
        saved,
        if report.bytes_before > 0 {
            (saved as f64 / report.bytes_before as f64) * 100.0
        } else {
            0.0
        }
    );

    if !dry_run {
        println!();
        println!("✓ Compaction complete");
    }
    Ok(())
}
