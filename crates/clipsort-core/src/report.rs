//! Human-readable run summary.

use std::io::{self, Write};

use crate::pipeline::mover::MoveRecord;
use crate::types::{ImageOutcome, RunStats};

/// Write the end-of-run summary.
///
/// Lists counts, then every move grouped by category in sorted order.
pub fn write_summary<W: Write>(
    w: &mut W,
    outcomes: &[ImageOutcome],
    moves: &[MoveRecord],
    non_image_files: usize,
    dry_run: bool,
) -> io::Result<()> {
    let stats = RunStats::from_outcomes(outcomes);

    writeln!(w)?;
    if dry_run {
        writeln!(w, "=== Dry Run Summary ===")?;
    } else {
        writeln!(w, "=== Summary ===")?;
    }
    writeln!(w, "Images found:        {}", stats.found)?;
    writeln!(w, "Images categorized:  {}", stats.categorized)?;
    writeln!(w, "Images skipped:      {}", stats.skipped)?;
    if non_image_files > 0 {
        writeln!(w, "Non-image files:     {non_image_files}")?;
    }

    if moves.is_empty() {
        writeln!(w, "\nNo files to move.")?;
        return Ok(());
    }

    let mut groups: std::collections::BTreeMap<&str, Vec<&MoveRecord>> = Default::default();
    for record in moves {
        groups.entry(&record.category).or_default().push(record);
    }

    writeln!(w, "Categories:          {}", groups.len())?;
    writeln!(w)?;

    let verb = if dry_run { "Would move" } else { "Moved" };
    for (category, records) in &groups {
        writeln!(w, "  {category}/ ({} files)", records.len())?;
        for record in records {
            let name = record
                .source
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            writeln!(
                w,
                "    {verb} {name} \u{2192} {}",
                record.destination.display()
            )?;
        }
    }
    writeln!(w)
}
