/// CSV export of the current view and the letter pile report
///
/// Exports write exactly what the user sees: hidden rows stay out of
/// the file, and pile aggregation follows the active letter mapping.

use std::path::Path;

use thiserror::Error;

use crate::sorter::letters::LetterMapping;
use crate::sorter::populate::Materialized;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write CSV data: {0}")]
    Csv(#[from] csv::Error),
}

fn status_label(checked: bool, struck: bool) -> &'static str {
    if checked {
        "Sorted"
    } else if struck {
        "Nothing to sort"
    } else {
        "In progress"
    }
}

/// Write the materialized rows to a CSV file, one row per visible
/// group, in the order they are displayed.
pub fn write_view_csv<E>(path: &Path, items: &[Materialized<E>]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Group", "Total Cards", "Unsorted", "Status"])?;
    for item in items.iter().filter(|i| !i.state.hidden) {
        writer.write_record([
            item.group_name.as_str(),
            &item.total_count.to_string(),
            &item.unsorted_count.to_string(),
            status_label(item.state.checked, item.state.struck),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the physical pile checklist: one row per combined pile with
/// its member letters and total card count, in alphabetical order of
/// the pile's first letter. Piles with no cards are omitted.
pub fn write_pile_report(
    path: &Path,
    counts: &[u32; 26],
    mapping: &LetterMapping,
) -> Result<(), ExportError> {
    // entries() walks A-Z, so the first sighting of each pile label
    // fixes the report order.
    let mut order: Vec<&str> = Vec::new();
    let mut totals: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
    for (letter, pile) in mapping.entries() {
        let count = counts[(letter as u8 - b'A') as usize];
        if count == 0 {
            continue;
        }
        let entry = totals.entry(pile).or_insert_with(|| {
            order.push(pile);
            0
        });
        *entry += count;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Pile", "Letters", "Cards"])?;
    for pile in order {
        let letters: Vec<String> = pile.chars().map(|c| c.to_string()).collect();
        writer.write_record([pile, &letters.join(" "), &totals[pile].to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
