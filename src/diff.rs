//! Line-set diff summarizer for change records.
//!
//! Produces a human-oriented summary, not a patch: membership is checked
//! per line set, so ordering and duplicate counts are lost. Whitespace-only
//! or pure reordering edits collapse into a single "modification" item.

use crate::models::{ChangeItem, ChangeKind};

/// Max sample lines included per change item
const SAMPLE_LINES: usize = 5;

/// Summarize the delta between two content blobs.
///
/// Pure function of its inputs: same texts always produce the same items,
/// additions first, then removals.
pub fn summarize_changes(old_content: &str, new_content: &str) -> Vec<ChangeItem> {
    let old_lines: Vec<&str> = old_content.lines().collect();
    let new_lines: Vec<&str> = new_content.lines().collect();

    let mut changes = Vec::new();

    let added: Vec<&str> = new_lines
        .iter()
        .filter(|line| !line.trim().is_empty() && !old_lines.contains(line))
        .copied()
        .collect();
    if !added.is_empty() {
        changes.push(ChangeItem {
            kind: ChangeKind::Addition,
            description: format!("Added {} new lines", added.len()),
            content: sample(&added),
        });
    }

    let removed: Vec<&str> = old_lines
        .iter()
        .filter(|line| !line.trim().is_empty() && !new_lines.contains(line))
        .copied()
        .collect();
    if !removed.is_empty() {
        changes.push(ChangeItem {
            kind: ChangeKind::Removal,
            description: format!("Removed {} lines", removed.len()),
            content: sample(&removed),
        });
    }

    if changes.is_empty() {
        changes.push(ChangeItem {
            kind: ChangeKind::Modification,
            description: "Content modified with no clear line additions/removals".to_string(),
            content: String::new(),
        });
    }

    changes
}

fn sample(lines: &[&str]) -> String {
    let mut out = lines[..lines.len().min(SAMPLE_LINES)].join("\n");
    if lines.len() > SAMPLE_LINES {
        out.push_str("...");
    }
    out
}
