//! Gap detection for files named by sequential integers.

use std::collections::BTreeMap;
use tracing::debug;

use super::record::FileRecord;
use crate::constants::MAX_GAP_SPAN;

/// Slots covering the numeric range, plus notes about skipped input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapReport {
    /// One record per integer in `[min, max]`, ascending. When the range is
    /// wider than [`MAX_GAP_SPAN`] only the numbered files are listed.
    pub slots: Vec<FileRecord>,
    /// Files whose name is not a number, in input order.
    pub unnumbered: Vec<FileRecord>,
    pub notes: Vec<String>,
}

impl GapReport {
    /// Numbers that had no file.
    pub fn missing_numbers(&self) -> Vec<u64> {
        self.slots
            .iter()
            .filter(|slot| slot.is_missing())
            .filter_map(|slot| slot.filename.parse().ok())
            .collect()
    }
}

/// Parse the integer a filename stands for (`"0042.png"` -> 42).
pub fn file_number(filename: &str) -> Option<u64> {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    stem.trim().parse().ok()
}

/// Lay `files` out over `[min, max]`, synthesizing placeholders for gaps.
///
/// Bounds not given explicitly come from the observed numbers. When two files
/// map to the same number the healthier one wins; an equally healthy
/// newcomer does not displace the first. Files without a number are
/// returned in [`GapReport::unnumbered`].
pub fn find_gaps(files: &[FileRecord], min: Option<u64>, max: Option<u64>) -> GapReport {
    let mut notes = Vec::new();
    let mut unnumbered = Vec::new();
    let mut by_number: BTreeMap<u64, &FileRecord> = BTreeMap::new();

    for file in files {
        let Some(number) = file_number(&file.filename) else {
            debug!(filename = %file.filename, "Skipping non-numeric filename");
            if file.filename.is_empty() {
                notes.push(format!("{} has no filename, not numbered", file.file_id));
            } else {
                notes.push(format!("skipped non-numeric filename '{}'", file.filename));
            }
            unnumbered.push(file.clone());
            continue;
        };
        match by_number.get(&number) {
            Some(&existing) if existing.health.rank() >= file.health.rank() => {
                notes.push(format!(
                    "duplicate number {number}: kept {} ({}), ignored {} ({})",
                    existing.file_id, existing.health, file.file_id, file.health
                ));
            },
            Some(&existing) => {
                notes.push(format!(
                    "duplicate number {number}: replaced {} ({}) with {} ({})",
                    existing.file_id, existing.health, file.file_id, file.health
                ));
                by_number.insert(number, file);
            },
            None => {
                by_number.insert(number, file);
            },
        }
    }

    let observed_min = by_number.keys().next().copied();
    let observed_max = by_number.keys().next_back().copied();
    let (Some(low), Some(high)) = (min.or(observed_min), max.or(observed_max)) else {
        return GapReport {
            slots: Vec::new(),
            unnumbered,
            notes,
        };
    };
    if low > high {
        notes.push(format!("empty range: minimum {low} is above maximum {high}"));
        return GapReport {
            slots: Vec::new(),
            unnumbered,
            notes,
        };
    }

    let outside = by_number
        .keys()
        .filter(|n| !(low..=high).contains(*n))
        .count();
    if outside > 0 {
        notes.push(format!("{outside} file(s) outside {low}-{high} were dropped"));
    }

    let span = high - low;
    if span >= MAX_GAP_SPAN {
        notes.push(format!(
            "range {low}-{high} is wider than {MAX_GAP_SPAN} numbers; gaps not reported"
        ));
        let slots = by_number
            .range(low..=high)
            .map(|(_, file)| (*file).clone())
            .collect();
        return GapReport {
            slots,
            unnumbered,
            notes,
        };
    }

    let slots = (low..=high)
        .map(|n| {
            by_number
                .get(&n)
                .map_or_else(|| FileRecord::missing(n), |file| (*file).clone())
        })
        .collect();

    GapReport {
        slots,
        unnumbered,
        notes,
    }
}
