//! Rotated collection names
//!
//! A rotated collection is named `<alias><ordinal>`, optionally with one
//! `-`, `_` or `.` between the two: `logs-202401` belongs to alias `logs`.
//! The ordinal is a plain non-negative integer, typically a timestamp.

use std::cmp::Ordering;

const SEPARATORS: [char; 3] = ['-', '_', '.'];

/// A collection eligible for retention, with its parsed ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionCandidate {
    pub name: String,
    pub ordinal: u64,
}

impl RetentionCandidate {
    /// Parse `name` as a rotation of `alias`
    pub fn parse(alias: &str, name: &str) -> Option<Self> {
        let (prefix, ordinal) = split_ordinal(name)?;
        let prefix = if prefix == alias {
            prefix
        } else {
            prefix.strip_suffix(SEPARATORS)?
        };

        (prefix == alias).then(|| Self {
            name: name.to_string(),
            ordinal,
        })
    }

    /// Newest first, ties broken by name
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.ordinal.cmp(&a.ordinal).then_with(|| a.name.cmp(&b.name))
    }
}

/// Trailing integer of a collection name
pub fn trailing_ordinal(name: &str) -> Option<u64> {
    split_ordinal(name).map(|(_, ordinal)| ordinal)
}

fn split_ordinal(name: &str) -> Option<(&str, u64)> {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[prefix.len()..];
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok().map(|ordinal| (prefix, ordinal))
}
