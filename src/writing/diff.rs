//! Edit range reconstruction
//!
//! Recovers the single contiguous edit that turns one snapshot into the next.
//! A keystroke can replace a (possibly empty) selection with at most one
//! character, so the changed region is found by trimming the shared prefix
//! and then the shared suffix.

use crate::error::EditError;
use crate::writing::types::DiffRange;

/// Differ for consecutive document snapshots
pub struct EditionDiffer;

impl EditionDiffer {
    /// Compute the edit range between `prev` and `cur`.
    ///
    /// Fails with [`EditError::Malformed`] when the snapshots differ at two
    /// separate places, which no single keystroke can produce.
    pub fn diff(prev: &[char], cur: &[char]) -> Result<DiffRange, EditError> {
        if prev.is_empty() {
            return Ok(DiffRange::new(0, 0, 0, cur.len()));
        }

        let start = common_prefix_len(prev, cur);

        if start == prev.len() || start == cur.len() {
            let range = DiffRange::new(start, prev.len(), start, cur.len());
            validate(prev, cur, &range)?;
            return Ok(range);
        }

        // Suffix scan may not cross the prefix on either side
        let mut e1 = prev.len();
        let mut e2 = cur.len();
        while e1 > start && e2 > start && prev[e1 - 1] == cur[e2 - 1] {
            e1 -= 1;
            e2 -= 1;
        }

        let range = DiffRange::new(start, e1, start, e2);
        validate(prev, cur, &range)?;

        if range.removed_len() >= 2 && range.inserted_len() >= 2 {
            return Err(EditError::Malformed(format!(
                "{} characters replaced by {}; a keystroke inserts at most one",
                range.removed_len(),
                range.inserted_len()
            )));
        }

        Ok(range)
    }

    /// Convenience wrapper over string snapshots
    pub fn diff_texts(prev: &str, cur: &str) -> Result<DiffRange, EditError> {
        let prev: Vec<char> = prev.chars().collect();
        let cur: Vec<char> = cur.chars().collect();
        Self::diff(&prev, &cur)
    }
}

fn common_prefix_len(prev: &[char], cur: &[char]) -> usize {
    prev.iter().zip(cur.iter()).take_while(|(a, b)| a == b).count()
}

/// Check the range against both snapshots
fn validate(prev: &[char], cur: &[char], range: &DiffRange) -> Result<(), EditError> {
    let DiffRange { s1, e1, s2, e2 } = *range;

    if s1 != s2 || s1 > e1 || s2 > e2 || e1 > prev.len() || e2 > cur.len() {
        return Err(EditError::Malformed(format!(
            "range {} out of bounds for snapshots of length {} and {}",
            range,
            prev.len(),
            cur.len()
        )));
    }
    if prev.len() - e1 != cur.len() - e2 {
        return Err(EditError::Malformed(format!(
            "range {} leaves suffixes of unequal length",
            range
        )));
    }
    if prev[..s1] != cur[..s2] || prev[e1..] != cur[e2..] {
        return Err(EditError::Malformed(format!(
            "range {} does not isolate a single edit",
            range
        )));
    }
    Ok(())
}
