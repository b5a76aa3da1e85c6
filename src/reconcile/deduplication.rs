//! Row deduplication shared by the reconcilers
//!
//! Every feed is deduplicated on its source identifier with a stable
//! first-occurrence-wins rule. Rows whose key is absent are treated as one
//! key, so at most one of them survives.

use std::collections::HashSet;
use std::hash::Hash;
use tracing::debug;

/// Keep the first row for each key, preserving input order.
///
/// Returns the surviving rows and the number of rows removed.
pub fn deduplicate_first_by<T, K, F>(rows: Vec<T>, mut key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let input_count = rows.len();
    let mut seen = HashSet::with_capacity(input_count);

    let unique: Vec<T> = rows
        .into_iter()
        .filter(|row| seen.insert(key(row)))
        .collect();

    let removed = input_count - unique.len();
    if removed > 0 {
        debug!(
            "Deduplication removed {} of {} rows ({} remaining)",
            removed,
            input_count,
            unique.len()
        );
    }

    (unique, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let (unique, removed) = deduplicate_first_by(rows, |row| row.0);

        assert_eq!(unique, vec![("a", 1), ("b", 2), ("c", 4)]);
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_absent_keys_collapse() {
        let rows = vec![(None, 1), (Some("x"), 2), (None, 3)];
        let (unique, removed) = deduplicate_first_by(rows, |row| row.0);

        assert_eq!(unique, vec![(None, 1), (Some("x"), 2)]);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<(u8, u8)> = Vec::new();
        let (unique, removed) = deduplicate_first_by(rows, |row| row.0);
        assert!(unique.is_empty());
        assert_eq!(removed, 0);
    }
}
