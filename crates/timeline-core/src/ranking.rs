//! Frequency counting with deterministic, first-seen tie-breaking.

use std::collections::HashMap;

/// Counts occurrences of string keys and ranks them.
///
/// Ranking is by descending count; keys with equal counts keep the order in
/// which they were first added. The ordering is part of the output contract,
/// so it is encoded as an explicit `(-count, first_seen)` sort key rather than
/// left to sort stability.
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`.
    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    /// Add `n` occurrences of `key`. A key first added with `n == 0` still
    /// claims its first-seen position.
    pub fn add(&mut self, key: &str, n: u64) {
        match self.index.get(key) {
            Some(&idx) => self.entries[idx].1 += n,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), n));
            }
        }
    }

    /// Current count of `key` (0 when never seen).
    pub fn get(&self, key: &str) -> u64 {
        self.index
            .get(key)
            .map(|&idx| self.entries[idx].1)
            .unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `limit` most common keys, fully ranked before truncation.
    pub fn most_common(&self, limit: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(usize, &(String, u64))> = self.entries.iter().enumerate().collect();
        ranked.sort_by_key(|(first_seen, (_, count))| (std::cmp::Reverse(*count), *first_seen));
        ranked
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}
