//! Access Frequency Module
//!
//! Bounded per-key access counters used to pick warming candidates.

use std::collections::HashMap;

// == Access Frequency ==
/// Per-key access counters, pruned to the top `max_tracked` keys once the
/// table grows past twice that size.
#[derive(Debug, Default)]
pub struct AccessFrequency {
    counts: HashMap<String, u64>,
    max_tracked: usize,
}

impl AccessFrequency {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            counts: HashMap::new(),
            max_tracked,
        }
    }

    // == Track ==
    /// Increments the counter for `key`, pruning if the table overflows.
    pub fn track(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
            }
        }

        if self.counts.len() > self.max_tracked.saturating_mul(2) {
            self.prune();
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Keys whose count is at least `threshold`.
    pub fn keys_at_least(&self, threshold: u64) -> impl Iterator<Item = &str> {
        self.counts
            .iter()
            .filter(move |(_, count)| **count >= threshold)
            .map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    // == Prune ==
    /// Keeps the `max_tracked` most frequent keys.
    fn prune(&mut self) {
        let mut ranked: Vec<(String, u64)> = self.counts.drain().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_tracked);
        self.counts = ranked.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_counts() {
        let mut freq = AccessFrequency::new(10);
        freq.track("a");
        freq.track("a");
        freq.track("b");

        assert_eq!(freq.count("a"), 2);
        assert_eq!(freq.count("b"), 1);
        assert_eq!(freq.count("missing"), 0);
    }

    #[test]
    fn test_keys_at_least() {
        let mut freq = AccessFrequency::new(10);
        for _ in 0..5 {
            freq.track("hot");
        }
        freq.track("cold");

        let hot: Vec<&str> = freq.keys_at_least(5).collect();
        assert_eq!(hot, vec!["hot"]);
    }

    #[test]
    fn test_prune_keeps_most_frequent() {
        let mut freq = AccessFrequency::new(2);
        for _ in 0..3 {
            freq.track("top");
        }
        for _ in 0..2 {
            freq.track("second");
        }
        freq.track("x");
        freq.track("y");
        assert_eq!(freq.len(), 4);

        // Fifth distinct key pushes the table past 2 * max_tracked
        freq.track("z");

        assert_eq!(freq.len(), 2);
        assert_eq!(freq.count("top"), 3);
        assert_eq!(freq.count("second"), 2);
        assert_eq!(freq.count("z"), 0);
    }

    #[test]
    fn test_clear() {
        let mut freq = AccessFrequency::new(4);
        freq.track("a");
        freq.clear();
        assert!(freq.is_empty());
    }
}
