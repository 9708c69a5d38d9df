//! Cache Statistics Module
//!
//! Tracks lookups, timer-driven expirations and explicit deletions.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing (missing or expired)
    pub misses: u64,
    /// Entries removed by their eviction job
    pub expirations: u64,
    /// Entries removed by an explicit delete
    pub deletions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current number of aliases in the cache
    pub total_aliases: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_deletion(&mut self) {
        self.deletions += 1;
    }

    // == Update Counts ==
    pub fn set_totals(&mut self, entries: usize, aliases: usize) {
        self.total_entries = entries;
        self.total_aliases = aliases;
    }
}
