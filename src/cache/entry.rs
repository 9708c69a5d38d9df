//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with expiration support.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

// == Cache Entry ==
/// A stored value with its expiration metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
    /// Absolute expiration, None = never evicted automatically
    pub expires_at: Option<DateTime<Utc>>,
    /// Insert that produced this entry; eviction jobs carry it
    pub(crate) generation: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub fn new(
        value: V,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        generation: u64,
    ) -> Self {
        Self {
            value,
            created_at,
            expires_at,
            generation,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining lifetime, `Some(ZERO)` once expired, None without expiration.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| (expires - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

// == Utility Functions ==
/// Absolute time `lifetime` after `now`. None if it cannot be represented.
pub fn deadline_after(now: DateTime<Utc>, lifetime: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(lifetime)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_expiration() {
        let entry = CacheEntry::new("session", Utc::now(), None, 1);

        assert_eq!(entry.value, "session");
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_with_expiration() {
        let now = Utc::now();
        let expires = deadline_after(now, Duration::from_secs(10));
        let entry = CacheEntry::new(5u32, now, expires, 1);

        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = CacheEntry::new("code", now, Some(now), 1);

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_deadline_after_overflow() {
        assert!(deadline_after(Utc::now(), Duration::MAX).is_none());
    }
}
