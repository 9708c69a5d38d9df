//! Expiring Cache Module
//!
//! Primary map, alias index and eviction jobs behind one lock, with each
//! expiring entry evicted by its own scheduled job.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{deadline_after, AliasIndex, CacheEntry, CacheStats};
use crate::error::ScheduleError;
use crate::schedule::{JobHandle, JobSignal, JobSpec, Scheduler};

// == Cache State ==
/// Everything the lock guards. Eviction callbacks and public operations
/// always take the whole unit.
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    aliases: AliasIndex,
    jobs: HashMap<String, JobHandle>,
    stats: CacheStats,
    next_generation: u64,
    closed: bool,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            aliases: AliasIndex::new(),
            jobs: HashMap::new(),
            stats: CacheStats::new(),
            next_generation: 0,
            closed: false,
        }
    }

    /// Primary id first, then alias. Entries past their expiration are
    /// treated as absent even if their eviction job has not run yet.
    fn lookup(&self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry<V>> {
        self.entries
            .get(key)
            .or_else(|| {
                self.aliases
                    .primary_of(key)
                    .and_then(|primary| self.entries.get(primary))
            })
            .filter(|entry| !entry.is_expired_at(now))
    }

    /// Live entry stored under primary `id`, ignoring aliases.
    fn primary_mut(&mut self, id: &str, now: DateTime<Utc>) -> Option<&mut CacheEntry<V>> {
        self.entries
            .get_mut(id)
            .filter(|entry| !entry.is_expired_at(now))
    }

    fn lookup_mut(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut CacheEntry<V>> {
        let primary = if self.entries.contains_key(key) {
            key.to_string()
        } else {
            self.aliases.primary_of(key)?.to_string()
        };
        self.entries
            .get_mut(&primary)
            .filter(|entry| !entry.is_expired_at(now))
    }

    /// Removes an entry, its aliases and its eviction job.
    fn remove(&mut self, id: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(id)?;
        self.aliases.remove_primary(id);
        if let Some(job) = self.jobs.remove(id) {
            job.cancel();
        }
        self.refresh_totals();
        Some(entry)
    }

    /// Eviction callback body. A generation mismatch means the entry was
    /// replaced after this job was armed.
    fn expire(&mut self, id: &str, generation: u64) {
        match self.entries.get(id) {
            Some(entry) if entry.generation == generation => {}
            _ => return,
        }
        self.remove(id);
        self.stats.record_expiration();
        debug!("Cache entry [{}] expired", id);
    }

    fn refresh_totals(&mut self) {
        self.stats
            .set_totals(self.entries.len(), self.aliases.len());
    }
}

// == Expiring Cache ==
/// In-memory map from id to value with per-entry expiration and alias lookup.
///
/// Clones share the same storage. Lookups never fail; absence is `None`.
pub struct ExpiringCache<V> {
    state: Arc<Mutex<CacheState<V>>>,
    scheduler: Scheduler,
    default_expiration: Option<Duration>,
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            scheduler: self.scheduler.clone(),
            default_expiration: self.default_expiration,
        }
    }
}

impl<V> fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ExpiringCache")
            .field("entries", &state.entries.len())
            .field("aliases", &state.aliases.len())
            .field("default_expiration", &self.default_expiration)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<V: Send + 'static> ExpiringCache<V> {
    // == Constructor ==
    /// Creates a cache whose eviction jobs run on `scheduler`.
    ///
    /// # Arguments
    /// * `default_expiration` - Lifetime for inserts without an explicit
    ///   duration. None or zero means entries never expire by default.
    pub fn new(scheduler: Scheduler, default_expiration: Option<Duration>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new())),
            scheduler,
            default_expiration,
        }
    }

    // == Insert ==
    /// Stores `value` under `id`, replacing any live entry and its eviction
    /// job. Aliases already bound to `id` keep resolving to it.
    ///
    /// The effective lifetime is `duration`, else the default, else none; a
    /// zero lifetime never expires.
    ///
    /// Returns false when the value was dropped: the cache or its scheduler
    /// is closed, or the lifetime cannot be represented as a deadline.
    pub fn insert(&self, id: impl Into<String>, value: V, duration: Option<Duration>) -> bool {
        let mut state = self.state.lock();
        self.store(&mut state, id.into(), value, duration)
    }

    fn store(
        &self,
        state: &mut CacheState<V>,
        id: String,
        value: V,
        duration: Option<Duration>,
    ) -> bool {
        if state.closed {
            warn!("Insert of [{}] into a closed cache ignored", id);
            return false;
        }

        let now = Utc::now();
        let lifetime = duration
            .or(self.default_expiration)
            .filter(|lifetime| !lifetime.is_zero());
        let expires_at = match lifetime {
            Some(lifetime) => match deadline_after(now, lifetime) {
                Some(at) => Some(at),
                None => {
                    warn!("Insert of [{}] ignored, lifetime {:?} out of range", id, lifetime);
                    return false;
                }
            },
            None => None,
        };

        if let Some(stale) = state.jobs.remove(&id) {
            stale.cancel();
        }
        state.next_generation += 1;
        let generation = state.next_generation;

        if let Some(at) = expires_at {
            match self.arm_eviction(&id, generation, at) {
                Ok(job) => {
                    state.jobs.insert(id.clone(), job);
                }
                Err(err @ ScheduleError::NotInFuture { .. }) => {
                    debug!("Cache entry [{}] expired on arrival: {}", id, err);
                    state.remove(&id);
                    return false;
                }
                Err(err) => {
                    warn!("Cache entry [{}] dropped, eviction not armed: {}", id, err);
                    state.remove(&id);
                    return false;
                }
            }
        }

        state
            .entries
            .insert(id, CacheEntry::new(value, now, expires_at, generation));
        state.refresh_totals();
        true
    }

    fn arm_eviction(
        &self,
        id: &str,
        generation: u64,
        at: DateTime<Utc>,
    ) -> Result<JobHandle, ScheduleError> {
        let state: Weak<Mutex<CacheState<V>>> = Arc::downgrade(&self.state);
        let key = id.to_string();
        let spec = JobSpec::new(at, move || {
            if let Some(state) = state.upgrade() {
                state.lock().expire(&key, generation);
            }
            Ok(JobSignal::Continue)
        })
        .call_limit(1)
        .marker(format!("{id}_object_expiration"))
        .silent();
        self.scheduler.start(spec)
    }

    // == Add Alias ==
    /// Registers `alias` as a secondary key for `id`.
    ///
    /// Returns false and binds nothing when `id` has no live entry. Rebinding
    /// an existing alias moves it to `id`.
    pub fn add_alias(&self, id: &str, alias: impl Into<String>) -> bool {
        let alias = alias.into();
        let mut state = self.state.lock();
        let live = state
            .entries
            .get(id)
            .is_some_and(|entry| !entry.is_expired());
        if !live {
            debug!("Alias [{}] not bound, no entry [{}]", alias, id);
            return false;
        }
        state.aliases.bind(&alias, id);
        state.refresh_totals();
        true
    }

    // == Get ==
    /// Returns a copy of the value for a primary id or alias.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let mut state = self.state.lock();
        let value = state.lookup(key, Utc::now()).map(|entry| entry.value.clone());
        if value.is_some() {
            state.stats.record_hit();
        } else {
            state.stats.record_miss();
        }
        value
    }

    /// Returns a copy of the whole entry, value and expiration read together.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>>
    where
        V: Clone,
    {
        let mut state = self.state.lock();
        let entry = state.lookup(key, Utc::now()).cloned();
        if entry.is_some() {
            state.stats.record_hit();
        } else {
            state.stats.record_miss();
        }
        entry
    }

    // == Update ==
    /// Runs `f` on the stored value in place. Later lookups see the change.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut state = self.state.lock();
        let result = state
            .lookup_mut(key, Utc::now())
            .map(|entry| f(&mut entry.value));
        if result.is_some() {
            state.stats.record_hit();
        } else {
            state.stats.record_miss();
        }
        result
    }

    /// Runs `f` on the live value stored under primary `id`, or on `init()`
    /// which is then stored with `duration`. Both paths happen under one lock
    /// acquisition. Aliases are not resolved: an alias named `id` is shadowed
    /// by the new primary entry.
    ///
    /// Returns None only if the new value could not be stored.
    pub fn upsert<R>(
        &self,
        id: impl Into<String>,
        duration: Option<Duration>,
        init: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> Option<R> {
        let id = id.into();
        let mut state = self.state.lock();
        if let Some(entry) = state.primary_mut(&id, Utc::now()) {
            return Some(f(&mut entry.value));
        }

        let mut value = init();
        let result = f(&mut value);
        self.store(&mut state, id, value, duration).then_some(result)
    }

    // == Expiration Time ==
    /// Absolute expiration for a primary id or alias. None if the entry is
    /// missing or never expires.
    pub fn expiration_time(&self, key: &str) -> Option<DateTime<Utc>> {
        let state = self.state.lock();
        state
            .lookup(key, Utc::now())
            .and_then(|entry| entry.expires_at)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().lookup(key, Utc::now()).is_some()
    }

    // == Delete ==
    /// Removes the entry stored under primary `id`, every alias pointing at
    /// it and its eviction job. Returns false if there was no entry.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.remove(id).is_some();
        if removed {
            state.stats.record_deletion();
            debug!("Cache entry [{}] deleted", id);
        }
        removed
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    // == Close ==
    /// Cancels every pending eviction job without running it and drops all
    /// entries. Later inserts are ignored.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;

        let jobs: Vec<JobHandle> = state.jobs.drain().map(|(_, job)| job).collect();
        for job in &jobs {
            job.cancel();
        }
        state.entries.clear();
        state.aliases.clear();
        state.refresh_totals();
        info!("Cache closed, {} eviction jobs cancelled", jobs.len());
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
