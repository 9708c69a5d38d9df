//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats};

/// Response body for GET /entries/:id
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    /// The requested id or alias
    pub id: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    /// Absolute expiration, null when the entry never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole seconds left before expiration
    pub ttl_remaining: Option<u64>,
}

impl EntryResponse {
    pub fn from_entry(id: impl Into<String>, entry: CacheEntry<Value>) -> Self {
        let ttl_remaining = entry.ttl_remaining().map(|left| left.as_secs());
        Self {
            id: id.into(),
            value: entry.value,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            ttl_remaining,
        }
    }
}

/// Response body for PUT /entries
#[derive(Debug, Clone, Serialize)]
pub struct InsertResponse {
    pub message: String,
    pub id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl InsertResponse {
    pub fn new(id: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        let id = id.into();
        Self {
            message: format!("Id '{}' stored successfully", id),
            id,
            expires_at,
        }
    }
}

/// Response body for DELETE /entries/:id
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

impl DeleteResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Id '{}' deleted successfully", id),
            id,
        }
    }
}

/// Response body for PUT /entries/:id/aliases
#[derive(Debug, Clone, Serialize)]
pub struct AliasResponse {
    pub message: String,
    pub id: String,
    pub alias: String,
}

impl AliasResponse {
    pub fn new(id: impl Into<String>, alias: impl Into<String>) -> Self {
        let id = id.into();
        let alias = alias.into();
        Self {
            message: format!("Alias '{}' bound to '{}'", alias, id),
            id,
            alias,
        }
    }
}

/// Response body for POST /verification/:token/resend
#[derive(Debug, Clone, Serialize)]
pub struct ResendResponse {
    pub token: String,
    /// Resends in the current window, including this one
    pub resend_count: u32,
    /// Resends still allowed in the current window
    pub remaining: u32,
}

impl ResendResponse {
    pub fn new(token: impl Into<String>, resend_count: u32, limit: u32) -> Self {
        Self {
            token: token.into(),
            resend_count,
            remaining: limit.saturating_sub(resend_count),
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub deletions: u64,
    pub total_entries: usize,
    pub total_aliases: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Jobs armed on the scheduler, eviction jobs included
    pub scheduled_jobs: usize,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, scheduled_jobs: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            deletions: stats.deletions,
            total_entries: stats.total_entries,
            total_aliases: stats.total_aliases,
            hit_rate: stats.hit_rate(),
            scheduled_jobs,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
