//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{deadline_after, MAX_ID_LENGTH};

/// Request body for PUT /entries
///
/// # Fields
/// - `id`: Primary id to store the value under
/// - `value`: Any JSON document
/// - `ttl`: Optional lifetime in seconds; 0 = never expire, absent = default
#[derive(Debug, Clone, Deserialize)]
pub struct InsertRequest {
    pub id: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl InsertRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_id("Id", &self.id) {
            return Some(error);
        }
        match self.ttl {
            Some(ttl) if deadline_after(Utc::now(), Duration::from_secs(ttl)).is_none() => {
                Some(format!("Ttl of {ttl} seconds is out of range"))
            }
            _ => None,
        }
    }
}

/// Request body for PUT /entries/:id/aliases
#[derive(Debug, Clone, Deserialize)]
pub struct AliasRequest {
    pub alias: String,
}

impl AliasRequest {
    pub fn validate(&self) -> Option<String> {
        validate_id("Alias", &self.alias)
    }
}

fn validate_id(label: &str, id: &str) -> Option<String> {
    if id.is_empty() {
        return Some(format!("{label} cannot be empty"));
    }
    if id.len() > MAX_ID_LENGTH {
        return Some(format!(
            "{label} exceeds maximum length of {MAX_ID_LENGTH} bytes"
        ));
    }
    None
}
