//! Resend Throttle
//!
//! Counts verification-code resends per user token inside a fixed window and
//! rejects requests past the limit until the window's entry expires.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::ExpiringCache;
use crate::schedule::Scheduler;

/// Resends allowed per window
pub const DEFAULT_RESEND_LIMIT: u32 = 3;

/// Window length
pub const DEFAULT_RESEND_WINDOW: Duration = Duration::from_secs(60 * 60);

// == Resend History ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResendHistory {
    pub resend_count: u32,
}

// == Resend Decision ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendDecision {
    /// Request may proceed; `resend_count` includes this request
    Allowed { resend_count: u32 },
    /// Limit exhausted; the window resets after `retry_in`
    Throttled { retry_in: Duration },
}

// == Resend Throttle ==
#[derive(Debug, Clone)]
pub struct ResendThrottle {
    history: ExpiringCache<ResendHistory>,
    limit: u32,
    window: Duration,
}

impl ResendThrottle {
    // == Constructor ==
    pub fn new(scheduler: Scheduler, limit: u32, window: Duration) -> Self {
        Self {
            history: ExpiringCache::new(scheduler, Some(window)),
            limit,
            window,
        }
    }

    fn cache_id(token: &str) -> String {
        format!("email_verification_history_{token}")
    }

    // == Register ==
    /// Records one resend for `token` and decides whether it may proceed.
    ///
    /// The window starts at the first resend and is not extended by later
    /// ones.
    pub fn register(&self, token: &str) -> ResendDecision {
        let id = Self::cache_id(token);
        let count = self.history.upsert(
            id.clone(),
            Some(self.window),
            ResendHistory::default,
            |history| {
                history.resend_count += 1;
                history.resend_count
            },
        );

        match count {
            Some(resend_count) if resend_count > self.limit => {
                let retry_in = self
                    .history
                    .expiration_time(&id)
                    .and_then(|at| (at - Utc::now()).to_std().ok())
                    .unwrap_or(Duration::ZERO);
                debug!(
                    "Resend for [{}] throttled, retry in {:?}",
                    token, retry_in
                );
                ResendDecision::Throttled { retry_in }
            }
            Some(resend_count) => ResendDecision::Allowed { resend_count },
            None => {
                // Only reachable after close.
                warn!("Resend history for [{}] unavailable", token);
                ResendDecision::Allowed { resend_count: 1 }
            }
        }
    }

    // == Reset ==
    /// Forgets the history for `token`, e.g. after a successful verification.
    pub fn reset(&self, token: &str) -> bool {
        self.history.delete(&Self::cache_id(token))
    }

    pub fn resend_count(&self, token: &str) -> u32 {
        self.history
            .get(&Self::cache_id(token))
            .map_or(0, |history| history.resend_count)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn close(&self) {
        self.history.close();
    }
}
