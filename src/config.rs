//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::throttle::{DEFAULT_RESEND_LIMIT, DEFAULT_RESEND_WINDOW};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default lifetime in seconds for entries without explicit TTL, 0 = never
    pub default_expiration: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Stats report interval in seconds, 0 = disabled
    pub stats_report_interval: u64,
    /// Verification-code resends allowed per window
    pub resend_limit: u32,
    /// Resend window in seconds
    pub resend_window: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_EXPIRATION` - Default entry lifetime in seconds (default: 3600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STATS_REPORT_INTERVAL` - Stats log frequency in seconds (default: 3600)
    /// - `RESEND_LIMIT` - Resends per window (default: 3)
    /// - `RESEND_WINDOW` - Resend window in seconds (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_expiration: parse_env("DEFAULT_EXPIRATION")
                .unwrap_or(defaults.default_expiration),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            stats_report_interval: parse_env("STATS_REPORT_INTERVAL")
                .unwrap_or(defaults.stats_report_interval),
            resend_limit: parse_env("RESEND_LIMIT").unwrap_or(defaults.resend_limit),
            resend_window: parse_env("RESEND_WINDOW").unwrap_or(defaults.resend_window),
        }
    }

    /// Default cache lifetime, None when entries never expire by default.
    pub fn default_expiration(&self) -> Option<Duration> {
        (self.default_expiration > 0).then(|| Duration::from_secs(self.default_expiration))
    }

    pub fn stats_report_interval(&self) -> Option<Duration> {
        (self.stats_report_interval > 0).then(|| Duration::from_secs(self.stats_report_interval))
    }

    pub fn resend_window(&self) -> Duration {
        Duration::from_secs(self.resend_window)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_expiration: 3600,
            server_port: 3000,
            stats_report_interval: 3600,
            resend_limit: DEFAULT_RESEND_LIMIT,
            resend_window: DEFAULT_RESEND_WINDOW.as_secs(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
