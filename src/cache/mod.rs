//! Cache Module
//!
//! Provides in-memory caching with scheduled expiration and alias lookup.

mod entry;
mod index;
mod stats;
mod store;


// Re-export public types
pub use entry::{deadline_after, CacheEntry};
pub use index::AliasIndex;
pub use stats::CacheStats;
pub use store::ExpiringCache;

// == Public Constants ==
/// Maximum allowed id or alias length in bytes, enforced by the HTTP layer
pub const MAX_ID_LENGTH: usize = 256;
