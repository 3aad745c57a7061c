//! # Response Cache Gate
//!
//! A listing response is cached only when [`CacheGate::decide`] says so. The
//! gate looks at the sharding parameter and the derived request flags, never
//! at the database. Storage sits behind [`CacheBackend`]; [`MemoryBackend`]
//! covers single-process deployments and tests.

mod backend;
mod gate;
mod key;

pub use backend::{CacheBackend, CacheError, MemoryBackend};
pub use gate::{CacheDecision, CacheGate};
pub use key::CacheKey;

/// How a listing response was produced, reported in the `x-cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Replayed from the backend.
    Hit,
    /// Computed fresh and stored.
    Miss,
    /// Computed fresh, not cacheable.
    Bypass,
}

impl CacheStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// Response header carrying the [`CacheStatus`].
pub const CACHE_STATUS_HEADER: &str = "x-cache";
