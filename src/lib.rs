//! Declarative request filtering for listing endpoints.
//!
//! A listing declares an ordered [`FilterRegistry`]; each request turns its
//! query string into a [`RequestContext`], runs the active filters over a
//! [`FilterQuery`] and, when the [`CacheGate`] allows it, serves the rendered
//! response from a [`CacheBackend`].
//!
//! ```rust,ignore
//! let app = Router::new().merge(
//!     filtercrate::courses::router(db, Arc::new(MemoryBackend::new()))?,
//! );
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod courses;
pub mod errors;
pub mod filtering;
pub mod query;
pub mod routes;

pub use cache::{CacheBackend, CacheDecision, CacheGate, CacheKey, CacheStatus, MemoryBackend};
pub use config::ListingConfig;
pub use context::{RequestContext, RequestFlags, RequestParams};
pub use errors::{ApiError, FilterError};
pub use filtering::{FilterDefinition, FilterRegistry};
pub use query::{FilterQuery, QuerySchema};
pub use routes::{ListingEndpoint, ListingResource};
