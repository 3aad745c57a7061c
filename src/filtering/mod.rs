//! # Declarative Filters
//!
//! A listing declares its filters once, in order, as a [`FilterRegistry`].
//! Each filter pairs an [`Activation`] (does it apply to this request?) with
//! an [`ApplyFilter`] (how does it narrow the query?). At request time
//! [`FilterRegistry::execute`] walks the registry and threads a
//! [`FilterQuery`](crate::query::FilterQuery) through every active filter.
//!
//! ```rust,ignore
//! let filters = FilterRegistry::<course::Entity>::new()
//!     .register(
//!         "department_code",
//!         ParamPresent::new("department_code"),
//!         Membership::new("department_code", "departments.code").joining("departments"),
//!     )
//!     .register("search", SearchTermsPresent::new("search"), TextSearch::new("search"))
//!     .register_any("id_or_department_id", &["id", "department_id"])
//!     .register(
//!         "include_sections",
//!         FlagsSet::new(&["show_sections"]),
//!         IncludeRelated::new("sections"),
//!     );
//! ```
//!
//! Both traits are implemented for plain closures, so one-off rules do not
//! need a named type.

mod activation;
mod apply;
mod matcher;
mod registry;
mod search;

pub use activation::{Activation, AllOf, Always, AnyParamPresent, FlagsSet, ParamPresent, SearchTermsPresent};
pub use apply::{ApplyFilter, IncludeRelated, Membership, TextSearch};
pub use matcher::MultiFieldMatcher;
pub use registry::{FilterDefinition, FilterRegistry};
pub use search::{normalize_search, normalize_search_with};
