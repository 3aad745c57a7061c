use sea_orm::EntityTrait;
use std::fmt;

use crate::context::RequestContext;
use crate::errors::FilterError;
use crate::query::FilterQuery;

use super::activation::Activation;
use super::apply::ApplyFilter;
use super::matcher::MultiFieldMatcher;

/// A named filter: when it applies and what it does.
pub struct FilterDefinition<E: EntityTrait> {
    name: String,
    activation: Box<dyn Activation>,
    apply: Box<dyn ApplyFilter<E>>,
}

impl<E: EntityTrait> FilterDefinition<E> {
    pub fn new(
        name: impl Into<String>,
        activation: impl Activation + 'static,
        apply: impl ApplyFilter<E> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            activation: Box::new(activation),
            apply: Box::new(apply),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_active(&self, ctx: &RequestContext) -> bool {
        self.activation.is_active(ctx)
    }

    /// # Errors
    ///
    /// Whatever the apply rule returns.
    pub fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        self.apply.apply(query, ctx)
    }
}

impl<E: EntityTrait> fmt::Debug for FilterDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered filters for one listing.
///
/// Filters run in registration order, which matters when a later filter
/// relies on a join made by an earlier one. The registry is built once with
/// the consuming `register*` methods and then shared (typically in an `Arc`);
/// nothing can change it after that.
///
/// ```rust,ignore
/// let registry = FilterRegistry::<course::Entity>::new()
///     .register(
///         "section_id",
///         ParamPresent::new("section_id"),
///         Membership::new("section_id", "sections.id").joining("sections"),
///     )
///     .register_any("id_or_department_id", &["id", "department_id"]);
///
/// let query = registry.execute(FilterQuery::new(schema), &ctx)?;
/// ```
pub struct FilterRegistry<E: EntityTrait> {
    filters: Vec<FilterDefinition<E>>,
}

impl<E: EntityTrait> Default for FilterRegistry<E> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<E: EntityTrait> FilterRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    #[must_use]
    pub fn register(
        mut self,
        name: impl Into<String>,
        activation: impl Activation + 'static,
        apply: impl ApplyFilter<E> + 'static,
    ) -> Self {
        self.filters
            .push(FilterDefinition::new(name, activation, apply));
        self
    }

    /// Append a multi-field matcher: active when any of `fields` is sent as
    /// a parameter, matching each present parameter against the field of
    /// the same name, ORed together.
    #[must_use]
    pub fn register_any<S: AsRef<str>>(self, name: impl Into<String>, fields: &[S]) -> Self {
        let matcher = MultiFieldMatcher::per_field(fields);
        let activation = matcher.activation();
        self.register(name, activation, matcher)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in application order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(FilterDefinition::name)
    }

    /// Names of the filters that would apply to `ctx`, in application order.
    #[must_use]
    pub fn active_names(&self, ctx: &RequestContext) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|definition| definition.is_active(ctx))
            .map(FilterDefinition::name)
            .collect()
    }

    /// Apply every active filter to `base`, in registration order.
    ///
    /// The first failing filter aborts composition and its error is returned;
    /// no partially filtered query escapes.
    ///
    /// # Errors
    ///
    /// The [`FilterError`] of the first filter that fails.
    pub fn execute(&self, base: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        let mut query = base;
        for definition in &self.filters {
            if !definition.is_active(ctx) {
                continue;
            }

            tracing::debug!(filter = %definition.name, "applying filter");
            query = definition.apply(query, ctx).map_err(|err| {
                tracing::debug!(filter = %definition.name, error = %err, "filter rejected request");
                err
            })?;
        }
        Ok(query)
    }
}

impl<E: EntityTrait> fmt::Debug for FilterRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
