//! Apply rules: how an active filter narrows the query.

use sea_orm::EntityTrait;

use crate::config::SearchConfig;
use crate::context::RequestContext;
use crate::errors::FilterError;
use crate::query::FilterQuery;

use super::search::normalize_search_with;

/// Narrows a query using values from the request.
pub trait ApplyFilter<E: EntityTrait>: Send + Sync {
    /// # Errors
    ///
    /// A [`FilterError`] aborts composition for the whole request.
    fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError>;
}

impl<E, F> ApplyFilter<E> for F
where
    E: EntityTrait,
    F: Fn(FilterQuery<E>, &RequestContext) -> Result<FilterQuery<E>, FilterError> + Send + Sync,
{
    fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        self(query, ctx)
    }
}

/// `field IN (values of param)`, optionally joining a relation first.
#[derive(Debug, Clone)]
pub struct Membership {
    param: String,
    field: String,
    join: Option<String>,
}

impl Membership {
    pub fn new(param: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            field: field.into(),
            join: None,
        }
    }

    /// Join `relation` before filtering, for fields such as `sections.id`.
    #[must_use]
    pub fn joining(mut self, relation: impl Into<String>) -> Self {
        self.join = Some(relation.into());
        self
    }
}

impl<E: EntityTrait> ApplyFilter<E> for Membership {
    fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        let query = match &self.join {
            Some(relation) => query.join(relation)?,
            None => query,
        };
        let values = ctx.params.list(&self.param);
        if values.is_empty() {
            let raw = ctx.params.joined(&self.param).unwrap_or_default();
            return Err(FilterError::malformed(&self.param, raw, "at least one value"));
        }
        query
            .where_in(&self.field, &values)
            .map_err(|err| err.for_parameter(&self.param))
    }
}

/// Free-text search on the sanitized terms of a parameter.
#[derive(Debug, Clone)]
pub struct TextSearch {
    param: String,
    config: SearchConfig,
}

impl TextSearch {
    pub fn new(param: impl Into<String>) -> Self {
        Self::with_config(param, SearchConfig::default())
    }

    pub fn with_config(param: impl Into<String>, config: SearchConfig) -> Self {
        Self {
            param: param.into(),
            config,
        }
    }
}

impl<E: EntityTrait> ApplyFilter<E> for TextSearch {
    fn apply(&self, query: FilterQuery<E>, ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        let terms = ctx
            .params
            .joined(&self.param)
            .map(|input| normalize_search_with(&input, &self.config))
            .unwrap_or_default();
        query.search(&terms)
    }
}

/// Eagerly load a related collection with the result rows.
#[derive(Debug, Clone)]
pub struct IncludeRelated(String);

impl IncludeRelated {
    pub fn new(relation: impl Into<String>) -> Self {
        Self(relation.into())
    }
}

impl<E: EntityTrait> ApplyFilter<E> for IncludeRelated {
    fn apply(&self, query: FilterQuery<E>, _ctx: &RequestContext) -> Result<FilterQuery<E>, FilterError> {
        query.include_related(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestParams;
    use crate::courses::{self, course};
    use sea_orm::{DbBackend, Value};
    use std::sync::Arc;

    fn base() -> FilterQuery<course::Entity> {
        FilterQuery::new(Arc::new(courses::schema()))
    }

    fn ctx(pairs: &[(&str, &str)]) -> RequestContext {
        RequestContext::from_params(RequestParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_membership_joins_then_filters() {
        let rule = Membership::new("department_code", "departments.code").joining("departments");
        let query = rule
            .apply(base(), &ctx(&[("department_code", "BIO,CHEM")]))
            .unwrap();
        let sql = query.build(DbBackend::Sqlite).to_string();

        assert_eq!(query.joined(), &["departments"]);
        assert!(sql.contains(r#""departments"."code" IN ('BIO', 'CHEM')"#), "{sql}");
    }

    #[test]
    fn test_membership_reports_the_parameter() {
        let rule = Membership::new("section_id", "sections.id").joining("sections");
        let err = rule.apply(base(), &ctx(&[("section_id", "x1")])).unwrap_err();
        assert_eq!(err, FilterError::malformed("section_id", "x1", "an integer"));

        let err = rule.apply(base(), &ctx(&[("section_id", ",")])).unwrap_err();
        assert_eq!(err, FilterError::malformed("section_id", ",", "at least one value"));
    }

    #[test]
    fn test_text_search_uses_sanitized_terms() {
        let query = TextSearch::new("search")
            .apply(base(), &ctx(&[("search", "intro, bio!")]))
            .unwrap();
        let statement = query.build(DbBackend::Sqlite);
        let patterns: Vec<String> = statement
            .values
            .iter()
            .flat_map(|values| values.0.iter())
            .filter_map(|value| match value {
                Value::String(Some(s)) => Some(s.to_string()),
                _ => None,
            })
            .collect();

        assert!(patterns.contains(&"%INTRO%".to_string()), "{patterns:?}");
        assert!(patterns.contains(&"%BIO%".to_string()), "{patterns:?}");
        assert!(patterns.iter().all(|p| !p.contains('!') && !p.contains(',')), "{patterns:?}");
    }

    #[test]
    fn test_include_related() {
        let query = IncludeRelated::new("sections").apply(base(), &ctx(&[])).unwrap();
        assert_eq!(query.includes(), &["sections"]);

        let err = IncludeRelated::new("periods").apply(base(), &ctx(&[])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilterTarget { .. }));
    }
}
