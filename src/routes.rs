//! # Listing Endpoints
//!
//! [`ListingEndpoint`] ties a [`ListingResource`] to its filters, its cache
//! gate and a cache backend, and [`get_all`] serves it over axum:
//!
//! 1. query pairs become a [`RequestContext`] (params plus derived flags)
//! 2. the cache gate decides between replaying a stored response and
//!    computing a fresh one
//! 3. a fresh response runs the filter registry, loads the rows and
//!    serializes them to JSON
//!
//! Every response carries an `x-cache` header (`HIT`, `MISS` or `BYPASS`).

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::{CACHE_STATUS_HEADER, CacheBackend, CacheGate, CacheStatus};
use crate::config::ListingConfig;
use crate::context::{RequestContext, RequestFlags, RequestParams};
use crate::errors::{ApiError, FilterError};
use crate::filtering::FilterRegistry;
use crate::query::{FilterQuery, QuerySchema};

/// A collection that can be listed through [`get_all`].
#[async_trait]
pub trait ListingResource: Send + Sync + 'static {
    type EntityType: EntityTrait + Sync;
    type Item: Serialize + Send + Sync;

    /// Path segment the router mounts the listing under.
    const RESOURCE_NAME_PLURAL: &'static str;

    fn schema() -> QuerySchema;

    fn filters(config: &ListingConfig) -> FilterRegistry<Self::EntityType>;

    /// Settings used when the caller supplies none.
    fn default_config() -> ListingConfig {
        ListingConfig::default()
    }

    /// Boolean flags derived from the raw parameters, visible to filters and
    /// the cache gate.
    fn prepare_flags(_params: &RequestParams) -> RequestFlags {
        RequestFlags::default()
    }

    /// Run the filtered query and shape the rows for the response.
    async fn load(
        db: &DatabaseConnection,
        query: FilterQuery<Self::EntityType>,
        ctx: &RequestContext,
    ) -> Result<Vec<Self::Item>, DbErr>;
}

/// Everything a listing handler needs, shared between requests.
pub struct ListingEndpoint<T: ListingResource> {
    db: DatabaseConnection,
    schema: Arc<QuerySchema>,
    filters: Arc<FilterRegistry<T::EntityType>>,
    gate: CacheGate,
    cache: Arc<dyn CacheBackend>,
    resource: PhantomData<fn() -> T>,
}

impl<T: ListingResource> Clone for ListingEndpoint<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            schema: Arc::clone(&self.schema),
            filters: Arc::clone(&self.filters),
            gate: self.gate.clone(),
            cache: Arc::clone(&self.cache),
            resource: PhantomData,
        }
    }
}

impl<T: ListingResource> ListingEndpoint<T> {
    /// # Errors
    ///
    /// `InvalidFilterTarget` if the resource declares searchable fields its
    /// schema cannot resolve.
    pub fn new(
        db: DatabaseConnection,
        config: &ListingConfig,
        cache: Arc<dyn CacheBackend>,
    ) -> Result<Self, FilterError> {
        let schema = T::schema();
        schema.validate()?;

        let filters = T::filters(config);
        tracing::debug!(
            resource = T::RESOURCE_NAME_PLURAL,
            filters = ?filters,
            "listing endpoint ready"
        );

        Ok(Self {
            db,
            schema: Arc::new(schema),
            filters: Arc::new(filters),
            gate: CacheGate::from_config(&config.cache),
            cache,
            resource: PhantomData,
        })
    }

    #[must_use]
    pub fn filters(&self) -> &FilterRegistry<T::EntityType> {
        &self.filters
    }

    #[must_use]
    pub const fn gate(&self) -> &CacheGate {
        &self.gate
    }

    /// Build the request context for raw query pairs.
    pub fn context<I, K, V>(pairs: I) -> RequestContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let params = RequestParams::from_pairs(pairs);
        let flags = T::prepare_flags(&params);
        RequestContext::new(params, flags)
    }

    /// Produce the response body for `ctx`, from the cache when allowed.
    ///
    /// Cache backend failures are logged and fall through to a fresh
    /// response.
    ///
    /// # Errors
    ///
    /// Filter, database and serialization errors, as [`ApiError`].
    pub async fn respond(&self, ctx: &RequestContext) -> Result<(Bytes, CacheStatus), ApiError> {
        let decision = self.gate.decide(ctx);
        let Some(key) = decision.key() else {
            tracing::debug!(resource = T::RESOURCE_NAME_PLURAL, "cache bypass");
            return Ok((self.render(ctx).await?, CacheStatus::Bypass));
        };

        match self.cache.get(key).await {
            Ok(Some(body)) => {
                tracing::debug!(resource = T::RESOURCE_NAME_PLURAL, key = %key, "cache hit");
                return Ok((body, CacheStatus::Hit));
            }
            Ok(None) => {
                tracing::debug!(resource = T::RESOURCE_NAME_PLURAL, key = %key, "cache miss");
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache read failed, rendering fresh response");
            }
        }

        let body = self.render(ctx).await?;
        if let Err(err) = self.cache.set(key, body.clone()).await {
            tracing::warn!(key = %key, error = %err, "cache write failed");
        }
        Ok((body, CacheStatus::Miss))
    }

    /// Run the filters and load the rows, ignoring the cache.
    ///
    /// # Errors
    ///
    /// Filter, database and serialization errors, as [`ApiError`].
    pub async fn render(&self, ctx: &RequestContext) -> Result<Bytes, ApiError> {
        let query = self
            .filters
            .execute(FilterQuery::new(Arc::clone(&self.schema)), ctx)?;
        let items = T::load(&self.db, query, ctx).await?;

        serde_json::to_vec(&items).map(Bytes::from).map_err(|err| {
            ApiError::internal(
                format!("Failed to render {}", T::RESOURCE_NAME_PLURAL),
                Some(err.to_string()),
            )
        })
    }

    /// Router serving `GET /{RESOURCE_NAME_PLURAL}`.
    pub fn router(self) -> Router {
        Router::new()
            .route(&format!("/{}", T::RESOURCE_NAME_PLURAL), get(get_all::<T>))
            .with_state(self)
    }
}

/// List a resource, filtered by the query string.
///
/// # Errors
///
/// 400 for unusable parameter values, 500 for configuration and database
/// failures.
pub async fn get_all<T: ListingResource>(
    State(endpoint): State<ListingEndpoint<T>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let ctx = ListingEndpoint::<T>::context(pairs);
    let (body, status) = endpoint.respond(&ctx).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (HeaderName::from_static(CACHE_STATUS_HEADER), status.as_str()),
        ],
        body,
    )
        .into_response())
}
