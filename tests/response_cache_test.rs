use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use filtercrate::cache::{CacheError, CacheKey};
use filtercrate::courses::{self, CourseListing, Courses, course};
use filtercrate::filtering::Always;
use filtercrate::{
    CacheBackend, CacheStatus, FilterError, FilterQuery, FilterRegistry, ListingConfig,
    ListingEndpoint, ListingResource, MemoryBackend, QuerySchema, RequestContext, RequestFlags,
    RequestParams,
};
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;
use common::{get, ids, setup_test_app, setup_test_db};

async fn cached_app() -> (axum::Router, MemoryBackend) {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let backend = MemoryBackend::new();
    (setup_test_app(db, Arc::new(backend.clone())), backend)
}

fn parse(body: &[u8]) -> Vec<CourseListing> {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_second_request_is_a_hit() {
    let (app, backend) = cached_app().await;

    let (status, cache, first) = get(&app, "/api/v1/courses?department_id=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(ids(&parse(&first)), vec![4, 7, 8]);

    let (status, cache, second) = get(&app, "/api/v1/courses?department_id=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert_eq!(first, second);

    assert_eq!(backend.len(), 1);
    assert_eq!(backend.write_count(), 1);
    assert_eq!(backend.hit_count(), 1);
}

#[tokio::test]
async fn test_department_and_search_is_cached_under_department() {
    let (app, backend) = cached_app().await;

    let (status, cache, body) =
        get(&app, "/api/v1/courses?department_id=10&search=intro%20bio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(ids(&parse(&body)), vec![4, 8]);

    let key = CacheKey::new("courses", 1, "department_id", "10");
    assert_eq!(backend.get(&key).await.unwrap(), Some(Bytes::from(body)));
}

#[tokio::test]
async fn test_key_ignores_secondary_filters() {
    let (app, _backend) = cached_app().await;

    let (_, _, plain) = get(&app, "/api/v1/courses?department_id=10").await;
    let (_, cache, searched) = get(&app, "/api/v1/courses?department_id=10&search=modern").await;

    // The stored department listing is replayed for the narrower request.
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert_eq!(plain, searched);
}

#[tokio::test]
async fn test_requests_without_shard_or_flags_bypass() {
    let (app, backend) = cached_app().await;

    for uri in [
        "/api/v1/courses",
        "/api/v1/courses?search=intro",
        "/api/v1/courses?department_id=10&show_periods=false",
        "/api/v1/courses?department_id=10&show_sections=no",
    ] {
        let (status, cache, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(cache.as_deref(), Some("BYPASS"), "{uri}");
    }

    assert!(backend.is_empty());
    assert_eq!(backend.read_count(), 0);
}

#[tokio::test]
async fn test_each_shard_value_has_its_own_entry() {
    let (app, backend) = cached_app().await;

    let (_, _, history) = get(&app, "/api/v1/courses?department_id=10").await;
    let (_, cache, chemistry) = get(&app, "/api/v1/courses?department_id=2").await;

    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_ne!(history, chemistry);
    assert_eq!(ids(&parse(&chemistry)), vec![3, 5]);
    assert_eq!(backend.len(), 2);
}

static FILTER_RUNS: AtomicUsize = AtomicUsize::new(0);

/// The course listing with an extra filter that counts executions.
struct CountedCourses;

#[async_trait]
impl ListingResource for CountedCourses {
    type EntityType = course::Entity;
    type Item = CourseListing;

    const RESOURCE_NAME_PLURAL: &'static str = "courses";

    fn schema() -> QuerySchema {
        courses::schema()
    }

    fn filters(config: &ListingConfig) -> FilterRegistry<course::Entity> {
        courses::filters_with(&config.search).register(
            "count",
            Always,
            |query: FilterQuery<course::Entity>,
             _ctx: &RequestContext|
             -> Result<FilterQuery<course::Entity>, FilterError> {
                FILTER_RUNS.fetch_add(1, Ordering::SeqCst);
                Ok(query)
            },
        )
    }

    fn default_config() -> ListingConfig {
        Courses::default_config()
    }

    fn prepare_flags(params: &RequestParams) -> RequestFlags {
        courses::prepare_flags(params)
    }

    async fn load(
        db: &DatabaseConnection,
        query: FilterQuery<course::Entity>,
        ctx: &RequestContext,
    ) -> Result<Vec<CourseListing>, DbErr> {
        Courses::load(db, query, ctx).await
    }
}

#[tokio::test]
async fn test_hit_does_not_run_the_filters() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let endpoint = ListingEndpoint::<CountedCourses>::new(
        db,
        &CountedCourses::default_config(),
        Arc::new(MemoryBackend::new()),
    )
    .unwrap();
    let ctx = ListingEndpoint::<CountedCourses>::context([("department_id", "7")]);

    let (first, status) = endpoint.respond(&ctx).await.unwrap();
    assert_eq!(status, CacheStatus::Miss);
    assert_eq!(FILTER_RUNS.load(Ordering::SeqCst), 1);

    let (second, status) = endpoint.respond(&ctx).await.unwrap();
    assert_eq!(status, CacheStatus::Hit);
    assert_eq!(FILTER_RUNS.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

/// A backend whose every operation fails.
struct UnavailableBackend;

#[async_trait]
impl CacheBackend for UnavailableBackend {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::new("get", "connection refused"))
    }

    async fn set(&self, _key: &CacheKey, _value: Bytes) -> Result<(), CacheError> {
        Err(CacheError::new("set", "connection refused"))
    }
}

#[tokio::test]
async fn test_backend_failures_fall_back_to_fresh_responses() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db, Arc::new(UnavailableBackend));

    for _ in 0..2 {
        let (status, cache, body) = get(&app, "/api/v1/courses?department_id=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(ids(&parse(&body)), vec![3, 5]);
    }
}

#[tokio::test]
async fn test_disabled_gate_never_touches_the_backend() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let backend = MemoryBackend::new();
    let mut config = Courses::default_config();
    config.cache.enabled = false;
    let endpoint = ListingEndpoint::<Courses>::new(db, &config, Arc::new(backend.clone())).unwrap();

    let ctx = ListingEndpoint::<Courses>::context([("department_id", "10")]);
    let (_, status) = endpoint.respond(&ctx).await.unwrap();

    assert_eq!(status, CacheStatus::Bypass);
    assert_eq!(backend.read_count(), 0);
    assert!(backend.is_empty());
}
