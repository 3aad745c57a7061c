//! # Courses Listing
//!
//! `GET /courses` over departments, courses and their sections, with the
//! filters below applied in this order:
//!
//! | filter | active when | effect |
//! |---|---|---|
//! | `section_id` | `section_id` present | join sections, `sections.id IN ..` |
//! | `department_code` | `department_code` present | join departments, `departments.code IN ..` |
//! | `search` | `search` has a word left after sanitizing | text search |
//! | `id_or_department_id` | `id` or `department_id` present | `id IN .. OR department_id IN ..` |
//! | `include_sections` | `show_sections` | load sections with each course |
//!
//! ```rust,ignore
//! let app = filtercrate::courses::router(db, Arc::new(MemoryBackend::new()))?;
//! let doc = filtercrate::courses::CoursesApi::openapi();
//! ```

pub mod course;
pub mod department;
mod models;
pub mod section;

pub use models::{CourseListing, CourseQuery, SectionListing};

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, LoaderTrait, QueryOrder, RelationTrait};
use std::sync::Arc;

use crate::cache::CacheBackend;
use crate::config::{CacheGateConfig, ListingConfig, SearchConfig};
use crate::context::{RequestContext, RequestFlags, RequestParams, param_flag};
use crate::errors::{ApiError, FilterError};
use crate::filtering::{
    FilterRegistry, FlagsSet, IncludeRelated, Membership, ParamPresent, SearchTermsPresent,
    TextSearch,
};
use crate::query::{FilterQuery, QuerySchema};
use crate::routes::{ListingEndpoint, ListingResource, get_all};

pub const SHOW_SECTIONS: &str = "show_sections";
pub const SHOW_PERIODS: &str = "show_periods";

const SECTIONS: &str = "sections";
const DEPARTMENTS: &str = "departments";

/// Fields and relations the course filters may reference.
#[must_use]
pub fn schema() -> QuerySchema {
    QuerySchema::of::<course::Entity>()
        .with_relation::<department::Entity>(DEPARTMENTS, || course::Relation::Department.def())
        .with_relation::<section::Entity>(SECTIONS, || course::Relation::Sections.def())
        .searchable(&[
            "title",
            "description",
            "code",
            "departments.name",
            "sections.instructor",
        ])
}

/// The course filters with default search limits.
#[must_use]
pub fn filters() -> FilterRegistry<course::Entity> {
    filters_with(&SearchConfig::default())
}

#[must_use]
pub fn filters_with(search: &SearchConfig) -> FilterRegistry<course::Entity> {
    FilterRegistry::new()
        .register(
            "section_id",
            ParamPresent::new("section_id"),
            Membership::new("section_id", "sections.id").joining(SECTIONS),
        )
        .register(
            "department_code",
            ParamPresent::new("department_code"),
            Membership::new("department_code", "departments.code").joining(DEPARTMENTS),
        )
        .register(
            "search",
            SearchTermsPresent::with_config("search", search.clone()),
            TextSearch::with_config("search", search.clone()),
        )
        .register_any("id_or_department_id", &["id", "department_id"])
        .register(
            "include_sections",
            FlagsSet::new(&[SHOW_SECTIONS]),
            IncludeRelated::new(SECTIONS),
        )
}

/// Cache per `department_id`, only for fully rendered listings.
#[must_use]
pub fn cache_config() -> CacheGateConfig {
    CacheGateConfig {
        enabled: true,
        sharding_param: "department_id".to_string(),
        required_flags: vec![SHOW_SECTIONS.to_string(), SHOW_PERIODS.to_string()],
        key_prefix: "courses".to_string(),
        key_version: 1,
    }
}

/// `show_sections` and `show_periods`, both on unless switched off.
#[must_use]
pub fn prepare_flags(params: &RequestParams) -> RequestFlags {
    RequestFlags::new()
        .with(SHOW_SECTIONS, param_flag(params, SHOW_SECTIONS, true))
        .with(SHOW_PERIODS, param_flag(params, SHOW_PERIODS, true))
}

pub struct Courses;

#[async_trait]
impl ListingResource for Courses {
    type EntityType = course::Entity;
    type Item = CourseListing;

    const RESOURCE_NAME_PLURAL: &'static str = "courses";

    fn schema() -> QuerySchema {
        schema()
    }

    fn filters(config: &ListingConfig) -> FilterRegistry<course::Entity> {
        filters_with(&config.search)
    }

    fn default_config() -> ListingConfig {
        ListingConfig {
            cache: cache_config(),
            search: SearchConfig::default(),
        }
    }

    fn prepare_flags(params: &RequestParams) -> RequestFlags {
        prepare_flags(params)
    }

    async fn load(
        db: &DatabaseConnection,
        query: FilterQuery<course::Entity>,
        ctx: &RequestContext,
    ) -> Result<Vec<CourseListing>, DbErr> {
        let include_sections = query.is_included(SECTIONS);
        let courses = query
            .into_select()
            .order_by_asc(course::Column::Id)
            .all(db)
            .await?;

        if !include_sections {
            return Ok(courses.into_iter().map(CourseListing::from).collect());
        }

        let sections = courses
            .load_many(
                section::Entity::find().order_by_asc(section::Column::Id),
                db,
            )
            .await?;
        let show_periods = ctx.flag(SHOW_PERIODS);

        Ok(courses
            .into_iter()
            .zip(sections)
            .map(|(model, sections)| CourseListing {
                sections: Some(
                    sections
                        .into_iter()
                        .map(|section| SectionListing::render(section, show_periods))
                        .collect(),
                ),
                ..CourseListing::from(model)
            })
            .collect())
    }
}

/// Router serving `GET /courses` with the default course settings.
///
/// # Errors
///
/// `InvalidFilterTarget` if the course schema is inconsistent.
pub fn router(db: DatabaseConnection, cache: Arc<dyn CacheBackend>) -> Result<Router, FilterError> {
    router_with(db, &Courses::default_config(), cache)
}

/// # Errors
///
/// `InvalidFilterTarget` if the course schema is inconsistent.
pub fn router_with(
    db: DatabaseConnection,
    config: &ListingConfig,
    cache: Arc<dyn CacheBackend>,
) -> Result<Router, FilterError> {
    let endpoint = ListingEndpoint::<Courses>::new(db, config, cache)?;
    Ok(Router::new()
        .route(&format!("/{}", Courses::RESOURCE_NAME_PLURAL), get(list_courses))
        .with_state(endpoint))
}

/// List courses.
///
/// # Errors
///
/// As [`get_all`].
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseQuery),
    responses(
        (
            status = axum::http::StatusCode::OK,
            description = "Matching courses in id order",
            body = Vec<CourseListing>,
            headers(("x-cache" = String, description = "HIT, MISS or BYPASS"))
        ),
        (status = axum::http::StatusCode::BAD_REQUEST, description = "A parameter value could not be used"),
        (status = axum::http::StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "get_all_courses",
    summary = "List courses"
)]
pub async fn list_courses(
    state: State<ListingEndpoint<Courses>>,
    query: Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    get_all::<Courses>(state, query).await
}

/// OpenAPI document for the courses listing.
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(list_courses),
    components(schemas(CourseListing, SectionListing))
)]
pub struct CoursesApi;
