#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use filtercrate::courses::{self, CourseListing, Courses, course, department, section};
use filtercrate::{CacheBackend, ListingResource, MemoryBackend};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Schema, Set};
use sea_orm_migration::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed(&db).await?;

    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection, cache: Arc<dyn CacheBackend>) -> Router {
    let courses = courses::router(db, cache).expect("course schema should be valid");
    Router::new().nest("/api/v1", courses)
}

/// Course listing with the cache gate switched off, so every request runs
/// the filters.
pub fn setup_uncached_app(db: DatabaseConnection) -> Router {
    let mut config = Courses::default_config();
    config.cache.enabled = false;
    let courses = courses::router_with(db, &config, Arc::new(MemoryBackend::new()))
        .expect("course schema should be valid");
    Router::new().nest("/api/v1", courses)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Status, `x-cache` header and raw body of a GET request.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let cache = response
        .headers()
        .get("x-cache")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, cache, body)
}

/// GET a course listing that must succeed, returning its items.
pub async fn list(app: &Router, query: &str) -> Vec<CourseListing> {
    let (status, _, body) = get(app, &format!("/api/v1/courses{query}")).await;
    assert_eq!(
        status,
        StatusCode::OK,
        "{query}: {}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).unwrap()
}

pub fn ids(items: &[CourseListing]) -> Vec<i32> {
    items.iter().map(|course| course.id).collect()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCourseTables)]
    }
}

pub struct CreateCourseTables;

#[async_trait::async_trait]
impl MigrationName for CreateCourseTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_course_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCourseTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(department::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(course::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(section::Entity))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["sections", "courses", "departments"] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Departments 1, 2, 7 and 10 with eight courses and eight sections.
///
/// For `department_id=10&search=intro bio` the matches are course 4 (title)
/// and course 8 (description plus section instructor); course 8 has two
/// sections with the same instructor. Courses 5 and 7 have no sections.
pub async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for (id, code, name) in [
        (1, "BIO", "Biology"),
        (2, "CHEM", "Chemistry"),
        (7, "MATH", "Mathematics"),
        (10, "HIST", "History"),
    ] {
        department::ActiveModel {
            id: Set(id),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
        }
        .insert(db)
        .await?;
    }

    for (id, department_id, code, title, description) in [
        (1, 1, "BIO101", "Intro Biology", "Cells and organisms"),
        (2, 1, "BIO201", "Genetics", "Inheritance and variation"),
        (3, 2, "CHEM101", "Intro Chemistry", "Atoms and bonds"),
        (4, 10, "HIST110", "Intro to the History of Biology", "Ideas through time"),
        (5, 2, "CHEM210", "Organic Chemistry", "Carbon compounds"),
        (6, 7, "MATH101", "Algebra II", "Polynomials and 100% of factoring"),
        (7, 10, "HIST120", "Modern Europe", "The twentieth century"),
        (8, 10, "HIST130", "Ancient World", "Introductory survey"),
    ] {
        course::ActiveModel {
            id: Set(id),
            department_id: Set(department_id),
            code: Set(code.to_string()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
        }
        .insert(db)
        .await?;
    }

    for (id, course_id, number, instructor, periods) in [
        (1, 1, "001", "Ada Lovelace", "MWF 09:00-09:50"),
        (2, 1, "002", "Grace Hopper", "TR 10:00-11:15"),
        (3, 3, "001", "Marie Curie", "MWF 11:00-11:50"),
        (4, 4, "001", "Carl Sagan", "TR 13:00-14:15"),
        (5, 8, "001", "Ana Biondi", "MW 15:00-16:15; F 09:00-09:50"),
        (6, 8, "002", "Ana Biondi", "F 10:00-11:50"),
        (7, 6, "001", "Emmy Noether", "MWF 08:00-08:50"),
        (8, 2, "001", "Gregor Mendel", "TR 08:30-09:45"),
    ] {
        section::ActiveModel {
            id: Set(id),
            course_id: Set(course_id),
            number: Set(number.to_string()),
            instructor: Set(instructor.to_string()),
            periods: Set(periods.to_string()),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}
