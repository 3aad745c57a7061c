use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{course, section};

/// Query parameters accepted by `GET /courses`.
///
/// List parameters (`section_id`, `department_code`, `id`, `department_id`)
/// take several values as repeated keys (`id=1&id=2`), bracketed keys
/// (`id[]=1&id[]=2`) or a comma separated value (`id=1,2`).
///
/// # Matching
/// - `section_id`: courses offering one of these sections
/// - `department_code`: courses of one of these departments, by code
/// - `search`: every word must appear in the title, description, code,
///   department name or a section instructor (case-insensitive)
/// - `id` / `department_id`: courses matching **either** parameter
///
/// # Rendering
/// `show_sections` and `show_periods` default to `true`; send `false`, `0`,
/// `no` or `off` to leave sections or their meeting periods out.
///
/// # Caching
/// Requests with `department_id` that render both sections and periods are
/// cached per `department_id` value.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct CourseQuery {
    /// Section IDs.
    #[param(example = "12,13")]
    pub section_id: Option<String>,
    /// Department codes.
    #[param(example = "BIO,CHEM")]
    pub department_code: Option<String>,
    /// Free-text search. Characters other than letters, digits and spaces
    /// are ignored.
    #[param(example = "intro bio")]
    pub search: Option<String>,
    /// Course IDs, ORed with `department_id`.
    #[param(example = "5")]
    pub id: Option<String>,
    /// Department IDs, ORed with `id`.
    #[param(example = "7")]
    pub department_id: Option<String>,
    /// Include each course's sections. `false`, `0`, `no` and `off` turn
    /// this off; anything else keeps it on.
    #[param(example = "false")]
    pub show_sections: Option<String>,
    /// Include each section's meeting periods. Accepts the same values as
    /// `show_sections`.
    #[param(example = "off")]
    pub show_periods: Option<String>,
}

/// A course as rendered by the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CourseListing {
    pub id: i32,
    pub department_id: i32,
    pub code: String,
    pub title: String,
    pub description: String,
    /// Present only when sections are shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionListing>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionListing {
    pub id: i32,
    pub number: String,
    pub instructor: String,
    /// Present only when periods are shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<String>>,
}

impl From<course::Model> for CourseListing {
    fn from(model: course::Model) -> Self {
        Self {
            id: model.id,
            department_id: model.department_id,
            code: model.code,
            title: model.title,
            description: model.description,
            sections: None,
        }
    }
}

impl SectionListing {
    #[must_use]
    pub fn render(model: section::Model, show_periods: bool) -> Self {
        let periods = show_periods.then(|| {
            model
                .periods
                .split(';')
                .map(str::trim)
                .filter(|period| !period.is_empty())
                .map(str::to_string)
                .collect()
        });
        Self {
            id: model.id,
            number: model.number,
            instructor: model.instructor,
            periods,
        }
    }
}
