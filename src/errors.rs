//! # Error Handling for Listing Endpoints
//!
//! Two layers of errors live here:
//!
//! - [`FilterError`] is produced while composing a query. It carries enough
//!   detail to tell a bad request parameter apart from a misconfigured filter.
//! - [`ApiError`] is what an axum handler returns. It maps every failure to an
//!   HTTP status, logs internal details through `tracing` and sends a sanitized
//!   JSON body to the client.
//!
//! Cache backend failures have their own type ([`crate::cache::CacheError`])
//! because they never reach the client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filtercrate::ApiError;
//!
//! async fn my_handler() -> Result<Json<Vec<Course>>, ApiError> {
//!     let query = registry.execute(FilterQuery::new(schema), &ctx)?;
//!     let rows = query.all(&db).await?;
//!     Ok(Json(rows))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Failure while composing a filtered query.
///
/// Composition stops at the first error, so a query that produced one is
/// never executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A filter names a field or relation the schema does not know about.
    InvalidFilterTarget {
        /// The field or relation as written by the filter
        target: String,
        /// What was wrong with it
        reason: String,
    },

    /// A parameter value could not be coerced to the type its column expects.
    MalformedParameter {
        /// Request parameter (or field, before relabelling) that supplied the value
        parameter: String,
        /// The raw value as received
        value: String,
        /// Human readable name of the expected type
        expected: &'static str,
    },
}

impl FilterError {
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilterTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(
        parameter: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::MalformedParameter {
            parameter: parameter.into(),
            value: value.into(),
            expected,
        }
    }

    /// Attribute a `MalformedParameter` to the request parameter that fed it.
    ///
    /// The query builder only knows field names; filters call this so the
    /// client sees the parameter it actually sent.
    #[must_use]
    pub fn for_parameter(self, name: &str) -> Self {
        match self {
            Self::MalformedParameter {
                value, expected, ..
            } => Self::MalformedParameter {
                parameter: name.to_string(),
                value,
                expected,
            },
            other => other,
        }
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedParameter { .. })
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilterTarget { target, reason } => {
                write!(f, "invalid filter target '{target}': {reason}")
            }
            Self::MalformedParameter {
                parameter,
                value,
                expected,
            } => write!(
                f,
                "parameter '{parameter}' has value '{value}', expected {expected}"
            ),
        }
    }
}

impl std::error::Error for FilterError {}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - A request parameter could not be used
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 500 Internal Server Error - A filter is wired to a target that does not exist
    Configuration {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: FilterError,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message }
            | Self::Configuration { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Configuration { internal, .. } => {
                tracing::error!(error = %internal, "Filter configuration error");
            }
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `MalformedParameter` becomes a 400 naming the parameter; a bad filter
/// target is a server-side wiring mistake and becomes a sanitized 500.
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::MalformedParameter { .. } => Self::BadRequest {
                message: err.to_string(),
            },
            FilterError::InvalidFilterTarget { .. } => Self::Configuration {
                message: "The listing is misconfigured".to_string(),
                internal: err,
            },
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}
