//! API error type with automatic HTTP status mapping.
//!
//! Every failure leaves the service as `{ "error": message }`. Internal failures are
//! logged and replaced by a generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::validation::ValidationError;

#[derive(Debug)]
pub enum ApiError {
    /// Payload failed field validation (400)
    Validation(ValidationError),

    /// Malformed request (400)
    BadRequest(String),

    /// Missing or invalid credentials (401)
    Unauthorized(&'static str),

    /// Authenticated but not allowed (403)
    Forbidden(String),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Uniqueness or state conflict (409)
    Conflict(String),

    /// Upload exceeds the configured limit (413)
    PayloadTooLarge { limit: usize },

    /// Upload type not accepted (415)
    UnsupportedMedia(String),

    /// Internal error (500, logged)
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::BadRequest(message) | Self::Conflict(message) => message.clone(),
            Self::UnsupportedMedia(message) => message.clone(),
            Self::Unauthorized(reason) => (*reason).to_string(),
            Self::Forbidden(reason) => reason.clone(),
            Self::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            Self::PayloadTooLarge { limit } => {
                format!("upload exceeds the {} byte limit", limit)
            }
            Self::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(message) => write!(f, "internal error: {}", message),
            other => f.write_str(&other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(message) = &self {
            tracing::error!(error = %message, "request failed");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => Self::NotFound {
                resource: resource_name(collection),
                id,
            },
            StoreError::Conflict(message) => Self::Conflict(message),
            stale @ StoreError::Stale { .. } => {
                Self::Conflict(format!("{}; reload and retry", stale))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::Unauthorized("authentication required"),
            AuthError::InvalidToken(_) => Self::Unauthorized("invalid or expired token"),
            AuthError::InvalidCredentials => Self::Unauthorized("invalid email or password"),
            AuthError::WeakPassword { .. } => Self::BadRequest(err.to_string()),
            AuthError::Hashing(message) => Self::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Singular resource label for a collection name, used in 404 messages.
fn resource_name(collection: &'static str) -> &'static str {
    match collection {
        "users" => "user",
        "properties" => "property",
        "categories" => "category",
        "amenities" => "amenity",
        "facilities" => "facility",
        "states" => "state",
        "locations" => "location",
        "developers" => "developer",
        "seo_pages" => "seo page",
        "reviews" => "review",
        "tickets" => "ticket",
        "blog_posts" => "blog post",
        "news" => "news item",
        "homepage_sections" => "homepage section",
        "leads" => "lead",
        other => other,
    }
}
