//! HTTP error taxonomy for the activation pipeline API.
//!
//! Validation, NotFound, Unauthorized, and Conflict surface synchronously
//! with a machine-readable reason. Dependency failures (notifications,
//! signals, bonus writes) are logged at the side-effect site and never roll
//! back the primary state transition; Dependency exists for the rare caller
//! that wants to surface one anyway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(&'static str),

    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Conflict reasons surfaced to callers.
pub const ALREADY_COMPLETED: &str = "already_completed";
pub const TERMINAL_STATE: &str = "terminal_state";

impl ApiError {
    pub fn missing_field(field: &str) -> Self {
        ApiError::Validation(format!("missing required field: {field}"))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self:#}");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => ApiError::NotFound("record"),
            other => ApiError::Internal(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = ApiError::missing_field("proof_method");
        assert_eq!(err.to_string(), "missing required field: proof_method");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(ApiError::Conflict(ALREADY_COMPLETED).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Conflict(TERMINAL_STATE).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn diesel_not_found_maps_to_404() {
        let err: ApiError = diesel::result::Error::NotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
