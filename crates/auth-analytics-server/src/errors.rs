// crates/auth-analytics-server/src/errors.rs
// ============================================================================
// Module: API Error Mapping
// Description: Translates library errors into the stable error taxonomy
// and HTTP status codes.
// Purpose: Keep `axum`/HTTP concerns entirely in this thin external layer;
// no library crate knows about status codes.
// Dependencies: axum, auth-analytics-core, auth-analytics-store
// ============================================================================

//! ## Overview
//! One enum, one `IntoResponse` impl. Every variant corresponds to a
//! named error code; the body is always
//! `{"error": "<code>", "message": "<detail>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

use auth_analytics_core::interfaces::ArtifactError;
use auth_analytics_core::interfaces::RegistryError;

/// Stable API error taxonomy.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Malformed or non-array ingest body.
    BadRequest(String),
    /// Run identifier failed the `^run-[0-9a-f]{32}$` shape check.
    InvalidRunId,
    /// Requested resource does not exist.
    NotFound(String),
    /// Requested lifecycle transition is not allowed from the current state.
    InvalidTransition,
    /// `closed` was requested without a `resolution_reason`.
    MissingResolutionReason,
    /// A durable write or read failed.
    Persistence(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::InvalidRunId => "invalid_run_id",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition => "invalid_transition",
            Self::MissingResolutionReason => "missing_resolution_reason",
            Self::Persistence(_) => "persistence_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidRunId => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition => StatusCode::CONFLICT,
            Self::MissingResolutionReason => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::InvalidRunId => "run id must match ^run-[0-9a-f]{32}$".to_string(),
            Self::NotFound(message) => message.clone(),
            Self::InvalidTransition => "requested status transition is not allowed".to_string(),
            Self::MissingResolutionReason => {
                "resolution_reason is required to close an incident".to_string()
            }
            Self::Persistence(message) => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidTransition => Self::InvalidTransition,
            RegistryError::MissingResolutionReason => Self::MissingResolutionReason,
            RegistryError::NotFound => Self::NotFound("incident not found".to_string()),
            RegistryError::Persistence(message) => Self::Persistence(message),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidRunId => Self::InvalidRunId,
            ArtifactError::NotFound => Self::NotFound("run not found".to_string()),
            ArtifactError::Persistence(message) => Self::Persistence(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_maps_to_409() {
        let err: ApiError = RegistryError::InvalidTransition.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_resolution_reason_maps_to_422() {
        let err: ApiError = RegistryError::MissingResolutionReason.into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn invalid_run_id_maps_to_400() {
        let err: ApiError = ArtifactError::InvalidRunId.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = RegistryError::NotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
