use std::fmt::Display;
use std::panic::Location;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use district_db::StoreError;
use district_types::api::ErrorBody;

use crate::identity::AuthFailure;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("authorization token is missing")]
    AuthMissing,
    #[error("{0}")]
    AuthInvalid(String),
    #[error("authorization token has expired")]
    AuthExpired,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Logs the cause and the caller's location; the client only ever sees
    /// a generic message.
    #[track_caller]
    pub fn internal(err: impl Display) -> Self {
        let location = Location::caller();
        error!(%location, "Internal error: {}", err);
        ApiError::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing | ApiError::AuthInvalid(_) | ApiError::AuthExpired => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::AuthMissing => "auth_missing",
            ApiError::AuthInvalid(_) => "auth_invalid",
            ApiError::AuthExpired => "auth_expired",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationFailed(_) => "validation_failed",
            ApiError::Internal => "internal",
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(reason: AuthFailure) -> Self {
        match reason {
            AuthFailure::TokenMissing => ApiError::AuthMissing,
            AuthFailure::TokenInvalid => {
                ApiError::AuthInvalid("authorization token is invalid".into())
            }
            AuthFailure::TokenExpired => ApiError::AuthExpired,
        }
    }
}

impl From<StoreError> for ApiError {
    #[track_caller]
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound(err.to_string()),
            StoreError::Archived
            | StoreError::AlreadyArchived
            | StoreError::ConcurrentModification
            | StoreError::DuplicateAccount => ApiError::Conflict(err.to_string()),
            StoreError::InvalidAmount => ApiError::ValidationFailed(err.to_string()),
            StoreError::LockPoisoned | StoreError::Backend(_) => ApiError::internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status: status.as_u16(),
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
