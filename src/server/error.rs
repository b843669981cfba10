//! Mapping from domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::remote::RemoteError;

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Malformed or missing request input; never forwarded remotely.
    #[error("{0}")]
    Validation(String),

    #[error("no track currently playing")]
    NothingPlaying,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            // "Needs authorization" is distinguishable from a remote
            // failure so the caller knows to point a human at /auth.
            ApiError::Auth(AuthError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) | ApiError::Remote(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NothingPlaying => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }

        let mut body = json!({ "error": self.to_string() });
        if matches!(self, ApiError::Auth(AuthError::NotAuthenticated)) {
            body["authorize"] = json!("/auth");
        }
        (status, Json(body)).into_response()
    }
}
