//! JSON lookup of stored calls.

use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use careline_types::CallRecord;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `GET /api/calls/{callSid}`.
///
/// Returns the call with its transcript in append order.
pub async fn get_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<CallRecord>, ApiError> {
    let store = Arc::clone(&state.store);
    let lookup_sid = call_sid.clone();
    let record = tokio::task::spawn_blocking(move || store.load_call(&lookup_sid))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))?
        .map_err(|e| {
            tracing::error!(call_sid = %call_sid, error = %e, "failed to load call");
            ApiError::InternalServerError("failed to load call".to_string())
        })?;

    record
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("call {call_sid}")))
}
