//! The gateway's own error type — every handler returns `Result<_, ApiError>`
//! and `ApiError` knows how to render itself as the right HTTP response
//! (§7's policy table maps most of these to a `status`/`error` SSE frame
//! instead, handled in `sse.rs`; this type covers the handful of cases that
//! fail before a turn even starts streaming).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found")]
    SessionNotFound,

    #[error(transparent)]
    Graph(#[from] noetic_graph::GraphError),

    #[error(transparent)]
    Storage(#[from] noetic_storage::StorageError),

    #[error(transparent)]
    Forms(#[from] noetic_forms::FormError),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("vector store collaborator is not configured")]
    VectorStoreNotConfigured,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // `/answer`'s wire contract only distinguishes "ok" from "session not
        // found" (§6) — an expired/missing pending request or a session_id
        // that doesn't own it both read as that to the caller.
        match &self {
            ApiError::SessionNotFound
            | ApiError::Forms(noetic_forms::FormError::ExpiredOrNotFound)
            | ApiError::Forms(noetic_forms::FormError::SessionMismatch) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Session not found" }))).into_response()
            }
            ApiError::VectorStoreNotConfigured => (
                StatusCode::NOT_IMPLEMENTED,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}
