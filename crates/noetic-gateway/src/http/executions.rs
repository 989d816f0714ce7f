//! `GET /executions/{session_id}` (§4.L): the observation layer's one HTTP
//! consumer — projects a session's Contracts (both still pending and
//! already completed, pulled off its persisted `GraphState`) into the
//! human-facing timeline `ExecutionUiTranslator` produces.

use crate::app::AppState;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::Json;
use noetic_graph::GraphState;
use serde_json::Value;
use std::sync::Arc;

pub async fn get_session_timeline(
    State(app): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let blob = app
        .store
        .load_graph_state(&session_id)?
        .ok_or(ApiError::SessionNotFound)?;
    let state: GraphState = serde_json::from_str(&blob)?;

    let contracts = state.all_contracts();
    let tl = noetic_observation::timeline(&session_id, &contracts);
    let human = noetic_observation::ExecutionUiTranslator.translate_timeline(&tl);
    Ok(Json(human))
}
