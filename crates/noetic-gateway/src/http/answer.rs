//! `POST /answer` (§4.I, §6): resolve a suspended turn's pending form or
//! visual display, then immediately re-enter reasoning so the answer gets a
//! reply without the caller having to open a second `/task` stream.

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse::{persist_state, PersistOnlyObserver};
use axum::{extract::State, Json};
use noetic_forms::{submit, SubmittedAction};
use noetic_graph::{run_turn, state::now_secs, DialogueMessage, GraphState, GraphStatus};
use noetic_storage::MessageRole;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(rename = "actionID")]
    pub action_id: String,
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `text` doubles as the wire format for both a single free-text answer and
/// a structured form submission: if it parses as a JSON object, its keys are
/// taken as field values; otherwise it is wrapped under a `text` field.
fn submission_data(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({ "text": text }),
    }
}

fn submission_action(text: &str) -> SubmittedAction {
    match text.trim().to_ascii_lowercase().as_str() {
        "reject" | "skip" => SubmittedAction::Reject,
        "dismiss" => SubmittedAction::Dismiss,
        _ => SubmittedAction::Approve,
    }
}

#[instrument(skip(app, body))]
pub async fn answer_handler(
    State(app): State<Arc<AppState>>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<Value>, ApiError> {
    let now = now_secs();
    let pending = app
        .pending_forms
        .get(&body.action_id, now)
        .ok_or(ApiError::SessionNotFound)?;
    let session_id = body.session_id.clone().unwrap_or_else(|| pending.session_id.clone());
    if pending.session_id != session_id {
        return Err(ApiError::SessionNotFound);
    }

    let data = submission_data(&body.text);
    let action = submission_action(&body.text);
    let (continuation, _outcome) = submit(
        &app.store,
        &app.pending_forms,
        &body.action_id,
        &session_id,
        action,
        &data,
        now,
    )?;

    let lock = app.session_lock(&session_id);
    let _guard = lock.lock().await;

    let Some(blob) = app.store.load_graph_state(&session_id)? else {
        return Err(ApiError::SessionNotFound);
    };
    let mut state: GraphState = serde_json::from_str(&blob)?;

    state.ecs_request = None;
    state.ecs_full_request = None;
    state.status = GraphStatus::Processing;
    state.outer_iterations = 0;
    state.inner_iterations = 0;
    state.observation = Some(match &continuation.error {
        Some(err) => format!("form submission rejected: {err}"),
        None => format!("human answered: {}", continuation.summary),
    });
    state.semantic_input.text = body.text.clone();
    state.dialogue_history.push(DialogueMessage {
        role: "user".to_string(),
        content: body.text.clone(),
    });

    let services = app.graph_services();
    let mut observer = PersistOnlyObserver::new(&app.store);
    let result = run_turn(&services, &mut observer, &mut state).await;
    if result.is_err() {
        persist_state(&app.store, &state).await?;
    }
    result?;

    if let Some(response) = &state.response {
        app.store.append_message(&session_id, MessageRole::Assistant, response)?;
    }

    Ok(Json(json!({ "status": "ok" })))
}
