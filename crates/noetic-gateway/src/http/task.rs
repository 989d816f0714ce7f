//! `POST /task` (§4.K, §6): the one turn-driving, SSE-streaming endpoint.

use crate::app::AppState;
use crate::sse::{persist_state, GatewayObserver, QueuedFrame};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;
use noetic_core::ids::SessionId;
use noetic_graph::{run_turn, DialogueMessage, GraphError, GraphState, GraphStatus};
use noetic_storage::MessageRole;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{instrument, warn};

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Load a prior `GraphState` if one is persisted, otherwise start fresh, and
/// fold this turn's input text in either way. A fresh `/task` call always
/// starts a new turn's loop budget, even against a resumed state (§4.J).
fn prepare_state(existing: Option<String>, session_id: &str, text: &str) -> Result<GraphState, GraphError> {
    let mut state = match existing {
        Some(blob) => serde_json::from_str::<GraphState>(&blob)?,
        None => return Ok(GraphState::new(session_id, text)),
    };
    state.semantic_input.text = text.to_string();
    state.last_human_input = Some(json!(text));
    state.dialogue_history.push(DialogueMessage {
        role: "user".to_string(),
        content: text.to_string(),
    });
    state.status = GraphStatus::Processing;
    state.outer_iterations = 0;
    state.inner_iterations = 0;
    Ok(state)
}

#[instrument(skip(app, body))]
pub async fn task_handler(
    State(app): State<Arc<AppState>>,
    Json(body): Json<TaskRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = body
        .session_id
        .unwrap_or_else(|| SessionId::new().to_string());

    let (tx, mut rx) = tokio::sync::mpsc::channel::<QueuedFrame>(64);
    let text = body.text;

    tokio::spawn(async move {
        let lock = app.session_lock(&session_id);
        let _guard = lock.lock().await;

        if let Err(err) = app.store.get_or_create_session(&session_id) {
            let _ = tx
                .send(QueuedFrame {
                    event: "error",
                    payload: json!({"type": "error", "payload": {"message": err.to_string()}}),
                })
                .await;
            return;
        }
        if let Err(err) = app.store.append_message(&session_id, MessageRole::User, &text) {
            warn!(error = %err, "noetic-gateway: failed to append user message");
        }

        let existing = match app.store.load_graph_state(&session_id) {
            Ok(blob) => blob,
            Err(err) => {
                let _ = tx
                    .send(QueuedFrame {
                        event: "error",
                        payload: json!({"type": "error", "payload": {"message": err.to_string()}}),
                    })
                    .await;
                return;
            }
        };

        let mut state = match prepare_state(existing, &session_id, &text) {
            Ok(s) => s,
            Err(err) => {
                let _ = tx
                    .send(QueuedFrame {
                        event: "error",
                        payload: json!({"type": "error", "payload": {"message": err.to_string()}}),
                    })
                    .await;
                return;
            }
        };

        let services = app.graph_services();
        let mut observer = GatewayObserver::new(&app.store, tx.clone());
        let result = run_turn(&services, &mut observer, &mut state).await;

        if result.is_err() {
            if let Err(err) = persist_state(&app.store, &state).await {
                warn!(error = %err, "noetic-gateway: failed to persist state after errored turn");
            }
        }

        if result.is_ok() {
            if let Some(response) = &state.response {
                if let Err(err) = app.store.append_message(&session_id, MessageRole::Assistant, response) {
                    warn!(error = %err, "noetic-gateway: failed to append assistant message");
                }
            }
        }

        match result {
            Ok(()) => {
                let _ = tx.send(QueuedFrame { event: "done", payload: json!({"type": "done"}) }).await;
                let _ = tx.send(QueuedFrame { event: "done", payload: json!("[DONE]") }).await;
            }
            Err(GraphError::ObserverPersist(msg)) => {
                let _ = tx
                    .send(QueuedFrame {
                        event: "error",
                        payload: json!({"type": "error", "payload": {"message": format!("persistence failed: {msg}")}}),
                    })
                    .await;
            }
            Err(GraphError::Llm(e)) => {
                let _ = tx
                    .send(QueuedFrame {
                        event: "status",
                        payload: json!({"type": "statusText", "payload": format!("model call failed: {e}")}),
                    })
                    .await;
                let _ = tx.send(QueuedFrame { event: "done", payload: json!({"type": "done"}) }).await;
                let _ = tx.send(QueuedFrame { event: "done", payload: json!("[DONE]") }).await;
            }
            Err(e) => {
                let _ = tx
                    .send(QueuedFrame {
                        event: "error",
                        payload: json!({"type": "error", "payload": {"message": e.to_string()}}),
                    })
                    .await;
                let _ = tx.send(QueuedFrame { event: "done", payload: json!({"type": "done"}) }).await;
                let _ = tx.send(QueuedFrame { event: "done", payload: json!("[DONE]") }).await;
            }
        }
    });

    let stream = async_stream::stream! {
        let mut seq: u64 = 0;
        while let Some(frame) = rx.recv().await {
            seq += 1;
            let data = if frame.payload.is_string() {
                frame.payload.as_str().unwrap_or_default().to_string()
            } else {
                frame.payload.to_string()
            };
            yield Ok(Event::default().id(seq.to_string()).event(frame.event).data(data));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
