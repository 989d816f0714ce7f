//! Event frame construction and the `TurnObserver` that drives SSE (§4.K,
//! §6). Built on `async-stream::stream!` exactly as `skynet-gateway::http::
//! openai_compat::handle_streaming` is, **without** that function's
//! `unsafe` raw-pointer `'static` workaround: the turn runs in a spawned
//! task that owns a cloned `Arc<AppState>`, which is sufficient here.

use noetic_emotion::EmotionType;
use noetic_graph::{GraphError, GraphState, Result as GraphResult, TurnObserver};
use noetic_storage::Store;
use serde_json::{json, Value};

/// One frame queued by the running turn for the HTTP response to pick up
/// and number. `event` is one of `text|emotion|hitl` while the turn is in
/// flight; `status|error|done` are appended by the handler once `run_turn`
/// returns, after the producer task's observer is done writing.
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub event: &'static str,
    pub payload: Value,
}

async fn persist(store: &Store, state: &GraphState) -> GraphResult<()> {
    let blob = serde_json::to_string(state)?;
    store
        .save_graph_state(&state.conversation_id, &blob)
        .map_err(|e| GraphError::ObserverPersist(e.to_string()))
}

/// Persist whatever `state` holds even when `run_turn` itself returned an
/// error: a fatal node failure (§7) sets `GraphStatus::Error` in memory
/// before propagating, and that last-observed status needs to survive into
/// storage the same way every other node transition does, or the next load
/// of this session sees the stale pre-failure status forever.
pub async fn persist_state(store: &Store, state: &GraphState) -> GraphResult<()> {
    persist(store, state).await
}

/// Drives one streamed `/task` turn: persists state after every node (§9's
/// "after every node" resolution) and emits `text`/`emotion`/`hitl` frames
/// as `GraphState` accumulates them.
pub struct GatewayObserver<'a> {
    store: &'a Store,
    tx: tokio::sync::mpsc::Sender<QueuedFrame>,
    last_response: Option<String>,
    last_emotion: Option<(EmotionType, u64)>,
}

impl<'a> GatewayObserver<'a> {
    pub fn new(store: &'a Store, tx: tokio::sync::mpsc::Sender<QueuedFrame>) -> Self {
        Self {
            store,
            tx,
            last_response: None,
            last_emotion: None,
        }
    }

    async fn send(&self, event: &'static str, payload: Value) {
        let _ = self.tx.send(QueuedFrame { event, payload }).await;
    }
}

#[async_trait::async_trait]
impl<'a> TurnObserver for GatewayObserver<'a> {
    async fn after_node(&mut self, node: &str, state: &GraphState) -> GraphResult<()> {
        if let Some(response) = &state.response {
            if self.last_response.as_deref() != Some(response.as_str()) {
                self.last_response = Some(response.clone());
                self.send(
                    "text",
                    json!({
                        "type": "text",
                        "payload": {"content": response, "meta": {"id": node}},
                        "actionID": "",
                    }),
                )
                .await;
            }
        }

        if let Some(emotion) = &state.detected_emotion {
            // Quantize confidence so float jitter doesn't spam duplicate frames.
            let bucket = (emotion.confidence * 1000.0).round() as u64;
            let key = (emotion.primary, bucket);
            if self.last_emotion != Some(key) {
                self.last_emotion = Some(key);
                self.send(
                    "emotion",
                    json!({
                        "type": "emotion",
                        "payload": {"primary": emotion.primary, "confidence": emotion.confidence},
                    }),
                )
                .await;
            }
        }

        if node == "external-step" {
            if let Some(request) = &state.ecs_full_request {
                self.send(
                    "hitl",
                    json!({"type": "hitl", "payload": request}),
                )
                .await;
            }
        }

        persist(self.store, state).await
    }
}

/// Used for the resumption `run_turn` call inside `POST /answer` (§4.I step
/// 5): the HTTP response there is a plain `{"status":"ok"}`, not SSE, but
/// the same after-every-node persistence discipline still applies.
pub struct PersistOnlyObserver<'a> {
    store: &'a Store,
}

impl<'a> PersistOnlyObserver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<'a> TurnObserver for PersistOnlyObserver<'a> {
    async fn after_node(&mut self, _node: &str, state: &GraphState) -> GraphResult<()> {
        persist(self.store, state).await
    }
}
