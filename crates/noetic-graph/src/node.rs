use crate::error::Result;
use crate::state::GraphState;
use async_trait::async_trait;

/// Called by `run_turn` after every node completes (§4.K step 3): persist
/// the current state, emit any queued SSE events, and decide whether the
/// stream should terminate. Implemented by the gateway; kept as a trait
/// here so the orchestrator doesn't depend on axum or any transport detail.
#[async_trait]
pub trait TurnObserver: Send {
    async fn after_node(&mut self, node: &str, state: &GraphState) -> Result<()>;
}

/// A `TurnObserver` that does nothing — useful for tests and for batch/CLI
/// callers that only care about the final `GraphState`.
pub struct NullObserver;

#[async_trait]
impl TurnObserver for NullObserver {
    async fn after_node(&mut self, _node: &str, _state: &GraphState) -> Result<()> {
        Ok(())
    }
}
