//! Memory-recall node (§4.J): runs the retrieval algorithm (§4.D) against
//! the turn's text and folds the top results into `working_memory` so the
//! reasoning prompt can cite them.

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::{now_secs, GraphState, MemoryRef};
use noetic_memory::retrieval;
use tracing::instrument;

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    if !services.features.use_memory_emotion_system {
        state.trace("memory-recall", "skipped", Some("use_memory_emotion_system disabled".to_string()));
        return Ok(());
    }

    let wm = noetic_memory::working_memory::get_or_create(services.store, &state.conversation_id)?;
    state.working_memory.current_topic = wm.current_topic.clone();

    let scored = retrieval::retrieve(
        services.store,
        Some(state.conversation_id.as_str()),
        &state.semantic_input.text,
        wm.current_topic.as_deref(),
        services.memory.recall_limit,
        services.memory.candidate_ceiling,
        now_secs(),
    )?;

    state.working_memory.retrieved_memories = scored
        .iter()
        .map(|s| MemoryRef {
            id: s.entry.id.clone(),
            content: format!("{}: {}", s.entry.key, s.entry.value),
            category: s.entry.category.clone(),
            confidence: s.confidence,
        })
        .collect();

    state.trace(
        "memory-recall",
        "retrieved",
        Some(format!("{} memories", state.working_memory.retrieved_memories.len())),
    );
    Ok(())
}
