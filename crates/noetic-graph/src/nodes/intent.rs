//! Intent node (§4.J): wraps §4.E's two-layer recognizer.

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::GraphState;
use noetic_intent::McpHostTrigger;
use noetic_toolhost::RunState;
use tracing::instrument;

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    if !services.features.use_intent_recognition {
        state.intent_result = Some(noetic_intent::IntentResult::normal_fallback());
        state.trace("intent", "skipped", Some("use_intent_recognition disabled".to_string()));
        return Ok(());
    }

    let hosts = running_mcp_triggers(services).await?;
    let llm = services
        .intent_model
        .as_deref()
        .map(|model| (services.llm, model));

    let result = noetic_intent::recognize_turn(
        services.intent_matcher,
        &state.semantic_input.text,
        &hosts,
        services.mcp_priority,
        llm,
        services.confidence_threshold,
    )
    .await?;

    state.semantic_input.intent = Some(format!("{:?}", result.category));
    state.trace("intent", "recognized", Some(format!("{:?} via {:?}", result.category, result.source)));
    state.intent_result = Some(result);
    Ok(())
}

/// Dynamic per-tool-host trigger vocabulary (§4.E), limited to hosts whose
/// subprocess is currently running — a stopped host's keywords shouldn't
/// route a turn toward a tool call that can't actually execute.
async fn running_mcp_triggers(services: &GraphServices<'_>) -> Result<Vec<McpHostTrigger>> {
    let configs = services.tool_hosts.list_configs()?;
    let statuses = services.tool_hosts.list_status().await?;
    let running: std::collections::HashSet<String> = statuses
        .into_iter()
        .filter(|s| s.state == RunState::Running)
        .map(|s| s.name)
        .collect();

    Ok(configs
        .into_iter()
        .filter(|c| running.contains(&c.name))
        .map(|c| McpHostTrigger {
            host_name: c.name,
            trigger_keywords: c.trigger_keywords,
        })
        .collect())
}
