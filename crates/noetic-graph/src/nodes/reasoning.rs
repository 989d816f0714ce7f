//! Reasoning node (§4.J): assembles the turn prompt, calls the model, and
//! parses its structured output into (at most) one of three outcomes —
//! a plain response, a tool call, or an external-step request. A tool call
//! that fails the idempotency check (§4.B `can_create`) never becomes a
//! pending tool call at all; it is surfaced back to reasoning itself as an
//! observation on the next loop iteration.

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::{DialogueMessage, GraphState, ToolCallSpec};
use noetic_contracts::{can_create, ActionType, ExecutionContract};
use noetic_llm::{ChatRequest, Message, Role};
use noetic_memory::entries::create as store_memory_entry;
use noetic_storage::NewMemoryEntry;
use serde_json::Value;
use tracing::instrument;

/// Shape of the `tool_call` object in the model's structured output.
#[derive(Debug, serde::Deserialize)]
struct RawToolCall {
    service: String,
    method: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    irreversible: bool,
    /// Per-call override of the default tool timeout (§5); falls back to
    /// `GraphConfig::tool_timeout` when absent.
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Minimal envelope this node pulls out of the response text in addition to
/// what `noetic_emotion::parse_llm_output` already covers — kept separate
/// so noetic-emotion stays free of tool/form concerns.
#[derive(Debug, Default, serde::Deserialize)]
struct Envelope {
    #[serde(default)]
    tool_call: Option<RawToolCall>,
    #[serde(default)]
    form_request: Option<Value>,
}

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    let request = build_request(services, state);
    // The prompt above has already folded in any refusal from the previous
    // call; clear it now so a fresh tool call this round starts unrefused.
    state.idempotency_refused = false;

    let response = services.llm.complete(&request).await?;

    let envelope: Envelope = serde_json::from_str(&response.content).unwrap_or_default();
    let parsed = noetic_emotion::parse_llm_output(&response.content);

    state.detected_emotion = Some(parsed.emotion.clone());
    state.response = Some(parsed.response.clone());
    state.dialogue_history.push(DialogueMessage {
        role: "assistant".to_string(),
        content: parsed.response.clone(),
    });

    if parsed.memory_update.should_store {
        for entry in &parsed.memory_update.entries {
            store_memory_entry(
                services.store,
                NewMemoryEntry {
                    session_id: Some(state.conversation_id.clone()),
                    category: entry.category.clone(),
                    key: entry.key.clone(),
                    value: entry.value.clone(),
                    confidence: 0.7,
                    source: "reasoning".to_string(),
                    target_time: None,
                    reminder_offset_minutes: None,
                    repeat_type: None,
                    plan_status: None,
                },
            )?;
        }
        state.memories_to_store = parsed.memory_update.entries.clone();
    }

    if let Some(raw) = envelope.tool_call {
        handle_tool_call(state, raw);
    } else if let Some(form) = envelope.form_request {
        handle_form_request(state, form);
    }

    state.trace("reasoning", "completed", Some(format!("model={}", response.model)));
    Ok(())
}

fn build_request(services: &GraphServices<'_>, state: &GraphState) -> ChatRequest {
    let mut system = String::new();
    system.push_str("You are a conversational assistant operating inside an execution-contract engine.\n");
    system.push_str(&state.emotional_context.modulation_instruction);
    system.push('\n');

    if !state.working_memory.retrieved_memories.is_empty() {
        system.push_str("\nRelevant memories:\n");
        for m in &state.working_memory.retrieved_memories {
            system.push_str(&format!("- [{}] {}\n", m.category, m.content));
        }
    }

    if let Ok(descriptions) = services.tool_hosts.running_hosts_with_descriptions() {
        if !descriptions.is_empty() {
            system.push_str("\nAvailable tools:\n");
            system.push_str(&noetic_toolhost::describe_running_hosts(&descriptions));
            system.push('\n');
        }
    }

    if let Some(intent) = &state.intent_result {
        system.push_str(&format!("\nDetected intent: {:?}\n", intent.category));
    }

    if state.idempotency_refused {
        system.push_str("\nNote: your last requested action was refused because an irreversible, identical action already completed. Choose a different course.\n");
    } else if let Some(obs) = &state.observation {
        system.push_str(&format!("\nTool observation: {obs}\n"));
    }

    system.push_str(
        "\nRespond with JSON: {\"emotion\":{\"primary\":...,\"category\":...,\"confidence\":...,\"indicators\":[...]},\
         \"response\":\"...\",\"memory_update\":{\"should_store\":bool,\"entries\":[...]},\
         \"tool_call\":{\"service\":...,\"method\":...,\"args\":{...},\"irreversible\":bool}?,\
         \"form_request\":{...}?}",
    );

    let mut messages = vec![Message {
        role: Role::System,
        content: system,
    }];
    for turn in &state.dialogue_history {
        let role = match turn.role.as_str() {
            "assistant" => Role::Assistant,
            _ => Role::User,
        };
        messages.push(Message {
            role,
            content: turn.content.clone(),
        });
    }
    if state.dialogue_history.last().map(|d| d.role.as_str()) != Some("user") {
        messages.push(Message {
            role: Role::User,
            content: state.semantic_input.text.clone(),
        });
    }

    ChatRequest {
        model: services.model.clone(),
        messages,
        max_tokens: 800,
        temperature: Some(0.7),
    }
}

fn handle_tool_call(state: &mut GraphState, raw: RawToolCall) {
    let action_detail = serde_json::json!({
        "service": raw.service,
        "method": raw.method,
        "args": raw.args,
    });

    let existing = state.all_contracts();
    if !can_create(&action_detail, &existing) {
        state.idempotency_refused = true;
        state.observation = Some(format!(
            "action refused: already performed ({}.{})",
            raw.service, raw.method
        ));
        state.trace(
            "reasoning",
            "idempotency-refused",
            Some(format!("{}.{}", raw.service, raw.method)),
        );
        return;
    }

    let contract = ExecutionContract::new(ActionType::ToolCall, action_detail, raw.irreversible)
        .with_timeout_seconds(raw.timeout_seconds);
    state.tool_call_history.push(format!("{}.{}", raw.service, raw.method));
    state.pending_tool_calls.push(ToolCallSpec {
        service: raw.service,
        method: raw.method,
        args: raw.args,
        irreversible: raw.irreversible,
    });
    state.pending_executions.push(contract);
}

fn handle_form_request(state: &mut GraphState, form: Value) {
    let summary = form
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("input requested")
        .to_string();

    state.ecs_request = Some(summary);
    state.ecs_full_request = Some(form.clone());

    let contract = ExecutionContract::new(ActionType::EcsRequest, form, false);
    state.pending_executions.push(contract);
    state.trace("reasoning", "ecs-requested", state.ecs_request.clone());
}

