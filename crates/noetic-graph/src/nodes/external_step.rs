//! External-step node (§4.J, §4.I): for each pending Contract of
//! `action_type = ecs_request`, transitions it start then suspend, moves it
//! to `completed_executions`, registers the concrete request in the pending
//! forms table, and suspends the turn.

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::{now_secs, GraphState, GraphStatus};
use noetic_contracts::{Actor, ActionType};
use noetic_forms::{DisplayType, ExternalStepRequest, FormField, RequestContext, RequestKind};
use serde_json::Value;
use tracing::instrument;

/// The shape reasoning emits under `form_request`. Deserialized here rather
/// than shared with noetic-forms because it is a draft — missing id,
/// session, and TTL, all of which this node fills in.
#[derive(Debug, serde::Deserialize)]
struct FormRequestDraft {
    title: String,
    #[serde(default)]
    intent: String,
    #[serde(default)]
    memory_category: Option<String>,
    #[serde(default)]
    fields: Vec<FormField>,
    #[serde(default)]
    display_type: Option<DisplayType>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    ttl_secs: Option<f64>,
}

impl FormRequestDraft {
    fn field_count_and_len(&self) -> (usize, usize) {
        let content_len = self.title.len()
            + self.fields.iter().map(|f| f.label.len()).sum::<usize>()
            + self.data.as_ref().map(|d| d.to_string().len()).unwrap_or(0);
        (self.fields.len().max(if self.data.is_some() { 1 } else { 0 }), content_len)
    }
}

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    let idx = state
        .pending_executions
        .iter()
        .position(|c| c.action_type == ActionType::EcsRequest);

    let Some(idx) = idx else {
        state.trace("external-step", "skipped", Some("no pending ecs contract".to_string()));
        return Ok(());
    };

    {
        let contract = &mut state.pending_executions[idx];
        contract.transition("start", Actor::EcsNode, None)?;
        contract.transition("suspend", Actor::EcsNode, None)?;
    }
    let contract = state.pending_executions.remove(idx);
    state.trace(
        "external-step",
        &format!("transition:{}:pending->waiting", contract.execution_id),
        None,
    );

    let raw = state.ecs_full_request.clone().unwrap_or_else(|| contract.action_detail.clone());
    let draft: Result<FormRequestDraft> = serde_json::from_value(raw).map_err(Into::into);

    match draft {
        Ok(draft) => {
            let (field_count, content_len) = draft.field_count_and_len();
            let complexity = noetic_forms::assess_complexity(field_count, content_len);
            let kind = if !draft.fields.is_empty() {
                RequestKind::Form { fields: draft.fields }
            } else {
                RequestKind::VisualDisplay {
                    display_type: draft.display_type.unwrap_or(DisplayType::Table),
                    data: draft.data.unwrap_or(Value::Null),
                }
            };
            let now = now_secs();
            let request = ExternalStepRequest {
                id: contract.execution_id.clone(),
                session_id: state.conversation_id.clone(),
                title: draft.title,
                kind,
                context: RequestContext {
                    intent: draft.intent,
                    memory_category: draft.memory_category,
                    extra: Value::Null,
                },
                created_at: now,
                expires_at: now + draft.ttl_secs.unwrap_or(services.form_ttl_secs),
            };
            services.pending_forms.store(request.clone());
            state.ecs_full_request = Some(serde_json::to_value(&request)?);
            state.trace("external-step", "registered", Some(format!("complexity={complexity:?}")));
        }
        Err(err) => {
            state.trace("external-step", "malformed-request", Some(err.to_string()));
        }
    }

    state.completed_executions.push(contract);
    state.status = GraphStatus::Suspended;
    Ok(())
}
