//! Per-contract projections: `ExecutionSnapshot` ("where is this action right
//! now") and `ExecutionConsequenceView` ("what did this action do"), ported
//! field-for-field from the source `ExecutionObserver.snapshot` /
//! `.consequence_view`.

use noetic_contracts::{ExecutionContract, ExecutionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// `"{service}.{method}"`, the request title, or `"ecs:{type}"` — whichever
/// `action_detail` actually carries, falling back to the bare action type.
pub fn action_summary(contract: &ExecutionContract) -> String {
    let detail = &contract.action_detail;
    let service = detail.get("service").and_then(Value::as_str);
    let method = detail.get("method").and_then(Value::as_str);
    if let (Some(service), Some(method)) = (service, method) {
        return format!("{service}.{method}");
    }
    if let Some(title) = detail.get("title").and_then(Value::as_str) {
        return title.to_string();
    }
    if contract.action_type.value() == "ecs_request" {
        if let Some(kind) = detail.get("type").and_then(Value::as_str) {
            return format!("ecs:{kind}");
        }
        return "ecs_request".to_string();
    }
    contract.action_type.value().to_string()
}

/// This action's current standing: where it is, whether it needs attention,
/// and whether it is done — independent of whether it *succeeded* (§4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub execution_id: String,
    pub action_type: String,
    pub action_summary: String,
    pub current_status: String,
    pub entered_at: f64,
    pub duration_in_state_ms: f64,
    pub is_terminal: bool,
    pub is_stable: bool,
    pub is_resumable: bool,
    pub has_side_effects: bool,
    pub irreversible: bool,
    pub idempotency_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub transition_count: usize,
    pub last_actor: Option<String>,
    pub last_trigger: Option<String>,
}

pub fn snapshot(contract: &ExecutionContract) -> ExecutionSnapshot {
    let now = now_secs();
    let (entered_at, last_actor, last_trigger) = match contract.transitions.last() {
        Some(t) => (t.timestamp, Some(t.actor.clone()), Some(t.trigger.clone())),
        None => (contract.created_at, None, None),
    };

    let is_terminal = contract.status.is_terminal();
    let is_waiting = contract.status == ExecutionStatus::Waiting;
    let has_side_effects = contract.irreversible && contract.status == ExecutionStatus::Completed;

    ExecutionSnapshot {
        execution_id: contract.execution_id.clone(),
        action_type: contract.action_type.value().to_string(),
        action_summary: action_summary(contract),
        current_status: contract.status.value().to_string(),
        entered_at,
        duration_in_state_ms: (now - entered_at) * 1000.0,
        is_terminal,
        is_stable: is_terminal || is_waiting,
        is_resumable: is_waiting,
        has_side_effects,
        irreversible: contract.irreversible,
        idempotency_key: contract.idempotency_key.clone(),
        timeout_seconds: contract.timeout_seconds,
        result: contract.result.clone(),
        error_message: contract.error_message.clone(),
        transition_count: contract.transitions.len(),
        last_actor,
        last_trigger,
    }
}

/// One of SUCCESS/FAILED/REJECTED/SUSPENDED/CANCELLED/PENDING (§4.L).
pub fn consequence_label(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Completed => "SUCCESS",
        ExecutionStatus::Failed => "FAILED",
        ExecutionStatus::Rejected => "REJECTED",
        ExecutionStatus::Waiting => "SUSPENDED",
        ExecutionStatus::Cancelled => "CANCELLED",
        ExecutionStatus::Pending | ExecutionStatus::Running => "PENDING",
    }
}

/// What this action *did* — its outcome, whether it asked the user to
/// confirm along the way, and whether it's still in flight (§4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConsequenceView {
    pub execution_id: String,
    pub action_type: String,
    pub action_summary: String,
    pub consequence_label: String,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub has_side_effects: bool,
    pub was_suspended: bool,
    pub is_still_pending: bool,
    pub total_duration_ms: Option<f64>,
}

pub fn consequence_view(contract: &ExecutionContract) -> ExecutionConsequenceView {
    let is_terminal = contract.status.is_terminal();
    let was_suspended = contract
        .transitions
        .iter()
        .any(|t| t.to == ExecutionStatus::Waiting);
    let has_side_effects = contract.irreversible && contract.status == ExecutionStatus::Completed;

    let total_duration_ms = if is_terminal {
        contract
            .transitions
            .last()
            .map(|t| (t.timestamp - contract.created_at) * 1000.0)
    } else {
        None
    };

    ExecutionConsequenceView {
        execution_id: contract.execution_id.clone(),
        action_type: contract.action_type.value().to_string(),
        action_summary: action_summary(contract),
        consequence_label: consequence_label(contract.status).to_string(),
        result: contract.result.clone(),
        error_message: contract.error_message.clone(),
        has_side_effects,
        was_suspended,
        is_still_pending: !is_terminal,
        total_duration_ms,
    }
}

pub fn consequence_views(contracts: &[ExecutionContract]) -> Vec<ExecutionConsequenceView> {
    contracts.iter().map(consequence_view).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use noetic_contracts::{ActionType, Actor};
    use serde_json::json;

    #[test]
    fn snapshot_of_completed_irreversible_tool_call_has_side_effects() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, json!({"service": "billing", "method": "charge"}), true);
        c.transition("start", Actor::ToolNode, None).unwrap();
        c.transition("succeed", Actor::ToolNode, None).unwrap();
        let snap = snapshot(&c);
        assert_eq!(snap.action_summary, "billing.charge");
        assert!(snap.has_side_effects);
        assert!(snap.is_terminal);
        assert!(!snap.is_resumable);
    }

    #[test]
    fn snapshot_of_waiting_contract_is_stable_and_resumable() {
        let mut c = ExecutionContract::new(ActionType::EcsRequest, json!({"title": "confirm plan"}), false);
        c.transition("start", Actor::EcsNode, None).unwrap();
        c.transition("suspend", Actor::EcsNode, None).unwrap();
        let snap = snapshot(&c);
        assert_eq!(snap.action_summary, "confirm plan");
        assert!(snap.is_stable);
        assert!(snap.is_resumable);
        assert!(!snap.is_terminal);
    }

    #[test]
    fn consequence_view_labels_each_terminal_status() {
        let mut succeeded = ExecutionContract::new(ActionType::ToolCall, json!({}), false);
        succeeded.transition("start", Actor::ToolNode, None).unwrap();
        succeeded.transition("succeed", Actor::ToolNode, None).unwrap();
        assert_eq!(consequence_view(&succeeded).consequence_label, "SUCCESS");

        let mut failed = ExecutionContract::new(ActionType::ToolCall, json!({}), false);
        failed.transition("start", Actor::ToolNode, None).unwrap();
        failed.transition("fail", Actor::ToolNode, None).unwrap();
        assert_eq!(consequence_view(&failed).consequence_label, "FAILED");

        let pending = ExecutionContract::new(ActionType::ToolCall, json!({}), false);
        assert_eq!(consequence_view(&pending).consequence_label, "PENDING");
    }

    #[test]
    fn consequence_view_flags_was_suspended_even_after_resume() {
        let mut c = ExecutionContract::new(ActionType::EcsRequest, json!({}), false);
        c.transition("start", Actor::EcsNode, None).unwrap();
        c.transition("suspend", Actor::EcsNode, None).unwrap();
        c.transition("resume", Actor::User, None).unwrap();
        c.transition("succeed", Actor::GraphRunner, None).unwrap();
        let view = consequence_view(&c);
        assert!(view.was_suspended);
        assert!(!view.is_still_pending);
        assert!(view.total_duration_ms.is_some());
    }
}
