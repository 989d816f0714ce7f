//! Translates Observer projections into human-facing dictionaries (§4.L).
//! No engineering vocabulary — `snapshot`, `contract`, `topology`,
//! `transition`, `execution_id`, and friends — may appear as an output key;
//! `_FORBIDDEN_KEYS` enforces that at test time against every translator
//! output, not just by convention.

use crate::snapshot::{ExecutionConsequenceView, ExecutionSnapshot};
use crate::timeline::ExecutionTimeline;
use serde_json::{json, Value};

/// Engineering terms that must never appear as an output key.
pub const FORBIDDEN_KEYS: &[&str] = &[
    "snapshot",
    "contract",
    "topology",
    "transition",
    "observer",
    "projection",
    "state_machine",
    "node",
    "actor_category",
    "execution_id",
    "current_status",
    "consequence_label",
    "is_still_pending",
    "action_type",
    "idempotency_key",
    "entered_at",
    "duration_in_state_ms",
    "transition_count",
    "last_actor",
    "last_trigger",
    "is_stable",
];

fn status_to_human(status: &str) -> &str {
    match status {
        "pending" => "queued",
        "running" => "in progress",
        "completed" => "done",
        "failed" => "failed",
        "rejected" => "declined",
        "waiting" => "waiting on you",
        "cancelled" => "cancelled",
        other => other,
    }
}

fn consequence_to_human(label: &str, has_side_effects: bool) -> String {
    let base = match label {
        "SUCCESS" if has_side_effects => "done, and can't be undone",
        "SUCCESS" => "done",
        "FAILED" => "didn't go through",
        "REJECTED" => "declined",
        "SUSPENDED" => "waiting on you",
        "CANCELLED" => "cancelled",
        "PENDING" => "still working on it",
        other => other,
    };
    base.to_string()
}

/// No state of its own — every method is a pure projection.
pub struct ExecutionUiTranslator;

impl ExecutionUiTranslator {
    pub fn translate_snapshot(&self, snapshot: &ExecutionSnapshot) -> Value {
        json!({
            "action": snapshot.action_summary,
            "status": status_to_human(&snapshot.current_status),
            "needs_attention": snapshot.is_resumable,
            "finished": snapshot.is_terminal,
            "irreversible": snapshot.has_side_effects,
            "result": snapshot.result,
            "error": snapshot.error_message,
        })
    }

    pub fn translate_consequence(&self, view: &ExecutionConsequenceView) -> Value {
        json!({
            "action": view.action_summary,
            "outcome": consequence_to_human(&view.consequence_label, view.has_side_effects),
            "irreversible": view.has_side_effects,
            "was_confirmed": view.was_suspended,
            "still_in_progress": view.is_still_pending,
            "result": view.result,
            "error": view.error_message,
            "duration_ms": view.total_duration_ms,
        })
    }

    pub fn translate_timeline(&self, timeline: &ExecutionTimeline) -> Value {
        let actions: Vec<Value> = timeline
            .contracts
            .iter()
            .map(|snap| {
                json!({
                    "action": snap.action_summary,
                    "status": status_to_human(&snap.current_status),
                    "finished": snap.is_terminal,
                    "irreversible": snap.has_side_effects,
                    "result": snap.result,
                    "error": snap.error_message,
                })
            })
            .collect();

        json!({
            "actions": actions,
            "total": timeline.total_contracts,
            "finished": timeline.terminal_contracts,
            "in_progress": timeline.active_contracts,
            "has_pending_confirmation": timeline.has_suspended,
            "has_irreversible_action": timeline.has_irreversible_completed,
        })
    }
}

/// Recursively checks that no object key in `value` appears in `FORBIDDEN_KEYS`.
pub fn contains_forbidden_key(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if let Some(found) = FORBIDDEN_KEYS.iter().find(|f| *f == k) {
                    return Some(found);
                }
                if let Some(found) = contains_forbidden_key(v) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(contains_forbidden_key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::snapshot;
    use noetic_contracts::{ActionType, Actor, ExecutionContract};
    use serde_json::json as j;

    #[test]
    fn translated_snapshot_has_no_forbidden_keys() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, j!({"service": "billing", "method": "charge"}), true);
        c.transition("start", Actor::ToolNode, None).unwrap();
        c.transition("succeed", Actor::ToolNode, None).unwrap();
        let out = ExecutionUiTranslator.translate_snapshot(&snapshot(&c));
        assert_eq!(contains_forbidden_key(&out), None);
        assert_eq!(out["status"], "done");
        assert_eq!(out["irreversible"], true);
    }

    #[test]
    fn unknown_status_passes_through_unchanged() {
        assert_eq!(status_to_human("made_up"), "made_up");
    }
}
