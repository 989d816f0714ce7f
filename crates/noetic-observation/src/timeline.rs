//! Batched, session-scoped views over a set of contracts: every transition
//! any of them has been through (`TransitionRecord`) and the aggregate
//! `ExecutionTimeline` the observation API hands back for a session.

use crate::snapshot::{snapshot, ExecutionSnapshot};
use noetic_contracts::{Actor, ExecutionContract, ExecutionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub execution_id: String,
    pub sequence_number: usize,
    pub from_status: String,
    pub to_status: String,
    pub trigger: String,
    pub actor: String,
    pub actor_category: String,
    pub timestamp: f64,
    pub is_terminal_transition: bool,
}

fn actor_category(actor: &str) -> &'static str {
    for a in [
        Actor::ToolNode,
        Actor::EcsNode,
        Actor::GraphRunner,
        Actor::User,
        Actor::System,
        Actor::ExecutionEvent,
    ] {
        if a.label() == actor {
            return a.category();
        }
    }
    "system"
}

pub fn transition_records(contract: &ExecutionContract) -> Vec<TransitionRecord> {
    contract
        .transitions
        .iter()
        .enumerate()
        .map(|(i, t)| TransitionRecord {
            execution_id: contract.execution_id.clone(),
            sequence_number: i,
            from_status: t.from.value().to_string(),
            to_status: t.to.value().to_string(),
            trigger: t.trigger.clone(),
            actor: t.actor.clone(),
            actor_category: actor_category(&t.actor).to_string(),
            timestamp: t.timestamp,
            is_terminal_transition: t.to.is_terminal(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTimeline {
    pub session_id: String,
    pub contracts: Vec<ExecutionSnapshot>,
    pub transitions: Vec<TransitionRecord>,
    pub total_contracts: usize,
    pub terminal_contracts: usize,
    pub active_contracts: usize,
    pub has_suspended: bool,
    pub has_irreversible_completed: bool,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
}

/// Project a session's contracts into a sorted, aggregated timeline (§4.L).
pub fn timeline(session_id: &str, contracts: &[ExecutionContract]) -> ExecutionTimeline {
    let mut snapshots: Vec<ExecutionSnapshot> = contracts.iter().map(snapshot).collect();
    snapshots.sort_by(|a, b| a.entered_at.partial_cmp(&b.entered_at).unwrap());

    let mut transitions: Vec<TransitionRecord> = contracts.iter().flat_map(transition_records).collect();
    transitions.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap());

    let terminal_count = contracts.iter().filter(|c| c.status.is_terminal()).count();
    let waiting_count = contracts.iter().filter(|c| c.status == ExecutionStatus::Waiting).count();
    let has_irreversible_completed = contracts
        .iter()
        .any(|c| c.irreversible && c.status == ExecutionStatus::Completed);

    let started_at = contracts.iter().map(|c| c.created_at).fold(None, |acc, t| {
        Some(acc.map_or(t, |a: f64| a.min(t)))
    });
    let ended_at = if !contracts.is_empty() && terminal_count == contracts.len() {
        contracts
            .iter()
            .flat_map(|c| c.transitions.iter().map(|t| t.timestamp))
            .fold(None, |acc, t| Some(acc.map_or(t, |a: f64| a.max(t))))
    } else {
        None
    };

    ExecutionTimeline {
        session_id: session_id.to_string(),
        contracts: snapshots,
        transitions,
        total_contracts: contracts.len(),
        terminal_contracts: terminal_count,
        active_contracts: contracts.len() - terminal_count,
        has_suspended: waiting_count > 0,
        has_irreversible_completed,
        started_at,
        ended_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noetic_contracts::ActionType;
    use serde_json::json;

    #[test]
    fn timeline_sorts_by_entered_at_and_counts_terminal_vs_active() {
        let mut done = ExecutionContract::new(ActionType::ToolCall, json!({"service": "a", "method": "x"}), false);
        done.transition("start", Actor::ToolNode, None).unwrap();
        done.transition("succeed", Actor::ToolNode, None).unwrap();

        let pending = ExecutionContract::new(ActionType::ToolCall, json!({"service": "b", "method": "y"}), false);

        let tl = timeline("s1", &[done, pending]);
        assert_eq!(tl.total_contracts, 2);
        assert_eq!(tl.terminal_contracts, 1);
        assert_eq!(tl.active_contracts, 1);
        assert!(!tl.has_suspended);
    }

    #[test]
    fn timeline_flags_has_suspended_and_has_irreversible_completed() {
        let mut waiting = ExecutionContract::new(ActionType::EcsRequest, json!({}), false);
        waiting.transition("start", Actor::EcsNode, None).unwrap();
        waiting.transition("suspend", Actor::EcsNode, None).unwrap();

        let mut irreversible = ExecutionContract::new(ActionType::ToolCall, json!({"service": "billing", "method": "charge"}), true);
        irreversible.transition("start", Actor::ToolNode, None).unwrap();
        irreversible.transition("succeed", Actor::ToolNode, None).unwrap();

        let tl = timeline("s1", &[waiting, irreversible]);
        assert!(tl.has_suspended);
        assert!(tl.has_irreversible_completed);
    }
}
