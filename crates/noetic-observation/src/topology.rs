//! The static state-machine topology (§4.L), derived from
//! `noetic_contracts::valid_triggers_from` rather than hand-duplicated —
//! the topology and the transition table it describes cannot drift apart.

use noetic_contracts::{valid_triggers_from, ExecutionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateNode {
    pub status: String,
    pub is_terminal: bool,
    pub is_initial: bool,
    pub is_stable: bool,
    pub is_resumable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransitionEdge {
    pub from_status: String,
    pub to_status: String,
    pub trigger: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenTransition {
    pub from_status: String,
    pub to_status: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMachineTopology {
    pub nodes: Vec<StateNode>,
    pub edges: Vec<StateTransitionEdge>,
    pub forbidden_transitions: Vec<ForbiddenTransition>,
    pub terminal_statuses: Vec<String>,
    pub resumable_statuses: Vec<String>,
    pub initial_status: String,
}

pub fn topology() -> StateMachineTopology {
    let all = ExecutionStatus::all();

    let nodes: Vec<StateNode> = all
        .iter()
        .map(|&status| StateNode {
            status: status.value().to_string(),
            is_terminal: status.is_terminal(),
            is_initial: status == ExecutionStatus::Pending,
            is_stable: status.is_terminal() || status == ExecutionStatus::Waiting,
            is_resumable: status == ExecutionStatus::Waiting,
        })
        .collect();

    let mut edges = Vec::new();
    let mut valid_pairs = Vec::new();
    for &from in all {
        for (trigger, to) in valid_triggers_from(from) {
            valid_pairs.push((from, to));
            edges.push(StateTransitionEdge {
                from_status: from.value().to_string(),
                to_status: to.value().to_string(),
                trigger: trigger.to_string(),
            });
        }
    }

    let mut forbidden = Vec::new();
    for &from in all {
        for &to in all {
            if from == to || valid_pairs.iter().any(|&(f, t)| f == from && t == to) {
                continue;
            }
            let reason = if from.is_terminal() {
                format!("{} is a terminal state, no outbound transitions", from.value())
            } else {
                format!("no valid trigger from {} to {}", from.value(), to.value())
            };
            forbidden.push(ForbiddenTransition {
                from_status: from.value().to_string(),
                to_status: to.value().to_string(),
                reason,
            });
        }
    }

    StateMachineTopology {
        nodes,
        edges,
        forbidden_transitions: forbidden,
        terminal_statuses: all
            .iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.value().to_string())
            .collect(),
        resumable_statuses: vec![ExecutionStatus::Waiting.value().to_string()],
        initial_status: ExecutionStatus::Pending.value().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_has_one_node_per_status_and_no_outbound_edges_from_terminal() {
        let topo = topology();
        assert_eq!(topo.nodes.len(), ExecutionStatus::all().len());
        for status in ["completed", "failed", "rejected", "cancelled"] {
            assert!(
                topo.edges.iter().all(|e| e.from_status != status),
                "terminal status {status} must have no outbound edges"
            );
        }
    }

    #[test]
    fn topology_initial_status_is_pending() {
        assert_eq!(topology().initial_status, "pending");
        assert_eq!(topology().resumable_statuses, vec!["waiting".to_string()]);
    }
}
