pub mod error;
pub mod types;

pub use error::{ContractError, Result};
pub use types::{
    can_create, compute_idempotency_key, valid_triggers_from, ActionType, Actor, ExecutionContract,
    ExecutionStatus, Transition,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_call_detail() -> serde_json::Value {
        json!({"service": "weather", "method": "get", "args": {"city": "北京"}})
    }

    #[test]
    fn transition_success_updates_status_and_appends_record() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, tool_call_detail(), false);
        assert_eq!(c.status, ExecutionStatus::Pending);
        c.transition("start", Actor::ToolNode, None).unwrap();
        assert_eq!(c.status, ExecutionStatus::Running);
        c.transition("succeed", Actor::ToolNode, None).unwrap();
        assert_eq!(c.status, ExecutionStatus::Completed);
        assert_eq!(c.transitions.len(), 2);
    }

    #[test]
    fn invalid_transition_leaves_state_untouched() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, tool_call_detail(), false);
        let before = c.clone();
        let err = c.transition("succeed", Actor::ToolNode, None).unwrap_err();
        assert!(matches!(err, ContractError::InvalidTransition { .. }));
        assert_eq!(c.status, before.status);
        assert_eq!(c.transitions.len(), before.transitions.len());
    }

    #[test]
    fn terminal_status_admits_no_trigger() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, tool_call_detail(), false);
        c.transition("start", Actor::ToolNode, None).unwrap();
        c.transition("fail", Actor::ToolNode, None).unwrap();
        assert!(c.status.is_terminal());
        for trigger in ["start", "succeed", "fail", "reject", "suspend", "cancel", "resume", "timeout"] {
            assert!(c.transition(trigger, Actor::ToolNode, None).is_err());
        }
    }

    #[test]
    fn idempotency_key_blocks_duplicate_irreversible_completed() {
        let detail = tool_call_detail();
        let mut first = ExecutionContract::new(ActionType::ToolCall, detail.clone(), true);
        assert!(can_create(&detail, &[]));
        first.transition("start", Actor::ToolNode, None).unwrap();
        first.transition("succeed", Actor::ToolNode, None).unwrap();
        assert!(!can_create(&detail, &[first.clone()]));

        // A reversible duplicate does not block.
        let reversible = ExecutionContract::new(ActionType::ToolCall, detail.clone(), false);
        assert!(can_create(&detail, &[reversible]));
    }

    #[test]
    fn idempotency_key_format() {
        let key = compute_idempotency_key(&tool_call_detail()).unwrap();
        let mut parts = key.splitn(3, ':');
        assert_eq!(parts.next(), Some("weather"));
        assert_eq!(parts.next(), Some("get"));
        assert_eq!(parts.next().unwrap().len(), 8);
    }

    #[test]
    fn contract_roundtrips_through_json() {
        let mut c = ExecutionContract::new(ActionType::ToolCall, tool_call_detail(), false);
        c.transition("start", Actor::ToolNode, None).unwrap();
        c.transition("succeed", Actor::ToolNode, Some("done".into())).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: ExecutionContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, c.status);
        assert_eq!(back.transitions.len(), c.transitions.len());
        assert_eq!(back.result, c.result);
        assert_eq!(back.error_message, c.error_message);
    }
}
