use crate::error::{ContractError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The execution contract's state machine (§4.B). Terminal statuses admit no
/// outbound transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Rejected,
    Waiting,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Rejected
                | ExecutionStatus::Cancelled
        )
    }

    pub fn value(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Rejected => "rejected",
            ExecutionStatus::Waiting => "waiting",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn all() -> &'static [ExecutionStatus] {
        &[
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Rejected,
            ExecutionStatus::Waiting,
            ExecutionStatus::Cancelled,
        ]
    }
}

/// Who applied a transition. Used for both the audit trail and the
/// observation layer's actor-category projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    ToolNode,
    EcsNode,
    GraphRunner,
    User,
    System,
    ExecutionEvent,
}

impl Actor {
    pub fn label(self) -> &'static str {
        match self {
            Actor::ToolNode => "tool_node",
            Actor::EcsNode => "ecs_node",
            Actor::GraphRunner => "graph_runner",
            Actor::User => "user",
            Actor::System => "system",
            Actor::ExecutionEvent => "execution_event",
        }
    }

    /// Coarse category used by the observation layer (human vs. system vs.
    /// tool), mirroring `ACTOR_CATEGORY_MAP` in the source.
    pub fn category(self) -> &'static str {
        match self {
            Actor::User => "human",
            Actor::ToolNode | Actor::EcsNode | Actor::ExecutionEvent => "tool",
            Actor::GraphRunner | Actor::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ToolCall,
    EcsRequest,
}

impl ActionType {
    pub fn value(self) -> &'static str {
        match self {
            ActionType::ToolCall => "tool_call",
            ActionType::EcsRequest => "ecs_request",
        }
    }
}

/// One appended record in a contract's transition history. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
    pub trigger: String,
    pub timestamp: f64,
    pub actor: String,
    pub reason: Option<String>,
}

/// An explicit record of one side-effectful action with its lifecycle (§3, §4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContract {
    pub execution_id: String,
    pub action_type: ActionType,
    pub action_detail: Value,
    pub irreversible: bool,
    pub idempotency_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub status: ExecutionStatus,
    pub transitions: Vec<Transition>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
    /// Rolling `"{service}.{method}"` log, used by the graph orchestrator's
    /// inner loop guard to detect repeated tool calls within one turn.
    pub tool_call_history: Vec<String>,
    /// Free-form metadata set by the creating node (e.g. a form's context).
    pub metadata: Value,
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl ExecutionContract {
    pub fn new(action_type: ActionType, action_detail: Value, irreversible: bool) -> Self {
        let now = now_secs();
        let idempotency_key = if matches!(action_type, ActionType::ToolCall) {
            compute_idempotency_key(&action_detail)
        } else {
            None
        };
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            action_type,
            action_detail,
            irreversible,
            idempotency_key,
            timeout_seconds: None,
            status: ExecutionStatus::Pending,
            transitions: Vec::new(),
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            tool_call_history: Vec::new(),
            metadata: Value::Null,
        }
    }

    /// Attach a per-call timeout (§5 "before creating a new Contract"); the
    /// tools node falls back to the configured default when this is `None`.
    pub fn with_timeout_seconds(mut self, timeout_seconds: Option<u64>) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Attempt to apply `trigger` as `actor`. Fails with `InvalidTransition`
    /// when the trigger is not valid from the current status; on failure,
    /// no field of `self` is mutated (§4.B).
    pub fn transition(&mut self, trigger: &str, actor: Actor, reason: Option<String>) -> Result<()> {
        let to = next_status(self.status, trigger).ok_or_else(|| ContractError::InvalidTransition {
            trigger: trigger.to_string(),
            from: self.status,
        })?;

        let now = now_secs();
        let record = Transition {
            from: self.status,
            to,
            trigger: trigger.to_string(),
            timestamp: now,
            actor: actor.label().to_string(),
            reason,
        };
        self.status = to;
        self.updated_at = now;
        self.transitions.push(record);
        Ok(())
    }
}

/// The static `from --(trigger)--> to` lookup table (§4.B). A `match` rather
/// than a table keeps the transition logic and its enumeration from drifting
/// apart, matching `skynet-scheduler`'s preference for direct date-math over
/// indirection where the table would otherwise just be re-derived by hand.
fn next_status(from: ExecutionStatus, trigger: &str) -> Option<ExecutionStatus> {
    use ExecutionStatus::*;
    match (from, trigger) {
        (Pending, "start") => Some(Running),
        (Running, "succeed") => Some(Completed),
        (Running, "fail") => Some(Failed),
        (Running, "reject") => Some(Rejected),
        (Running, "suspend") => Some(Waiting),
        (Running, "cancel") => Some(Cancelled),
        (Waiting, "resume") => Some(Running),
        (Waiting, "cancel") => Some(Cancelled),
        (Waiting, "timeout") => Some(Cancelled),
        _ => None,
    }
}

/// All valid `(trigger, to)` pairs reachable from `from`. Used by the
/// observation layer to derive the static topology (§4.L).
pub fn valid_triggers_from(from: ExecutionStatus) -> Vec<(&'static str, ExecutionStatus)> {
    const TRIGGERS: &[&str] = &[
        "start", "succeed", "fail", "reject", "suspend", "cancel", "resume", "timeout",
    ];
    TRIGGERS
        .iter()
        .filter_map(|t| next_status(from, t).map(|to| (*t, to)))
        .collect()
}

/// `"{service}:{method}:{hash(args)}"` when both are present, else `None`.
/// The hash is an 8-hex-character truncated MD5 digest over the
/// canonically-sorted JSON args — a content fingerprint for deduplication,
/// not a security boundary.
pub fn compute_idempotency_key(action_detail: &Value) -> Option<String> {
    let service = action_detail.get("service")?.as_str()?;
    let method = action_detail.get("method")?.as_str()?;
    let args = action_detail.get("args").cloned().unwrap_or(Value::Null);
    let canonical = canonicalize(&args);
    let digest = md5::compute(canonical.as_bytes());
    let short = &hex::encode(digest.0)[..8];
    Some(format!("{service}:{method}:{short}"))
}

/// Serialize a JSON value with object keys sorted, matching Python's
/// `json.dumps(sorted(args.items()))` used by the source for hashing.
fn canonicalize(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.iter().map(|(k, v)| (k.clone(), sort(v))).collect();
                serde_json::to_value(sorted).unwrap_or(Value::Null)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value)).unwrap_or_default()
}

/// False iff some existing contract with the same idempotency key is
/// irreversible AND in status COMPLETED (§4.B).
pub fn can_create(action_detail: &Value, existing: &[ExecutionContract]) -> bool {
    let Some(key) = compute_idempotency_key(action_detail) else {
        return true;
    };
    !existing.iter().any(|c| {
        c.irreversible
            && c.status == ExecutionStatus::Completed
            && c.idempotency_key.as_deref() == Some(key.as_str())
    })
}
