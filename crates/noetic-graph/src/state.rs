//! `GraphState` (§4.J): the single source of truth a turn carries through
//! every node. Every field here is (de)serialized as the opaque blob
//! `noetic-storage::{save_graph_state,load_graph_state}` persists, so a
//! suspended turn survives a process restart.

use noetic_contracts::ExecutionContract;
use noetic_emotion::{DetectedEmotion, MemoryUpdateEntry};
use noetic_intent::IntentResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// §3's closed status set: `idle` is a session with no turn in flight (the
/// terminal state of a turn that ended normally, and the state before the
/// first turn ever runs); `processing` while a turn is driving the graph;
/// `suspended` while waiting on a form answer; `error` after a fatal node
/// failure (§7 "Invalid transition on a Contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStatus {
    Idle,
    Processing,
    Suspended,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticInput {
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub image_action: Option<String>,
    #[serde(default)]
    pub raw_event: Option<Value>,
}

/// Set by the emotion node ahead of reasoning, consumed as a prompt clause.
/// Not to be confused with `detected_emotion`, which is parsed out of
/// reasoning's own structured output after the fact (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalContext {
    pub current_emotion: String,
    pub valence: f64,
    pub arousal: f64,
    pub modulation_instruction: String,
}

impl Default for EmotionalContext {
    fn default() -> Self {
        Self {
            current_emotion: "neutral".to_string(),
            valence: 0.0,
            arousal: 0.2,
            modulation_instruction: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRef {
    pub id: String,
    pub content: String,
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingMemoryView {
    pub current_topic: Option<String>,
    #[serde(default)]
    pub short_term_context: Vec<Value>,
    #[serde(default)]
    pub current_goals: Vec<String>,
    pub retrieved_memories: Vec<MemoryRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub role: String,
    pub content: String,
}

/// One appended entry in the execution trace — a human-readable record of
/// what each node did this turn, independent of the Contract transition log
/// (§4.J, §4.L).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub node: String,
    pub action: String,
    pub detail: Option<String>,
    pub timestamp: f64,
}

/// A tool call the reasoning node parsed out of the model's turn output and
/// approved for execution. The Tools node locates its matching Contract by
/// `(service, method)` FIFO among `pending_executions` rather than by id
/// (§4.J) — a blocked (idempotency-refused) call never reaches here at all,
/// since reasoning sets `idempotency_refused` and loops back to itself
/// instead of appending to `pending_tool_calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallSpec {
    pub service: String,
    pub method: String,
    pub args: Value,
    #[serde(default)]
    pub irreversible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphState {
    pub conversation_id: String,
    pub status: GraphStatus,
    pub semantic_input: SemanticInput,
    pub emotional_context: EmotionalContext,
    pub working_memory: WorkingMemoryView,
    pub dialogue_history: Vec<DialogueMessage>,
    pub execution_trace: Vec<ExecutionStep>,
    /// Brief human summary of a pending external-step request, for callers
    /// that just want a one-liner.
    pub ecs_request: Option<String>,
    /// The full external-step request as stored in `PendingFormTable`,
    /// serialized — kept here too so a resumed turn can re-render it.
    pub ecs_full_request: Option<Value>,
    pub last_human_input: Option<Value>,
    pub observation: Option<String>,
    pub pending_tool_calls: Vec<ToolCallSpec>,
    pub response: Option<String>,
    pub detected_emotion: Option<DetectedEmotion>,
    pub memories_to_store: Vec<MemoryUpdateEntry>,
    pub tool_call_history: Vec<String>,
    pub pending_executions: Vec<ExecutionContract>,
    pub completed_executions: Vec<ExecutionContract>,
    pub intent_result: Option<IntentResult>,
    pub outer_iterations: u32,
    pub inner_iterations: u32,
    /// Set by the reasoning node when `can_create` blocks a tool call (§5);
    /// the orchestrator routes straight back to reasoning instead of
    /// through Tools, and clears it before the next reasoning call.
    #[serde(default)]
    pub idempotency_refused: bool,
}

impl GraphState {
    pub fn new(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            status: GraphStatus::Processing,
            semantic_input: SemanticInput {
                text: text.into(),
                ..Default::default()
            },
            emotional_context: EmotionalContext::default(),
            working_memory: WorkingMemoryView::default(),
            dialogue_history: Vec::new(),
            execution_trace: Vec::new(),
            ecs_request: None,
            ecs_full_request: None,
            last_human_input: None,
            observation: None,
            pending_tool_calls: Vec::new(),
            response: None,
            detected_emotion: None,
            memories_to_store: Vec::new(),
            tool_call_history: Vec::new(),
            pending_executions: Vec::new(),
            completed_executions: Vec::new(),
            intent_result: None,
            outer_iterations: 0,
            inner_iterations: 0,
            idempotency_refused: false,
        }
    }

    /// All Contracts this turn knows about, pending first — the set the
    /// reasoning node's idempotency check (§5) runs `can_create` against.
    pub fn all_contracts(&self) -> Vec<ExecutionContract> {
        self.pending_executions
            .iter()
            .chain(self.completed_executions.iter())
            .cloned()
            .collect()
    }

    pub fn trace(&mut self, node: &str, action: &str, detail: Option<String>) {
        self.execution_trace.push(ExecutionStep {
            node: node.to_string(),
            action: action.to_string(),
            detail,
            timestamp: now_secs(),
        });
    }
}

pub fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
