pub mod error;
pub mod node;
pub mod nodes;
pub mod orchestrator;
pub mod services;
pub mod state;

pub use error::{GraphError, Result};
pub use node::{NullObserver, TurnObserver};
pub use orchestrator::run_turn;
pub use services::GraphServices;
pub use state::{
    DialogueMessage, EmotionalContext, ExecutionStep, GraphState, GraphStatus, MemoryRef,
    SemanticInput, ToolCallSpec, WorkingMemoryView,
};

#[cfg(test)]
mod tests {
    use super::*;
    use noetic_contracts::ExecutionStatus;
    use noetic_core::config::{FeaturesConfig, GraphConfig, MemoryConfig};
    use noetic_forms::PendingFormTable;
    use noetic_intent::IntentMatcher;
    use noetic_llm::{ChatRequest, ChatResponse, LlmProvider};
    use noetic_storage::Store;
    use noetic_toolhost::ToolHostManager;
    use std::sync::Arc;

    struct ScriptedProvider {
        replies: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _req: &ChatRequest) -> noetic_llm::Result<ChatResponse> {
            let mut replies = self.replies.lock().unwrap();
            let content = if replies.is_empty() {
                "{\"emotion\":{\"primary\":\"neutral\",\"confidence\":1.0},\"response\":\"done\",\"memory_update\":{\"should_store\":false,\"entries\":[]}}".to_string()
            } else {
                replies.remove(0)
            };
            Ok(ChatResponse {
                content,
                model: "scripted".to_string(),
            })
        }
    }

    fn harness(replies: Vec<&str>) -> (Store, ToolHostManager, PendingFormTable, IntentMatcher, ScriptedProvider) {
        let store = Store::open_in_memory().unwrap();
        let tool_hosts = ToolHostManager::new(Arc::new(Store::open_in_memory().unwrap()));
        let forms = PendingFormTable::new();
        let matcher = IntentMatcher::new().unwrap();
        let provider = ScriptedProvider {
            replies: std::sync::Mutex::new(replies.into_iter().map(String::from).collect()),
        };
        (store, tool_hosts, forms, matcher, provider)
    }

    #[tokio::test]
    async fn plain_turn_ends_without_tool_calls_or_ecs() {
        let (store, tool_hosts, forms, matcher, provider) = harness(vec![]);
        let services = GraphServices {
            store: &store,
            tool_hosts: &tool_hosts,
            pending_forms: &forms,
            intent_matcher: &matcher,
            llm: &provider,
            model: "test-model".to_string(),
            intent_model: None,
            mcp_priority: 10,
            confidence_threshold: 0.5,
            graph: GraphConfig::default(),
            memory: MemoryConfig::default(),
            features: FeaturesConfig::default(),
            form_ttl_secs: 900.0,
        };
        let mut state = GraphState::new("session-1", "hello there");
        let mut observer = NullObserver;

        run_turn(&services, &mut observer, &mut state).await.unwrap();

        assert_eq!(state.status, GraphStatus::Idle);
        assert_eq!(state.response.as_deref(), Some("done"));
        assert!(state.pending_tool_calls.is_empty());
        assert!(state.pending_executions.is_empty());
    }

    #[tokio::test]
    async fn tool_call_then_plain_reply_runs_one_outer_cycle() {
        let tool_call_reply = "{\"emotion\":{\"primary\":\"curious\",\"confidence\":0.9},\"response\":\"checking\",\"memory_update\":{\"should_store\":false,\"entries\":[]},\"tool_call\":{\"service\":\"weather\",\"method\":\"get\",\"args\":{\"city\":\"nyc\"},\"irreversible\":false}}";
        let (store, tool_hosts, forms, matcher, provider) = harness(vec![tool_call_reply]);
        let services = GraphServices {
            store: &store,
            tool_hosts: &tool_hosts,
            pending_forms: &forms,
            intent_matcher: &matcher,
            llm: &provider,
            model: "test-model".to_string(),
            intent_model: None,
            mcp_priority: 10,
            confidence_threshold: 0.5,
            graph: GraphConfig::default(),
            memory: MemoryConfig::default(),
            features: FeaturesConfig::default(),
            form_ttl_secs: 900.0,
        };
        let mut state = GraphState::new("session-2", "what's the weather");
        let mut observer = NullObserver;

        run_turn(&services, &mut observer, &mut state).await.unwrap();

        assert_eq!(state.status, GraphStatus::Idle);
        assert_eq!(state.completed_executions.len(), 1);
        assert_eq!(state.completed_executions[0].status, ExecutionStatus::Failed);
        assert_eq!(state.response.as_deref(), Some("done"));
    }
}
