//! The shared dependencies every node needs, bundled so `run_turn` and the
//! node functions don't each grow an ever-longer parameter list.

use noetic_core::config::{FeaturesConfig, GraphConfig, MemoryConfig};
use noetic_forms::PendingFormTable;
use noetic_intent::IntentMatcher;
use noetic_llm::LlmProvider;
use noetic_storage::Store;
use noetic_toolhost::ToolHostManager;

pub struct GraphServices<'a> {
    pub store: &'a Store,
    pub tool_hosts: &'a ToolHostManager,
    pub pending_forms: &'a PendingFormTable,
    pub intent_matcher: &'a IntentMatcher,
    pub llm: &'a dyn LlmProvider,
    /// Model used for reasoning's own turn completion.
    pub model: String,
    /// Model used by the Layer-2 intent classifier, if configured distinctly.
    pub intent_model: Option<String>,
    /// Priority a dynamic MCP trigger rule is spliced in at (§4.E).
    pub mcp_priority: i32,
    pub confidence_threshold: f64,
    pub graph: GraphConfig,
    pub memory: MemoryConfig,
    pub features: FeaturesConfig,
    /// Default external-step TTL in seconds, applied when a form request
    /// doesn't declare its own.
    pub form_ttl_secs: f64,
}
