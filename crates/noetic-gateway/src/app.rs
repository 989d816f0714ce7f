use crate::http::vector_proxy::{UnconfiguredVectorStore, VectorStoreClient};
use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use noetic_core::config::NoeticConfig;
use noetic_forms::PendingFormTable;
use noetic_graph::GraphServices;
use noetic_intent::IntentMatcher;
use noetic_llm::{LlmProvider, OpenAiCompatProvider};
use noetic_storage::Store;
use noetic_toolhost::ToolHostManager;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Central shared state, handed to every handler as `Arc<AppState>` —
/// mirrors `skynet-gateway::app::AppState`'s role, generalized to this
/// spec's services (§4.K).
pub struct AppState {
    pub config: NoeticConfig,
    pub store: Arc<Store>,
    pub tool_hosts: ToolHostManager,
    pub pending_forms: PendingFormTable,
    pub intent_matcher: IntentMatcher,
    pub llm: Box<dyn LlmProvider>,
    /// The embedding/vector-store collaborator (§1) — out of scope to
    /// implement, so this is always `UnconfiguredVectorStore` today.
    pub vector_store: Box<dyn VectorStoreClient>,
    /// Per-session run lock: only one graph turn for a given session may be
    /// in progress at a time (§5). Keyed lazily — a session's first turn
    /// inserts its own guard.
    pub session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(config: NoeticConfig) -> anyhow::Result<Self> {
        let store = Arc::new(Store::open(&config.database.path)?);
        let tool_hosts = ToolHostManager::new(Arc::clone(&store));
        let intent_matcher = IntentMatcher::new()?;
        let llm: Box<dyn LlmProvider> = Box::new(OpenAiCompatProvider::new(
            config
                .providers
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            config.providers.api_key.clone(),
        ));

        Ok(Self {
            config,
            store,
            tool_hosts,
            pending_forms: PendingFormTable::new(),
            intent_matcher,
            llm,
            vector_store: Box::new(UnconfiguredVectorStore),
            session_locks: DashMap::new(),
        })
    }

    /// The run-lock for one session, created on first use.
    pub fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Bundle the dependencies one `run_turn` call needs. Borrows `self`,
    /// so it cannot outlive the caller's turn — built fresh per request
    /// rather than stored, since `GraphServices` is itself all borrows.
    pub fn graph_services(&self) -> GraphServices<'_> {
        GraphServices {
            store: &self.store,
            tool_hosts: &self.tool_hosts,
            pending_forms: &self.pending_forms,
            intent_matcher: &self.intent_matcher,
            llm: self.llm.as_ref(),
            model: self.config.providers.model.clone(),
            intent_model: None,
            mcp_priority: 20,
            confidence_threshold: 0.5,
            graph: self.config.graph.clone(),
            memory: self.config.memory.clone(),
            features: self.config.features.clone(),
            form_ttl_secs: 900.0,
        }
    }
}

/// Assemble the full Axum router (§4.K, §6).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/task", post(crate::http::task::task_handler))
        .route("/answer", post(crate::http::answer::answer_handler))
        .route("/generate", post(crate::http::vector_proxy::generate))
        .route("/search", post(crate::http::vector_proxy::search))
        .route("/compare", post(crate::http::vector_proxy::compare))
        .route("/documents", post(crate::http::vector_proxy::documents))
        .route("/delete", get(crate::http::vector_proxy::delete))
        .route("/export", post(crate::http::vector_proxy::export))
        .route("/live2d/{*path}", get(crate::http::live2d::serve))
        .route("/executions/{session_id}", get(crate::http::executions::get_session_timeline))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(tower_http::cors::CorsLayer::permissive())
}
