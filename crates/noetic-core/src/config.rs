use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (`noetic.toml` + `NOETIC_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoeticConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl Default for NoeticConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            providers: ProvidersConfig::default(),
            graph: GraphConfig::default(),
            memory: MemoryConfig::default(),
            features: FeaturesConfig::default(),
        }
    }
}

/// Subsystem toggles. Each defaults to enabled; set the bare (unprefixed)
/// env var to `false`/`0` to disable a subsystem without touching the graph
/// wiring that calls it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_true")]
    pub use_memory_emotion_system: bool,
    #[serde(default = "default_true")]
    pub use_hitl_system: bool,
    #[serde(default = "default_true")]
    pub use_intent_recognition: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            use_memory_emotion_system: true,
            use_hitl_system: true,
            use_intent_recognition: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base directory `/live2d/<path>` serves bytes from (§6).
    #[serde(default = "default_live2d_dir")]
    pub live2d_dir: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            live2d_dir: default_live2d_dir(),
        }
    }
}

fn default_live2d_dir() -> String {
    "./live2d".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Configuration for the remote language model used by reasoning and the
/// Layer-2 intent classifier. The model's own semantics are out of scope;
/// only the call surface lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_model")]
    pub model: String,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub vision_model: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: None,
            api_key: None,
            vision_model: None,
        }
    }
}

/// Loop-guard bounds for the cognitive graph orchestrator (§4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_outer_loop_max")]
    pub outer_loop_max: u32,
    #[serde(default = "default_inner_loop_max")]
    pub inner_loop_max: u32,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            outer_loop_max: default_outer_loop_max(),
            inner_loop_max: default_inner_loop_max(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl GraphConfig {
    /// The default tool-call timeout (§5) a Contract falls back to when it
    /// doesn't carry its own `timeout_seconds`.
    pub fn tool_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Retrieval tuning knobs (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
    #[serde(default = "default_candidate_ceiling")]
    pub candidate_ceiling: usize,
    #[serde(default = "default_working_memory_cap_bytes")]
    pub working_memory_cap_bytes: usize,
    #[serde(default = "default_max_memory_entries")]
    pub max_memory_entries: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recall_limit: default_recall_limit(),
            candidate_ceiling: default_candidate_ceiling(),
            working_memory_cap_bytes: default_working_memory_cap_bytes(),
            max_memory_entries: default_max_memory_entries(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_outer_loop_max() -> u32 {
    2
}
fn default_inner_loop_max() -> u32 {
    5
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_recall_limit() -> usize {
    5
}
fn default_candidate_ceiling() -> usize {
    50
}
fn default_working_memory_cap_bytes() -> usize {
    64 * 1024
}
fn default_max_memory_entries() -> usize {
    2000
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.noetic/noetic.db", home)
}

impl NoeticConfig {
    /// Load config from a TOML file with `NOETIC_*` env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: NoeticConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("NOETIC_").split("_"))
            .merge(Env::raw().only(&[
                "use_memory_emotion_system",
                "use_hitl_system",
                "use_intent_recognition",
            ]).map(|k| format!("features.{k}").into()))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.noetic/noetic.toml", home)
}
