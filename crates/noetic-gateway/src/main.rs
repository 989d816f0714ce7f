use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod error;
mod http;
mod sse;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    noetic_core::init_tracing();

    // explicit path > NOETIC_CONFIG env > defaults.
    let config_path = std::env::var("NOETIC_CONFIG").ok();
    let config = noetic_core::config::NoeticConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        noetic_core::config::NoeticConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config)?);

    start_enabled_tool_hosts(&state).await;

    let router = app::build_router(state.clone());
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("noetic gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Boots every tool host the settings table marks `enabled` (§4.F). A host
/// that fails to start is logged and skipped — the policy table (§7) treats
/// tool-host start failure as visible-but-not-turn-blocking.
async fn start_enabled_tool_hosts(state: &app::AppState) {
    let configs = match state.tool_hosts.list_configs() {
        Ok(configs) => configs,
        Err(e) => {
            warn!("failed to load tool host configs: {e}");
            return;
        }
    };
    for config in configs.into_iter().filter(|c| c.enabled) {
        if let Err(e) = state.tool_hosts.start(&config.name).await {
            warn!(host = %config.name, error = %e, "tool host failed to start at boot");
        }
    }
}

async fn shutdown_signal(state: Arc<app::AppState>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down, stopping tool hosts");
    state.tool_hosts.stop_all().await;
}
