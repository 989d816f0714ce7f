pub mod config;
pub mod error;
pub mod ids;

pub use config::NoeticConfig;
pub use error::{CoreError, Result};
pub use ids::SessionId;

/// Install a `tracing` subscriber reading `RUST_LOG` (default `info`).
/// Mirrors the teacher's gateway bootstrap — every binary in this workspace
/// calls this once at startup.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
