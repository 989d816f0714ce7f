use crate::error::{Result, ToolHostError};
use crate::types::{RunState, ToolHostConfig, ToolHostStatus};
use noetic_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

const REGISTRY_KEY: &str = "tool_hosts";
const STOP_GRACE: std::time::Duration = std::time::Duration::from_secs(5);

/// A live subprocess: the child handle (for waiting/reaping) plus a mutex
/// around its stdin/stdout pair, shared with the executor. The mutex
/// serializes concurrent calls to the *same* host while leaving calls to
/// different hosts fully concurrent.
pub struct RunningHost {
    pub(crate) child: Child,
    pub(crate) pid: u32,
    pub(crate) io: Arc<AsyncMutex<(ChildStdin, BufReader<ChildStdout>)>>,
    pub(crate) last_error: Option<String>,
}

/// Owns the tool-host configuration registry and every currently running
/// subprocess. Spawns via `tokio::process::Command` and drives `wait` on a
/// spawned task rather than blocking the runtime thread, the same pattern
/// `TerminalManager::exec` uses for one-shot commands.
pub struct ToolHostManager {
    store: Arc<Store>,
    running: AsyncMutex<HashMap<String, RunningHost>>,
}

impl ToolHostManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            running: AsyncMutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub fn list_configs(&self) -> Result<Vec<ToolHostConfig>> {
        load_registry(&self.store)
    }

    #[instrument(skip(self))]
    pub fn register(&self, config: ToolHostConfig) -> Result<()> {
        let mut registry = load_registry(&self.store)?;
        if registry.iter().any(|c| c.name == config.name) {
            return Err(ToolHostError::AlreadyExists(config.name));
        }
        registry.push(config);
        save_registry(&self.store, &registry)
    }

    #[instrument(skip(self))]
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut registry = load_registry(&self.store)?;
        registry.retain(|c| c.name != name);
        save_registry(&self.store, &registry)
    }

    #[instrument(skip(self))]
    pub async fn start(&self, name: &str) -> Result<()> {
        let registry = load_registry(&self.store)?;
        let config = registry
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ToolHostError::NotFound(name.to_string()))?
            .clone();

        let mut running = self.running.lock().await;
        if running.contains_key(name) {
            return Ok(());
        }

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                command.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let mut child = command.spawn().map_err(|source| ToolHostError::Spawn {
            name: name.to_string(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| ToolHostError::Spawn {
            name: name.to_string(),
            source: std::io::Error::other("child exited before pid was observed"),
        })?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        info!(host = %name, pid, "noetic-toolhost: started tool host");

        running.insert(
            name.to_string(),
            RunningHost {
                child,
                pid,
                io: Arc::new(AsyncMutex::new((stdin, BufReader::new(stdout)))),
                last_error: None,
            },
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&self, name: &str) -> Result<()> {
        let mut running = self.running.lock().await;
        let Some(mut host) = running.remove(name) else {
            return Ok(());
        };
        stop_host(name, &mut host).await;
        Ok(())
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        self.stop(name).await?;
        self.start(name).await
    }

    #[instrument(skip(self))]
    pub async fn stop_all(&self) {
        let mut running = self.running.lock().await;
        for (name, mut host) in running.drain() {
            stop_host(&name, &mut host).await;
        }
    }

    /// Status derived from process exit state — an entry absent from the
    /// running map is `Stopped`. A process that has exited is also
    /// `Stopped` if it exited cleanly, or `Errored` (with `last_error` set)
    /// if it didn't; a subsequent successful `start` clears the error.
    pub async fn status(&self, name: &str) -> Result<ToolHostStatus> {
        let mut running = self.running.lock().await;
        match running.get_mut(name) {
            None => Ok(ToolHostStatus {
                name: name.to_string(),
                state: RunState::Stopped,
                pid: None,
                last_error: None,
            }),
            Some(host) => {
                if let Ok(Some(exit)) = host.child.try_wait() {
                    let (state, last_error) = if exit.success() {
                        (RunState::Stopped, None)
                    } else {
                        let message = format!("exited with {exit}");
                        host.last_error = Some(message.clone());
                        (RunState::Errored, Some(message))
                    };
                    let status = ToolHostStatus {
                        name: name.to_string(),
                        state,
                        pid: None,
                        last_error,
                    };
                    running.remove(name);
                    return Ok(status);
                }
                Ok(ToolHostStatus {
                    name: name.to_string(),
                    state: RunState::Running,
                    pid: Some(host.pid),
                    last_error: None,
                })
            }
        }
    }

    pub async fn list_status(&self) -> Result<Vec<ToolHostStatus>> {
        let configs = self.list_configs()?;
        let mut out = Vec::with_capacity(configs.len());
        for config in configs {
            out.push(self.status(&config.name).await?);
        }
        Ok(out)
    }

    pub(crate) async fn io_for(
        &self,
        name: &str,
    ) -> Result<Arc<AsyncMutex<(ChildStdin, BufReader<ChildStdout>)>>> {
        let running = self.running.lock().await;
        running
            .get(name)
            .map(|h| Arc::clone(&h.io))
            .ok_or_else(|| ToolHostError::NotRunning(name.to_string()))
    }

    pub fn running_hosts_with_descriptions(&self) -> Result<Vec<(String, Option<String>)>> {
        Ok(self
            .list_configs()?
            .into_iter()
            .map(|c| (c.name, c.description))
            .collect())
    }
}

/// `SIGTERM` the process group, wait up to 5s, then `SIGKILL` — the exact
/// sequence `mcp_manager.py::stop_server` uses.
async fn stop_host(name: &str, host: &mut RunningHost) {
    #[cfg(unix)]
    unsafe {
        libc::kill(-(host.pid as libc::pid_t), libc::SIGTERM);
    }
    #[cfg(not(unix))]
    {
        let _ = host.child.start_kill();
    }

    match tokio::time::timeout(STOP_GRACE, host.child.wait()).await {
        Ok(_) => info!(host = %name, "noetic-toolhost: stopped tool host gracefully"),
        Err(_) => {
            warn!(host = %name, "noetic-toolhost: grace period elapsed, sending SIGKILL");
            #[cfg(unix)]
            unsafe {
                libc::kill(-(host.pid as libc::pid_t), libc::SIGKILL);
            }
            let _ = host.child.kill().await;
        }
    }
}

fn load_registry(store: &Store) -> Result<Vec<ToolHostConfig>> {
    match store.get_setting(REGISTRY_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn save_registry(store: &Store, registry: &[ToolHostConfig]) -> Result<()> {
    let raw = serde_json::to_string(registry)?;
    store.set_setting(REGISTRY_KEY, &raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_roundtrips_through_settings() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let manager = ToolHostManager::new(Arc::clone(&store));
        manager
            .register(ToolHostConfig {
                name: "weather".to_string(),
                command: "weather-mcp".to_string(),
                args: vec![],
                env: Default::default(),
                enabled: true,
                trigger_keywords: vec!["forecast".to_string()],
                description: Some("weather lookups".to_string()),
            })
            .unwrap();
        let configs = manager.list_configs().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "weather");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let manager = ToolHostManager::new(Arc::clone(&store));
        let config = ToolHostConfig {
            name: "weather".to_string(),
            command: "weather-mcp".to_string(),
            args: vec![],
            env: Default::default(),
            enabled: true,
            trigger_keywords: vec![],
            description: None,
        };
        manager.register(config.clone()).unwrap();
        assert!(matches!(
            manager.register(config),
            Err(ToolHostError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn status_of_unregistered_host_is_stopped() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let manager = ToolHostManager::new(store);
        let status = manager.status("ghost").await.unwrap();
        assert_eq!(status.state, RunState::Stopped);
    }
}
