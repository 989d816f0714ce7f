use crate::error::Result;
use crate::manager::ToolHostManager;
use crate::types::ToolExecutionOutcome;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::{instrument, warn};
use uuid::Uuid;

/// Used only when a caller has no more specific timeout to hand in (e.g.
/// tests); the graph's tools node always sources this from the Contract or
/// `GraphConfig::tool_timeout` instead (§5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(serde::Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(serde::Deserialize)]
struct RpcError {
    message: String,
}

/// Executes one JSON-RPC 2.0 call against a running tool host over its
/// stdio pipe. Each invocation is a single request/response pair — no
/// streaming. Any I/O or parse failure yields a failed outcome; this never
/// propagates an error out to the caller.
#[instrument(skip(manager, args))]
pub async fn execute(
    manager: &ToolHostManager,
    host_name: &str,
    method: &str,
    args: Value,
    timeout: Duration,
) -> Result<ToolExecutionOutcome> {
    let io = match manager.io_for(host_name).await {
        Ok(io) => io,
        Err(err) => return Ok(ToolExecutionOutcome::err(err.to_string())),
    };

    let request_id = Uuid::new_v4().to_string();
    let request = json!({
        "jsonrpc": "2.0",
        "id": request_id,
        "method": method,
        "params": args,
    });
    let mut line = serde_json::to_string(&request)?;
    line.push('\n');

    let call = async {
        let mut guard = io.lock().await;
        let (stdin, stdout) = &mut *guard;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        let mut response_line = String::new();
        stdout.read_line(&mut response_line).await?;
        Ok::<String, std::io::Error>(response_line)
    };

    let response_line = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(line)) => line,
        Ok(Err(io_err)) => {
            warn!(host = %host_name, error = %io_err, "noetic-toolhost: tool call I/O failed");
            return Ok(ToolExecutionOutcome::err(io_err.to_string()));
        }
        Err(_elapsed) => {
            warn!(host = %host_name, method, "noetic-toolhost: tool call timed out");
            return Ok(ToolExecutionOutcome::err(format!(
                "Tool call timed out after {:.1}s",
                timeout.as_secs_f64()
            )));
        }
    };

    let parsed: RpcResponse = match serde_json::from_str(response_line.trim()) {
        Ok(p) => p,
        Err(err) => {
            warn!(host = %host_name, error = %err, raw = %response_line, "noetic-toolhost: unparseable tool response");
            return Ok(ToolExecutionOutcome::err(format!(
                "unparseable response: {err}"
            )));
        }
    };

    if let Some(error) = parsed.error {
        return Ok(ToolExecutionOutcome::err(error.message));
    }

    let result = match parsed.result {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Ok(ToolExecutionOutcome::ok(result))
}

/// The level-1 tool description surface embedded in the reasoning prompt:
/// one `"[tool] <name>: <description>"` line per running host.
pub fn describe_running_hosts(descriptions: &[(String, Option<String>)]) -> String {
    descriptions
        .iter()
        .map(|(name, desc)| {
            format!(
                "[tool] {name}: {}",
                desc.as_deref().unwrap_or("no description provided")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_running_hosts_formats_one_line_each() {
        let hosts = vec![
            ("weather".to_string(), Some("weather lookups".to_string())),
            ("notes".to_string(), None),
        ];
        let text = describe_running_hosts(&hosts);
        assert!(text.contains("[tool] weather: weather lookups"));
        assert!(text.contains("[tool] notes: no description provided"));
    }
}
