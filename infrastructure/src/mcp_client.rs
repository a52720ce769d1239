//! Tool bridge to an MCP server running as a child process, speaking
//! newline-delimited JSON-RPC 2.0 over its stdin/stdout.

use crate::config::McpConfig;
use async_trait::async_trait;
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::ports::{ToolDescriptor, ToolExecutor};
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct McpProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

enum BridgeState {
    NotStarted,
    Running(McpProcess),
}

/// Lazily started MCP subprocess. One mutex guards both startup and every
/// request/response exchange, so calls are serialised.
pub struct StdioToolExecutor {
    config: McpConfig,
    state: Mutex<BridgeState>,
}

impl StdioToolExecutor {
    pub fn new(config: McpConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BridgeState::NotStarted),
        }
    }

    /// Close stdin, give the server a grace period, then kill it.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        let BridgeState::Running(process) = std::mem::replace(&mut *state, BridgeState::NotStarted) else {
            return;
        };
        let McpProcess {
            mut child, stdin, ..
        } = process;
        drop(stdin);
        match timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::info!(%status, "mcp server exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "waiting for mcp server failed"),
            Err(_) => {
                tracing::warn!("mcp server did not exit gracefully, killing it");
                if let Err(e) = child.kill().await {
                    tracing::error!(error = %e, "failed to kill mcp server");
                }
            }
        }
    }

    async fn ensure_started<'a>(
        &self,
        state: &'a mut BridgeState,
    ) -> CollaboratorResult<&'a mut McpProcess> {
        if let BridgeState::Running(process) = state {
            match process.child.try_wait() {
                Ok(None) => {}
                Ok(Some(status)) => {
                    tracing::warn!(%status, "mcp server exited, restarting on demand");
                    *state = BridgeState::NotStarted;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot poll mcp server");
                    *state = BridgeState::NotStarted;
                }
            }
        }

        if matches!(state, BridgeState::NotStarted) {
            if !self.config.enabled {
                return Err(CollaboratorError::Unavailable(
                    "mcp bridge is disabled".to_string(),
                ));
            }
            let process = self.start().await?;
            *state = BridgeState::Running(process);
        }

        match state {
            BridgeState::Running(process) => Ok(process),
            BridgeState::NotStarted => Err(CollaboratorError::Unavailable(
                "mcp server is not running".to_string(),
            )),
        }
    }

    async fn start(&self) -> CollaboratorResult<McpProcess> {
        tracing::info!(command = %self.config.command, args = ?self.config.args, "starting mcp server");
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|e| {
            CollaboratorError::Unavailable(format!("cannot start {}: {e}", self.config.command))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CollaboratorError::Unavailable("mcp stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CollaboratorError::Unavailable("mcp stdout not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        tracing::warn!(target: "mcp_server", "{line}");
                    }
                }
            });
        }
        if let Some(pid) = child.id() {
            tracing::info!(pid, "mcp server started");
        }

        let mut process = McpProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };
        let init = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "helpdesk", "version": env!("CARGO_PKG_VERSION") }
        });
        self.exchange(&mut process, "initialize", init).await?;
        write_message(
            &mut process.stdin,
            &json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        )
        .await?;
        Ok(process)
    }

    /// Send one request and wait for the response carrying the same id.
    async fn exchange(
        &self,
        process: &mut McpProcess,
        method: &str,
        params: Value,
    ) -> CollaboratorResult<Value> {
        let id = uuid::Uuid::new_v4().to_string();
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        tracing::debug!(method, %id, "sending mcp request");
        write_message(&mut process.stdin, &request).await?;

        let wait = async {
            loop {
                let line = process
                    .stdout
                    .next_line()
                    .await
                    .map_err(|e| CollaboratorError::Transport(e.to_string()))?
                    .ok_or_else(|| {
                        CollaboratorError::Unavailable("mcp server closed its output".to_string())
                    })?;
                let Ok(message) = serde_json::from_str::<Value>(&line) else {
                    tracing::debug!(%line, "ignoring non-json mcp output");
                    continue;
                };
                if message.get("id").and_then(Value::as_str) == Some(id.as_str()) {
                    return Ok(message);
                }
            }
        };
        match timeout(self.config.call_timeout, wait).await {
            Ok(result) => result.and_then(into_result),
            Err(_) => {
                tracing::warn!(method, "timed out waiting for mcp server");
                Err(CollaboratorError::Timeout(self.config.call_timeout))
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for StdioToolExecutor {
    async fn call(&self, tool: &str, args: Value) -> CollaboratorResult<String> {
        let mut state = self.state.lock().await;
        let process = self.ensure_started(&mut state).await?;
        let params = json!({ "name": tool, "arguments": args });
        let result = self.exchange(process, "tools/call", params).await?;
        parse_call_result(tool, &result)
    }

    async fn list_tools(&self) -> CollaboratorResult<Vec<ToolDescriptor>> {
        let mut state = self.state.lock().await;
        let process = self.ensure_started(&mut state).await?;
        let result = self.exchange(process, "tools/list", json!({})).await?;
        parse_tools(&result)
    }
}

async fn write_message(stdin: &mut ChildStdin, message: &Value) -> CollaboratorResult<()> {
    let mut line = message.to_string();
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
    stdin
        .flush()
        .await
        .map_err(|e| CollaboratorError::Transport(e.to_string()))
}

/// Unwrap a JSON-RPC response into its `result`, mapping `error` objects.
fn into_result(mut message: Value) -> CollaboratorResult<Value> {
    if let Some(error) = message.get("error") {
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        return Err(CollaboratorError::Protocol(format!("{text} (code {code})")));
    }
    message
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| CollaboratorError::Protocol("response has neither result nor error".to_string()))
}

fn parse_call_result(tool: &str, result: &Value) -> CollaboratorResult<String> {
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return Err(CollaboratorError::Protocol(format!("tool {tool} failed: {text}")));
    }
    if text.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    Ok(text)
}

fn parse_tools(result: &Value) -> CollaboratorResult<Vec<ToolDescriptor>> {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| CollaboratorError::Decode("tools/list result has no tools array".to_string()))?;
    Ok(tools
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name")?.as_str()?.to_string();
            let description = tool
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(ToolDescriptor { name, description })
        })
        .collect())
}
