//! The sandbox helper connection: the per-container counterpart of
//! §4.G's service supervisor, grounded in the teacher's `VmmHandler`
//! (`vmm/controller/handler.rs`) — a narrow trait over a running helper's
//! lifecycle operations, runtime-polymorphic so the concrete transport
//! (virtio socket, unix socket) stays out of the Containers service.

use async_trait::async_trait;
use boxd_shared::errors::{CoreError, CoreResult};
use boxd_shared::Transport;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, Clone, Default)]
pub struct StdioConfig {
    pub stdin_path: Option<String>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

#[async_trait]
pub trait SandboxClient: Send + Sync {
    async fn bootstrap(&self, stdio: StdioConfig) -> CoreResult<()>;

    /// Starts the named process; `process_id == container_id` is the init
    /// process.
    async fn start_process(&self, process_id: &str) -> CoreResult<()>;

    async fn kill(&self, process_id: &str, signal: i32) -> CoreResult<()>;

    /// Blocks until the process exits, returning its exit code.
    async fn wait(&self, process_id: &str) -> CoreResult<i32>;

    async fn resize(&self, process_id: &str, cols: u16, rows: u16) -> CoreResult<()>;

    /// Best-effort graceful shutdown of the whole sandbox.
    async fn shutdown(&self) -> CoreResult<()>;
}

/// Connects to a sandbox helper over its unix socket transport (§6: the
/// spec doesn't fix the wire format, only the field set — this picks
/// newline-delimited JSON request/response, one field map per message).
pub struct UnixSandboxClient {
    transport: Transport,
}

impl UnixSandboxClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    async fn call(&self, method: &str, params: Value) -> CoreResult<Value> {
        let mut stream = UnixStream::connect(self.transport.path())
            .await
            .map_err(|e| CoreError::Internal(format!("failed to connect to sandbox helper: {e}")))?;

        let request = json!({ "method": method, "params": params });
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        stream.write_all(&line).await.map_err(CoreError::from)?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line).await.map_err(CoreError::from)?;
        let response: Value = serde_json::from_str(response_line.trim_end())?;

        if let Some(error) = response.get("error") {
            return Err(CoreError::Internal(format!("sandbox helper returned an error: {error}")));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl SandboxClient for UnixSandboxClient {
    async fn bootstrap(&self, stdio: StdioConfig) -> CoreResult<()> {
        self.call(
            "bootstrap",
            json!({
                "stdin_path": stdio.stdin_path,
                "stdout_path": stdio.stdout_path,
                "stderr_path": stdio.stderr_path,
            }),
        )
        .await?;
        Ok(())
    }

    async fn start_process(&self, process_id: &str) -> CoreResult<()> {
        self.call("start_process", json!({ "process_id": process_id })).await?;
        Ok(())
    }

    async fn kill(&self, process_id: &str, signal: i32) -> CoreResult<()> {
        self.call("kill", json!({ "process_id": process_id, "signal": signal })).await?;
        Ok(())
    }

    async fn wait(&self, process_id: &str) -> CoreResult<i32> {
        let result = self.call("wait", json!({ "process_id": process_id })).await?;
        result
            .get("exit_code")
            .and_then(Value::as_i64)
            .map(|v| v as i32)
            .ok_or_else(|| CoreError::Internal("sandbox helper wait reply missing exit_code".to_string()))
    }

    async fn resize(&self, process_id: &str, cols: u16, rows: u16) -> CoreResult<()> {
        self.call("resize", json!({ "process_id": process_id, "cols": cols, "rows": rows })).await?;
        Ok(())
    }

    async fn shutdown(&self) -> CoreResult<()> {
        self.call("shutdown", json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    async fn spawn_echo_server(socket_path: std::path::PathBuf) {
        let listener = UnixListener::bind(&socket_path).unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let request: Value = serde_json::from_str(line.trim_end()).unwrap();
            let reply = if request["method"] == "wait" {
                json!({ "result": { "exit_code": 42 } })
            } else {
                json!({ "result": {} })
            };
            let mut out = serde_json::to_vec(&reply).unwrap();
            out.push(b'\n');
            write_half.write_all(&out).await.unwrap();
        });
    }

    #[tokio::test]
    async fn wait_parses_exit_code_from_reply() {
        let tmp = tempfile::tempdir().unwrap();
        let socket_path = tmp.path().join("sandbox.sock");
        spawn_echo_server(socket_path.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let client = UnixSandboxClient::new(Transport::unix(socket_path));
        let code = client.wait("c1").await.unwrap();
        assert_eq!(code, 42);
    }
}
