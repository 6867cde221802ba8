//! Async Cadence language server client.
//!
//! The session treats account operations as opaque remote calls; this module
//! provides the production implementation:
//! - spawns the configured language server via `tokio::process`
//! - speaks JSON-RPC over stdio with `Content-Length` framing
//! - runs a reader task that routes responses through a pending map
//! - forwards account operations as `workspace/executeCommand` requests using
//!   the `cadence.server.flow.*` command names
//!
//! Restart is expressed at the [`LanguageServerConnector`] seam: stop the old
//! client, connect a new one bound to the same configuration.

use crate::commands::{
    CREATE_ACCOUNT_SERVER, CREATE_DEFAULT_ACCOUNTS_SERVER, SWITCH_ACCOUNT_SERVER,
};
use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;

/// Account operations the session needs from the language server. All calls
/// may fail with transport or remote-process errors and must be awaited;
/// addresses travel as strings without a `0x` prefix.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Submit a create-account transaction signed by the active account and
    /// return the new address.
    async fn create_account(&self) -> Result<String>;

    /// Provision `count` accounts right after emulator startup.
    async fn create_default_accounts(&self, count: usize) -> Result<Vec<String>>;

    /// Tell the server which account signs from now on.
    async fn switch_active_account(&self, address: &str) -> Result<()>;

    /// Shut the connection down. The service is unusable afterwards.
    async fn stop(&self) -> Result<()>;
}

/// Builds [`AccountService`] connections. Restarting the server is "stop the
/// old service, connect a new one" at this seam.
#[async_trait]
pub trait LanguageServerConnector: Send {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn AccountService>>;
}

/// A JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC notification (no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub id: i64,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Result<Value, String>>>>>;

/// Production [`AccountService`] over a spawned language server process.
pub struct LanguageServerClient {
    stdin: tokio::sync::Mutex<ChildStdin>,
    child: tokio::sync::Mutex<Child>,
    next_id: AtomicI64,
    pending: PendingMap,
    reader: tokio::task::JoinHandle<()>,
}

impl LanguageServerClient {
    /// Spawn the language server and run the initialize handshake.
    pub async fn connect(config: &Config) -> Result<Self> {
        tracing::info!(
            "Starting language server: {} {}",
            config.language_server_command,
            config.language_server_args.join(" ")
        );

        let mut child = Command::new(&config.language_server_command)
            .args(&config.language_server_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "failed to spawn language server '{}'",
                    config.language_server_command
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("language server stdin not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("language server stdout not piped"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("language server stderr: {}", line);
                }
            });
        }

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(stdout, Arc::clone(&pending)));

        let client = Self {
            stdin: tokio::sync::Mutex::new(stdin),
            child: tokio::sync::Mutex::new(child),
            next_id: AtomicI64::new(1),
            pending,
            reader,
        };

        client.initialize(config).await?;
        Ok(client)
    }

    /// Run the `initialize`/`initialized` handshake. The service account
    /// parameters ride along in `initializationOptions` so the server can
    /// sign with the same key the emulator was started with.
    async fn initialize(&self, config: &Config) -> Result<()> {
        let params = json!({
            "processId": std::process::id(),
            "rootUri": null,
            "capabilities": {},
            "initializationOptions": {
                "servicePrivateKey": config.server.service_private_key,
                "serviceKeySignatureAlgorithm": config.server.service_key_signature_algorithm,
                "serviceKeyHashAlgorithm": config.server.service_key_hash_algorithm,
                "numberOfAccounts": config.num_accounts,
            },
        });
        self.send_request("initialize", params)
            .await
            .context("language server initialize failed")?;
        self.send_notification("initialized", json!({})).await?;
        tracing::info!("Language server initialized");
        Ok(())
    }

    async fn write_message<T: Serialize>(&self, message: &T) -> Result<()> {
        let body = serde_json::to_string(message)?;
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(framed.as_bytes())
            .await
            .context("failed to write to language server stdin")?;
        stdin.flush().await.context("failed to flush stdin")?;
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params: Some(params),
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        self.write_message(&request).await?;
        tracing::debug!("Sent request '{}' id={}", method, id);

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => bail!("language server error for '{}': {}", method, message),
            Err(_) => bail!("language server connection closed"),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<()> {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: Some(params),
        };
        self.write_message(&notification).await
    }

    /// Forward a server-side command via `workspace/executeCommand`.
    async fn execute_command(&self, command: &str, arguments: Vec<Value>) -> Result<Value> {
        self.send_request(
            "workspace/executeCommand",
            json!({ "command": command, "arguments": arguments }),
        )
        .await
    }
}

#[async_trait]
impl AccountService for LanguageServerClient {
    async fn create_account(&self) -> Result<String> {
        let value = self.execute_command(CREATE_ACCOUNT_SERVER, vec![]).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("expected address string, got {}", value))
    }

    async fn create_default_accounts(&self, count: usize) -> Result<Vec<String>> {
        let value = self
            .execute_command(CREATE_DEFAULT_ACCOUNTS_SERVER, vec![json!(count)])
            .await?;
        let entries = value
            .as_array()
            .ok_or_else(|| anyhow!("expected address array, got {}", value))?;
        entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| anyhow!("expected address string, got {}", entry))
            })
            .collect()
    }

    async fn switch_active_account(&self, address: &str) -> Result<()> {
        self.execute_command(SWITCH_ACCOUNT_SERVER, vec![json!(address)])
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        // Polite shutdown first; the server may already be gone, so failures
        // here only get logged.
        if let Err(e) = self.send_request("shutdown", Value::Null).await {
            tracing::warn!("Language server shutdown request failed: {:#}", e);
        }
        if let Err(e) = self.send_notification("exit", Value::Null).await {
            tracing::debug!("Language server exit notification failed: {:#}", e);
        }
        self.reader.abort();
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            tracing::debug!("Language server already exited: {}", e);
        }
        tracing::info!("Language server stopped");
        Ok(())
    }
}

/// Read framed messages from the server and route responses to their waiting
/// requests. Notifications from the server are logged and dropped; this
/// client only issues commands.
async fn read_loop(stdout: ChildStdout, pending: PendingMap) {
    let mut reader = BufReader::new(stdout);
    loop {
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    tracing::info!("Language server closed its stdout");
                    fail_pending(&pending, "language server exited");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Error reading from language server: {}", e);
                    fail_pending(&pending, "read error");
                    return;
                }
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                content_length = value.trim().parse().ok();
            }
        }

        let Some(length) = content_length else {
            tracing::warn!("Message without Content-Length header, skipping");
            continue;
        };

        let mut body = vec![0u8; length];
        if let Err(e) = reader.read_exact(&mut body).await {
            tracing::error!("Error reading message body: {}", e);
            fail_pending(&pending, "read error");
            return;
        }

        let Ok(message) = serde_json::from_slice::<Value>(&body) else {
            tracing::warn!("Unparseable message from language server, skipping");
            continue;
        };

        // Server-initiated requests and notifications carry a method; nothing
        // waits on those here, this client only issues commands.
        if let Some(method) = message.get("method").and_then(Value::as_str) {
            tracing::debug!("Ignoring server message: {}", method);
            continue;
        }

        match serde_json::from_value::<JsonRpcResponse>(message) {
            Ok(response) => {
                let waiter = pending.lock().unwrap().remove(&response.id);
                if let Some(tx) = waiter {
                    let outcome = match response.error {
                        Some(error) => Err(format!("{} (code {})", error.message, error.code)),
                        None => Ok(response.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(outcome);
                }
            }
            Err(e) => tracing::warn!("Malformed response from language server: {}", e),
        }
    }
}

/// Fail every in-flight request when the connection dies so callers unblock
/// with an error instead of hanging.
fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut pending = pending.lock().unwrap();
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(reason.to_string()));
    }
}

/// Connector that spawns the configured language server over stdio.
#[derive(Debug, Default)]
pub struct StdioConnector;

#[async_trait]
impl LanguageServerConnector for StdioConnector {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn AccountService>> {
        let client = LanguageServerClient::connect(config).await?;
        Ok(Arc::new(client))
    }
}
