//! Newline-delimited JSON-RPC server over stdio.
//!
//! Implements the subset of MCP needed to expose tools: `initialize`, `ping`,
//! `tools/list`, `tools/call`, and silently accepted `notifications/*`.
//! Requests are handled one at a time in arrival order; each one runs inside
//! a `tracing` span carrying its method and id.
//!
//! Stdout carries only protocol messages. Logs go to stderr.

pub mod protocol;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::cache::CleanupTask;
use crate::constants::{DEFAULT_PROTOCOL_VERSION, SERVER_NAME};
use crate::core::CodebaseError;
use crate::tools::ToolRegistry;
use protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, ProtocolError,
    Request, Response,
};

/// Dispatches protocol messages to the tool registry.
pub struct Server {
    registry: ToolRegistry,
}

impl Server {
    /// Server exposing the tools in `registry`.
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// The tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// # Errors
    ///
    /// Fails only on transport I/O errors; request failures become error
    /// responses.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                write_response(&mut writer, &response).await?;
            }
        }
        debug!("Input closed");
        Ok(())
    }

    /// Handle one raw message. Returns `None` when no response is due.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                return Some(Response::err(Value::Null, PARSE_ERROR, format!("Parse error: {e}")));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(Response::err(id, INVALID_REQUEST, format!("Invalid request: {e}"))),
        }
    }

    /// Handle a parsed request. Returns `None` for notifications.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let id = request.id.clone().unwrap_or(Value::Null);
        let span = info_span!("request", method = %request.method, id = %id);

        async move {
            let notification = request.is_notification();
            let outcome = self.route(&request).await;

            if notification {
                if let Err(e) = outcome {
                    debug!("Notification {} failed: {}", request.method, e);
                }
                return None;
            }

            Some(match outcome {
                Ok(result) => Response::ok(id, result),
                Err(e) => {
                    debug!("Request failed with {}: {}", e.code, e.message);
                    Response::err(id, e.code, e.message)
                }
            })
        }
        .instrument(span)
        .await
    }

    async fn route(&self, request: &Request) -> Result<Value, ProtocolError> {
        match request.method.as_str() {
            "initialize" => Ok(self.initialize(&request.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.definitions() })),
            "tools/call" => self.call_tool(&request.params).await,
            method if method.starts_with("notifications/") => Ok(Value::Null),
            method => Err(ProtocolError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        info!(
            "Client initialized (protocol {}, root {})",
            protocol_version,
            self.registry.context().root().display()
        );

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, ProtocolError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::new(INVALID_PARAMS, "Missing tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let result = self.registry.call(name, arguments).await.map_err(|e| match e {
            CodebaseError::UnknownTool { .. } => ProtocolError::new(INVALID_PARAMS, e.to_string()),
            other => ProtocolError::new(INTERNAL_ERROR, other.to_string()),
        })?;

        serde_json::to_value(result).map_err(|e| ProtocolError::new(INTERNAL_ERROR, e.to_string()))
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut encoded = serde_json::to_vec(response).context("Failed to encode response")?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await.context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

/// Serve on stdin/stdout until EOF or Ctrl-C, then stop the cache cleanup task.
///
/// # Errors
///
/// Transport I/O failures.
pub async fn run_stdio(server: Server, cleanup: CleanupTask) -> Result<()> {
    info!(
        "{} serving {} on stdio",
        SERVER_NAME,
        server.registry().context().root().display()
    );

    let outcome = tokio::select! {
        result = server.serve(tokio::io::stdin(), tokio::io::stdout()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    cleanup.shutdown().await;
    info!("Server stopped");
    outcome
}
