//! MCP server over stdio
//!
//! Reads newline-delimited JSON-RPC requests, answers protocol methods inline
//! and runs every `tools/call` as its own task so a slow tool (or a retry
//! backoff) never holds up other requests. All responses go through one writer
//! task, so lines never interleave; they may leave in a different order than
//! the requests arrived.

use std::sync::Arc;

use eyre::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub mod messages;

pub use messages::{INVALID_REQUEST, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR, tool_result};

use crate::pipeline::{INVALID_PARAMS, METHOD_NOT_FOUND, Pipeline, ToolInvocationRequest};

/// Protocol version answered when the client does not send one
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Responses buffered between handlers and the writer task
const RESPONSE_QUEUE: usize = 64;

/// MCP tool server fronting a [`Pipeline`]
pub struct McpServer {
    pipeline: Arc<Pipeline>,
    name: String,
    version: String,
}

impl McpServer {
    pub fn new(pipeline: Arc<Pipeline>, name: impl Into<String>) -> Self {
        Self {
            pipeline,
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches EOF, then wait for in-flight calls
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(name = %self.name, version = %self.version, "MCP server started");
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut calls = JoinSet::new();

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request = match parse_request(line) {
                Ok(r) => r,
                Err(resp) => {
                    if tx.send(resp).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            // Reap finished calls so the set does not grow without bound
            while calls.try_join_next().is_some() {}

            if request.method == "tools/call"
                && let Some(id) = request.id.clone()
            {
                let pipeline = self.pipeline.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    let resp = call_tool(&pipeline, id, request.params).await;
                    // Writer gone means the client went away; nothing to report to
                    let _ = tx.send(resp).await;
                });
                continue;
            }

            if let Some(resp) = self.handle(request)
                && tx.send(resp).await.is_err()
            {
                break;
            }
        }

        debug!(in_flight = calls.len(), "serve: input closed, draining calls");
        while calls.join_next().await.is_some() {}
        drop(tx);

        writer_task.await.context("Writer task panicked")??;
        info!("MCP server stopped");
        Ok(())
    }

    /// Answer a non-`tools/call` request; `None` for notifications
    fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "McpServer::handle: called");
        let Some(id) = request.id else {
            debug!(method = %request.method, "McpServer::handle: notification");
            return None;
        };

        let resp = match request.method.as_str() {
            "initialize" => {
                let protocol = request
                    .params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol,
                        "capabilities": { "tools": {} },
                        "serverInfo": { "name": self.name, "version": self.version }
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.pipeline.definitions() })),
            "tools/call" => JsonRpcResponse::failure(id, INVALID_REQUEST, "tools/call must be a request"),
            other => {
                debug!(method = %other, "McpServer::handle: unknown method");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };
        Some(resp)
    }
}

/// Parse one line, or produce the error response for it
fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "parse_request: invalid JSON");
        JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "parse_request: invalid request");
        JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid request: {}", e))
    })
}

async fn call_tool(pipeline: &Pipeline, id: Value, params: Value) -> JsonRpcResponse {
    let request: ToolInvocationRequest = match serde_json::from_value(params) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "call_tool: bad params");
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid tools/call params: {}", e));
        }
    };

    match pipeline.invoke(request).await {
        Ok(output) => JsonRpcResponse::success(id, tool_result(&output)),
        Err(e) => JsonRpcResponse::from_pipeline_error(id, &e),
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response).context("Failed to serialize response")?;
        line.push(b'\n');
        writer.write_all(&line).await.context("Failed to write response")?;
        writer.flush().await.context("Failed to flush response")?;
        debug!(id = %response.id, "write_responses: sent response");
    }
    Ok(())
}
