//! JSON-RPC 2.0 message types for the MCP stdio transport
//!
//! Newline-delimited protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::pipeline::{PipelineError, ToolOutput};

/// JSON-RPC code for a line that is not JSON
pub const PARSE_ERROR: i64 = -32700;

/// JSON-RPC code for JSON that is not a request object
pub const INVALID_REQUEST: i64 = -32600;

/// Incoming request or notification
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Error object of a failed response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Outgoing response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn from_pipeline_error(id: Value, err: &PipelineError) -> Self {
        Self::failure(id, err.code(), err.to_string())
    }
}

/// `tools/call` result body for a successful invocation
///
/// The text is the same whether fresh or cached; `_meta.cached` tells them apart.
pub fn tool_result(output: &ToolOutput) -> Value {
    json!({
        "content": [
            { "type": "text", "text": output.text }
        ],
        "isError": false,
        "_meta": { "cached": output.cached }
    })
}
