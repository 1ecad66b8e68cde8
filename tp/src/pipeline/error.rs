//! Pipeline error taxonomy

use thiserror::Error;

/// JSON-RPC code for rejected arguments
pub const INVALID_PARAMS: i64 = -32602;

/// JSON-RPC code for an unknown method or tool
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC code for a failed execution
pub const INTERNAL_ERROR: i64 = -32603;

/// Terminal failure of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Arguments failed schema validation
    #[error("{0}")]
    InvalidParams(String),

    /// No handler registered under this name
    #[error("Unknown tool: {name}")]
    MethodNotFound { name: String },

    /// The handler failed after retries (or non-retryably)
    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i64 {
        match self {
            PipelineError::InvalidParams(_) => INVALID_PARAMS,
            PipelineError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            PipelineError::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Short kind name, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidParams(_) => "InvalidParams",
            PipelineError::MethodNotFound { .. } => "MethodNotFound",
            PipelineError::Internal(_) => "InternalError",
        }
    }
}
