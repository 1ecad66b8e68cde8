//! Tool invocation pipeline
//!
//! validate -> cache lookup -> execute with retry -> cache store -> format

mod cache;
mod error;
mod invoke;
mod retry;
mod schema;

pub use cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL, ResponseCache, cache_key};
pub use error::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PipelineError};
pub use invoke::{Pipeline, ToolInvocationRequest, ToolOutput};
pub use retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, RetryPolicy, with_retry};
pub use schema::{FieldRule, FieldType, ToolSchema, empty_json_schema};
