//! ToolPipe - MCP tool server with a validated, cached, retrying invocation pipeline
//!
//! Every `tools/call` runs through the same stages: schema validation, a
//! TTL response cache for tools that opt in, execution with exponential
//! backoff on transient failures, and formatting into an MCP text result.
//!
//! # Modules
//!
//! - [`pipeline`] - validation, caching, retry and the invocation entry point
//! - [`tools`] - the `Tool` trait, the registry and the builtin tools
//! - [`server`] - newline-delimited JSON-RPC over stdio
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod server;
pub mod tools;

pub use config::Config;
pub use pipeline::{Pipeline, PipelineError, ToolInvocationRequest, ToolOutput};
pub use server::McpServer;
pub use tools::{Tool, ToolError, ToolRegistry};
