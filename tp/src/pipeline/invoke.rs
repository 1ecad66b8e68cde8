//! Invocation orchestrator

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::cache::{ResponseCache, cache_key};
use super::error::PipelineError;
use super::retry::{RetryPolicy, with_retry};
use crate::config::Config;
use crate::tools::{Arguments, ErrorCategory, ToolDefinition, ToolRegistry};

/// One `tools/call` request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolInvocationRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Text result of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// True when served from the response cache without executing the tool
    pub cached: bool,
}

/// Validating, caching, retrying front end to a [`ToolRegistry`]
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    cache: Arc<ResponseCache>,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(registry: Arc<ToolRegistry>, cache: Arc<ResponseCache>, retry: RetryPolicy) -> Self {
        debug!(tool_count = registry.len(), ?retry, "Pipeline::new: called");
        Self { registry, cache, retry }
    }

    /// Build a pipeline over the builtin tools using config settings
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ToolRegistry::standard(config));
        let cache = Arc::new(ResponseCache::new(config.cache.ttl(), config.cache.max_entries));
        Self::new(registry, cache, config.retry.policy())
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Handle one invocation end to end
    pub async fn invoke(&self, request: ToolInvocationRequest) -> Result<ToolOutput, PipelineError> {
        let ToolInvocationRequest { name, arguments } = request;
        debug!(tool = %name, "Pipeline::invoke: called");

        let Some(entry) = self.registry.get(&name) else {
            debug!(tool = %name, "Pipeline::invoke: unknown tool");
            return Err(PipelineError::MethodNotFound { name });
        };

        if let Some(schema) = entry.schema() {
            schema.validate(&arguments).map_err(|msg| {
                debug!(tool = %name, %msg, "Pipeline::invoke: validation failed");
                PipelineError::InvalidParams(msg)
            })?;
        }

        let key = entry.cacheable().then(|| cache_key(&name, &arguments));
        if let Some(key) = &key
            && let Some(text) = self.cache.lookup(key)
        {
            info!(tool = %name, "Pipeline::invoke: served from cache");
            return Ok(ToolOutput { text, cached: true });
        }

        let tool = entry.tool();
        let args = Arguments::new(arguments);
        let text = with_retry(&self.retry, || tool.execute(&args)).await.map_err(|e| {
            warn!(tool = %name, category = %e.category, error = %e, "Pipeline::invoke: tool failed");
            match e.category {
                ErrorCategory::InvalidArguments => PipelineError::InvalidParams(e.message),
                _ => PipelineError::Internal(e.message),
            }
        })?;

        if let Some(key) = key {
            self.cache.store(key, text.clone());
        }

        info!(tool = %name, bytes = text.len(), "Pipeline::invoke: completed");
        Ok(ToolOutput { text, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::pipeline::{FieldRule, ToolSchema};
    use crate::tools::{ErrorCategory, Tool, ToolError};

    /// Test tool that counts executions and fails the first `failures` of them
    struct Counting {
        name: &'static str,
        cacheable: bool,
        failures: u32,
        category: ErrorCategory,
        calls: Arc<AtomicU32>,
    }

    impl Counting {
        fn new(name: &'static str, cacheable: bool) -> Self {
            Self {
                name,
                cacheable,
                failures: 0,
                category: ErrorCategory::Network,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn failing(mut self, failures: u32, category: ErrorCategory) -> Self {
            self.failures = failures;
            self.category = category;
            self
        }
    }

    #[async_trait]
    impl Tool for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "counting test tool"
        }

        fn schema(&self) -> Option<ToolSchema> {
            Some(
                ToolSchema::new()
                    .field("query", FieldRule::string().required().min_length(1))
                    .field("mode", FieldRule::string().one_of(["fast", "slow"])),
            )
        }

        fn cacheable(&self) -> bool {
            self.cacheable
        }

        async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(ToolError::new(self.category, format!("attempt {} failed", n)));
            }
            let query = args.get("query").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(format!("result for {} (call {})", query, n))
        }
    }

    fn pipeline_with(tool: Counting) -> (Pipeline, Arc<AtomicU32>) {
        let calls = tool.calls.clone();
        let mut registry = ToolRegistry::empty();
        registry.register(tool);
        let pipeline = Pipeline::new(
            Arc::new(registry),
            Arc::new(ResponseCache::default()),
            RetryPolicy::default(),
        );
        (pipeline, calls)
    }

    fn request(name: &str, args: Value) -> ToolInvocationRequest {
        match args {
            Value::Object(map) => ToolInvocationRequest::new(name, map),
            _ => panic!("arguments must be an object"),
        }
    }

    #[tokio::test]
    async fn test_missing_required_field_never_executes() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        let err = pipeline.invoke(request("stats", json!({}))).await.unwrap_err();

        assert_eq!(err, PipelineError::InvalidParams("Missing required field: query".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn test_enum_violation_is_invalid_params() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        let err = pipeline
            .invoke(request("stats", json!({"query": "q", "mode": "medium"})))
            .await
            .unwrap_err();

        assert_eq!(err.code(), -32602);
        assert_eq!(err.to_string(), "Field mode must be one of: fast, slow");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cacheable_tool_executes_once() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        let first = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();
        let second = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.text, second.text);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_arguments_are_different_entries() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();
        pipeline.invoke(request("stats", json!({"query": "mem"}))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.cache().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        let again = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();

        assert!(!again.cached);
        assert_eq!(again.text, "result for cpu (call 2)");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_cacheable_tool_always_executes() {
        let (pipeline, calls) = pipeline_with(Counting::new("image", false));

        let first = pipeline.invoke(request("image", json!({"query": "cat"}))).await.unwrap();
        let second = pipeline.invoke(request("image", json!({"query": "cat"}))).await.unwrap();

        assert!(!first.cached && !second.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true).failing(2, ErrorCategory::Network));
        let start = tokio::time::Instant::now();

        let out = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();

        assert_eq!(out.text, "result for cpu (call 3)");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_is_internal_error() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true).failing(u32::MAX, ErrorCategory::Network));

        let err = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap_err();

        assert_eq!(err, PipelineError::Internal("attempt 3 failed".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let (pipeline, calls) =
            pipeline_with(Counting::new("stats", true).failing(u32::MAX, ErrorCategory::Unauthorized));
        let start = tokio::time::Instant::now();

        let err = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap_err();

        assert_eq!(err, PipelineError::Internal("attempt 1 failed".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let tool = Counting::new("stats", true).failing(1, ErrorCategory::Forbidden);
        let (pipeline, calls) = pipeline_with(tool);

        assert!(pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.is_err());
        let out = pipeline.invoke(request("stats", json!({"query": "cpu"}))).await.unwrap();

        assert!(!out.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let (pipeline, calls) = pipeline_with(Counting::new("stats", true));

        // Arguments that would fail validation if validation ran
        let err = pipeline.invoke(request("missing", json!({}))).await.unwrap_err();

        assert_eq!(err, PipelineError::MethodNotFound { name: "missing".into() });
        assert_eq!(err.code(), -32601);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_arguments_are_invalid_params_without_retry() {
        let pipeline = Pipeline::from_config(&Config::default());
        let start = tokio::time::Instant::now();

        let err = pipeline
            .invoke(request("github_issues", json!({"owner": "o", "repo": "r", "limit": 50.5})))
            .await
            .unwrap_err();

        assert_eq!(err.code(), -32602);
        assert!(err.to_string().starts_with("Invalid arguments"), "got: {}", err);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_url_scheme_is_invalid_params() {
        let pipeline = Pipeline::from_config(&Config::default());
        let start = tokio::time::Instant::now();

        let err = pipeline
            .invoke(request("fetch_url", json!({"url": "ftp://example.com/file"})))
            .await
            .unwrap_err();

        assert_eq!(err, PipelineError::InvalidParams("URL must start with http:// or https://".into()));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_request_deserializes_without_arguments() {
        let req: ToolInvocationRequest = serde_json::from_value(json!({"name": "system_stats"})).unwrap();
        assert_eq!(req.name, "system_stats");
        assert!(req.arguments.is_empty());
    }

    #[test]
    fn test_from_config_uses_builtin_registry() {
        let pipeline = Pipeline::from_config(&Config::default());
        assert!(pipeline.registry().has_tool("system_stats"));
        assert_eq!(pipeline.retry_policy(), RetryPolicy::default());
        assert_eq!(pipeline.cache().ttl(), Duration::from_secs(300));
    }
}
