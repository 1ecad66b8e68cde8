//! Tool trait definition

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::ToolError;
use crate::pipeline::ToolSchema;

/// A tool exposed to the agent runtime
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the `tools/call` name)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Argument rules checked before execution; `None` skips validation
    fn schema(&self) -> Option<ToolSchema> {
        None
    }

    /// Whether results may be served from the response cache
    ///
    /// Only side-effect-free reads should return true.
    fn cacheable(&self) -> bool {
        false
    }

    /// Execute the tool, returning its text result
    ///
    /// May be called more than once per invocation by the retry executor.
    async fn execute(&self, args: &Arguments) -> Result<String, ToolError>;
}

/// Arguments of one tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialize into a tool's typed argument record
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        debug!(type_name = std::any::type_name::<T>(), "Arguments::parse: called");
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| ToolError::invalid_arguments(format!("Invalid arguments: {}", e)))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Arguments {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::invalid_arguments(format!("Arguments must be an object, got {}", other))),
        }
    }
}
