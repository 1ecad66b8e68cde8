//! ToolRegistry - name to tool descriptor mapping

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::Tool;
use super::builtin::{
    AskQuestionTool, FetchUrlTool, GenerateImageTool, GithubIssuesTool, GithubRepoTool, SystemStatsTool,
};
use crate::config::Config;
use crate::pipeline::{ToolSchema, empty_json_schema};

/// A registered tool together with its declared schema and cache flag
#[derive(Clone)]
pub struct ToolEntry {
    tool: Arc<dyn Tool>,
    schema: Option<ToolSchema>,
    cacheable: bool,
}

impl ToolEntry {
    fn new(tool: Arc<dyn Tool>) -> Self {
        let schema = tool.schema();
        let cacheable = tool.cacheable();
        Self {
            tool,
            schema,
            cacheable,
        }
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    pub fn schema(&self) -> Option<&ToolSchema> {
        self.schema.as_ref()
    }

    pub fn cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool.name().to_string(),
            description: self.tool.description().to_string(),
            input_schema: self
                .schema
                .as_ref()
                .map(ToolSchema::to_json_schema)
                .unwrap_or_else(empty_json_schema),
            cacheable: self.cacheable,
        }
    }
}

/// Reflected view of a tool, as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(skip)]
    pub cacheable: bool,
}

/// Registry of all tools a pipeline can dispatch to
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    /// Create a registry with the builtin tools
    pub fn standard(config: &Config) -> Self {
        debug!("ToolRegistry::standard: called");
        let mut registry = Self::empty();

        // Local reads
        registry.register(SystemStatsTool);
        registry.register(FetchUrlTool::new(config.fetch.clone()));

        // OpenAI
        registry.register(AskQuestionTool::new(config.openai.clone()));
        registry.register(GenerateImageTool::new(config.openai.clone()));

        // GitHub
        registry.register(GithubRepoTool::new(config.github.clone()));
        registry.register(GithubIssuesTool::new(config.github.clone()));

        registry
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        debug!("ToolRegistry::empty: called");
        Self { tools: HashMap::new() }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.add_tool(Arc::new(tool));
    }

    /// Register a shared tool, replacing any tool with the same name
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        debug!(tool_name = %tool.name(), cacheable = tool.cacheable(), "ToolRegistry::add_tool: called");
        self.tools.insert(tool.name().to_string(), ToolEntry::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions of every tool, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolRegistry::definitions: called");
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(ToolEntry::definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
