//! ask_question tool - single-turn OpenAI chat completion

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http;
use crate::config::OpenAiConfig;
use crate::pipeline::{FieldRule, ToolSchema};
use crate::tools::{Arguments, Tool, ToolError};

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Answer a question with an OpenAI chat model
pub struct AskQuestionTool {
    config: OpenAiConfig,
}

impl AskQuestionTool {
    pub fn new(config: OpenAiConfig) -> Self {
        debug!(model = %config.model, "AskQuestionTool::new: called");
        Self { config }
    }

    fn build_request_body(&self, args: &AskArgs) -> serde_json::Value {
        let model = args.model.as_deref().unwrap_or(&self.config.model);
        let mut messages = Vec::new();
        if let Some(system) = &args.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": args.question}));

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": args.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AskArgs {
    question: String,
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn answer_text(response: ChatResponse) -> Result<String, ToolError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ToolError::other("OpenAI returned no answer"))
}

#[async_trait]
impl Tool for AskQuestionTool {
    fn name(&self) -> &'static str {
        "ask_question"
    }

    fn description(&self) -> &'static str {
        "Ask an OpenAI chat model a question and return its answer."
    }

    fn schema(&self) -> Option<ToolSchema> {
        Some(
            ToolSchema::new()
                .field(
                    "question",
                    FieldRule::string()
                        .required()
                        .min_length(1)
                        .max_length(8000)
                        .describe("The question to ask"),
                )
                .field(
                    "system",
                    FieldRule::string().max_length(4000).describe("Optional system prompt"),
                )
                .field("model", FieldRule::string().describe("Override the configured chat model"))
                .field(
                    "max_tokens",
                    FieldRule::number().min(1.0).max(4096.0).describe("Maximum tokens in the answer"),
                ),
        )
    }

    fn cacheable(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
        let args: AskArgs = args.parse()?;
        debug!(question_len = args.question.len(), "AskQuestionTool::execute: called");

        let api_key = http::required_env(&self.config.api_key_env, "OpenAI")?;
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = self.build_request_body(&args);

        let response = http::client(self.config.timeout_ms)?
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = http::decode_json(response, "OpenAI").await?;
        answer_text(parsed)
    }
}
