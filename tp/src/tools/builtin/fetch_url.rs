//! fetch_url tool - fetch a URL and return readable text

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http;
use crate::config::FetchConfig;
use crate::pipeline::{FieldRule, ToolSchema};
use crate::tools::{Arguments, Tool, ToolError};

/// Characters returned before truncation
const MAX_OUTPUT_CHARS: usize = 50_000;

/// Fetch content from a URL; HTML is converted to markdown, JSON pretty-printed
pub struct FetchUrlTool {
    config: FetchConfig,
}

impl FetchUrlTool {
    pub fn new(config: FetchConfig) -> Self {
        debug!(?config, "FetchUrlTool::new: called");
        Self { config }
    }
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self::new(FetchConfig::default())
    }
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    url: String,
}

/// Render a body according to its content type
fn render_body(content_type: &str, body: String) -> String {
    if content_type.contains("text/html") || content_type.contains("application/xhtml") {
        debug!("render_body: converting HTML to markdown");
        html2md::rewrite_html(&body, false)
    } else if content_type.contains("application/json") {
        debug!("render_body: pretty-printing JSON");
        match serde_json::from_str::<Value>(&body) {
            Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(body),
            Err(_) => body,
        }
    } else {
        body
    }
}

fn too_large(read: usize, max_bytes: usize) -> ToolError {
    ToolError::other(format!(
        "Response too large (at least {} bytes > {} bytes)",
        read, max_bytes
    ))
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &'static str {
        "fetch_url"
    }

    fn description(&self) -> &'static str {
        "Fetch content from an http(s) URL. HTML is converted to markdown and JSON is pretty-printed."
    }

    fn schema(&self) -> Option<ToolSchema> {
        Some(
            ToolSchema::new().field(
                "url",
                FieldRule::string()
                    .required()
                    .min_length(8)
                    .max_length(2048)
                    .describe("URL to fetch"),
            ),
        )
    }

    async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
        let args: FetchArgs = args.parse()?;
        debug!(url = %args.url, "FetchUrlTool::execute: called");

        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(ToolError::invalid_arguments("URL must start with http:// or https://"));
        }

        let mut response = http::client(self.config.timeout_ms)?.get(&args.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "FetchUrlTool::execute: HTTP error status");
            return Err(ToolError::from_status("HTTP", status.as_u16(), ""));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(too_large(len as usize, self.config.max_bytes));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Chunked bodies carry no length up front; stop reading once past the limit
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.config.max_bytes {
                debug!(read = bytes.len() + chunk.len(), "FetchUrlTool::execute: body over limit");
                return Err(too_large(bytes.len() + chunk.len(), self.config.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        let content = render_body(&content_type, body);
        Ok(http::truncate_chars(&content, MAX_OUTPUT_CHARS))
    }
}
