//! generate_image tool - OpenAI image generation

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http;
use crate::config::OpenAiConfig;
use crate::pipeline::{FieldRule, ToolSchema};
use crate::tools::{Arguments, Tool, ToolError};

const SIZES: [&str; 3] = ["256x256", "512x512", "1024x1024"];

/// Generate images from a prompt; never cached since every call creates new images
pub struct GenerateImageTool {
    config: OpenAiConfig,
}

impl GenerateImageTool {
    pub fn new(config: OpenAiConfig) -> Self {
        debug!(model = %config.image_model, "GenerateImageTool::new: called");
        Self { config }
    }
}

#[derive(Debug, Deserialize)]
struct ImageArgs {
    prompt: String,
    #[serde(default = "default_size")]
    size: String,
    #[serde(default = "default_count")]
    n: u32,
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

fn format_images(response: ImageResponse) -> Result<String, ToolError> {
    let lines: Vec<String> = response
        .data
        .into_iter()
        .filter_map(|d| {
            let url = d.url?;
            Some(match d.revised_prompt {
                Some(p) => format!("{}\n  revised prompt: {}", url, p),
                None => url,
            })
        })
        .collect();

    if lines.is_empty() {
        return Err(ToolError::other("OpenAI returned no images"));
    }
    Ok(lines.join("\n"))
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &'static str {
        "generate_image"
    }

    fn description(&self) -> &'static str {
        "Generate images from a text prompt with OpenAI and return their URLs."
    }

    fn schema(&self) -> Option<ToolSchema> {
        Some(
            ToolSchema::new()
                .field(
                    "prompt",
                    FieldRule::string()
                        .required()
                        .min_length(1)
                        .max_length(4000)
                        .describe("Description of the image"),
                )
                .field("size", FieldRule::string().one_of(SIZES).describe("Image size"))
                .field("n", FieldRule::number().min(1.0).max(4.0).describe("Number of images")),
        )
    }

    async fn execute(&self, args: &Arguments) -> Result<String, ToolError> {
        let args: ImageArgs = args.parse()?;
        debug!(size = %args.size, n = args.n, "GenerateImageTool::execute: called");

        let api_key = http::required_env(&self.config.api_key_env, "OpenAI")?;
        let url = format!("{}/v1/images/generations", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.image_model,
            "prompt": args.prompt,
            "size": args.size,
            "n": args.n,
        });

        let response = http::client(self.config.timeout_ms)?
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ImageResponse = http::decode_json(response, "OpenAI").await?;
        format_images(parsed)
    }
}
