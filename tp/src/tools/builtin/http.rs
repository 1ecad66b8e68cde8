//! Shared HTTP plumbing for the API-backed tools

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::tools::ToolError;

const USER_AGENT: &str = concat!("toolpipe/", env!("CARGO_PKG_VERSION"));

/// Longest upstream error body quoted back to the caller
const MAX_ERROR_CHARS: usize = 500;

/// Build a client with the given timeout
pub(crate) fn client(timeout_ms: u64) -> Result<Client, ToolError> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ToolError::other(format!("Failed to build HTTP client: {}", e)))
}

/// Read a required credential from the environment
pub(crate) fn required_env(var: &str, service: &str) -> Result<String, ToolError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ToolError::unauthorized(format!(
            "{} API key not found. Set the {} environment variable.",
            service, var
        ))),
    }
}

/// Read an optional credential from the environment
pub(crate) fn optional_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Turn a non-success status into a categorized error, else decode the JSON body
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response, service: &str) -> Result<T, ToolError> {
    let status = response.status();
    debug!(%service, %status, "decode_json: called");
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ToolError::from_status(service, status.as_u16(), &upstream_message(&body)));
    }
    Ok(response.json::<T>().await?)
}

/// Pull the human-readable message out of a vendor error body
pub(crate) fn upstream_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str);
        if let Some(m) = message {
            return m.to_string();
        }
    }
    truncate_chars(body.trim(), MAX_ERROR_CHARS)
}

/// Truncate on a char boundary, appending a marker when cut
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...\n\n[truncated, {} chars total]", &text[..idx], text.chars().count()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_openai_shape() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(upstream_message(body), "Incorrect API key provided");
    }

    #[test]
    fn test_upstream_message_github_shape() {
        let body = r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#;
        assert_eq!(upstream_message(body), "Not Found");
    }

    #[test]
    fn test_upstream_message_plain_text() {
        assert_eq!(upstream_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        let cut = truncate_chars("ééééé", 2);
        assert!(cut.starts_with("éé..."));
        assert!(cut.contains("5 chars total"));
    }

    #[test]
    fn test_required_env_missing_is_unauthorized() {
        let err = required_env("TOOLPIPE_TEST_SURELY_UNSET_VAR", "OpenAI").unwrap_err();
        assert_eq!(err.category, crate::tools::ErrorCategory::Unauthorized);
        assert!(err.message.contains("TOOLPIPE_TEST_SURELY_UNSET_VAR"));
    }
}
