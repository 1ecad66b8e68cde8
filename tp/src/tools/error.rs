//! Tool error types
//!
//! Every handler failure is normalized into a [`ToolError`] carrying an
//! [`ErrorCategory`]. The retry executor only ever looks at the category.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Closed set of failure categories a tool error is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transient transport failure (connect, timeout, 5xx)
    Network,
    /// DNS resolution failed for the upstream host
    HostNotFound,
    /// Missing or rejected credentials (401)
    Unauthorized,
    /// Credentials valid but access denied (403)
    Forbidden,
    /// Upstream asked us to slow down (429)
    RateLimited,
    /// Caller arguments the tool cannot use, even though they passed the schema
    InvalidArguments,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorCategory::Network | ErrorCategory::RateLimited | ErrorCategory::Other => true,
            ErrorCategory::HostNotFound
            | ErrorCategory::Unauthorized
            | ErrorCategory::Forbidden
            | ErrorCategory::InvalidArguments => false,
        }
    }

    /// Categorize an HTTP status code returned by an upstream API
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCategory::Unauthorized,
            403 => ErrorCategory::Forbidden,
            429 => ErrorCategory::RateLimited,
            408 | 500..=599 => ErrorCategory::Network,
            _ => ErrorCategory::Other,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::HostNotFound => "host-not-found",
            ErrorCategory::Unauthorized => "unauthorized",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::RateLimited => "rate-limited",
            ErrorCategory::InvalidArguments => "invalid-arguments",
            ErrorCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// A failed tool execution
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ToolError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn host_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::HostNotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Forbidden, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::RateLimited, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidArguments, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Other, message)
    }

    /// Build an error from a non-success HTTP response
    pub fn from_status(service: &str, status: u16, body: &str) -> Self {
        debug!(%service, status, "ToolError::from_status: called");
        let body = body.trim();
        let message = if body.is_empty() {
            format!("{} API error {}", service, status)
        } else {
            format!("{} API error {}: {}", service, status, body)
        };
        Self::new(ErrorCategory::from_status(status), message)
    }

    /// Whether the retry executor should try again
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if is_dns_failure(&err) {
            debug!(%message, "ToolError::from: dns failure");
            return Self::host_not_found(message);
        }
        if let Some(status) = err.status() {
            return Self::new(ErrorCategory::from_status(status.as_u16()), message);
        }
        if err.is_decode() {
            return Self::other(message);
        }
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            return Self::network(message);
        }
        Self::other(message)
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("JSON error: {}", err))
    }
}

/// Prefix std puts on `getaddrinfo` failures
const LOOKUP_PREFIX: &str = "failed to lookup address information";

/// Walk the source chain looking for a resolver failure
///
/// reqwest 0.12 resolves through hyper-util 0.1's `GaiResolver`, which hands
/// back the `std::io::Error` from `ToSocketAddrs` wrapped in a `ConnectError`
/// whose message is "dns error". The io error carries no dedicated kind, so it
/// is recognized by std's message prefix; the text match on the other links
/// covers hyper-util's wrapper and resolvers that do not surface an io error.
fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.to_string().starts_with(LOOKUP_PREFIX) {
                return true;
            }
        } else {
            let text = e.to_string().to_lowercase();
            if text.contains("dns error") || text.contains("no such host") {
                return true;
            }
        }
        current = e.source();
    }
    false
}
