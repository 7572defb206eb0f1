//! Error types for LLM clients.

use thiserror::Error;

/// Errors produced while configuring or calling a chat model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Model configuration is invalid (bad provider, bad parameter coupling).
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    /// The named provider has no registered credentials.
    #[error("Provider '{0}' is not registered")]
    UnknownProvider(String),

    /// Authentication with the provider failed (HTTP 401/403).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the request for rate limiting (HTTP 429).
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Any other provider-side failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a body this client could not interpret.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Convenience result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;
