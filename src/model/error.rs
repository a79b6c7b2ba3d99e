//! Model client error types
//!
//! Errors raised while generating a response. The task loop treats all of
//! them as transient.

use thiserror::Error;

/// Errors that can occur while calling a model provider
#[derive(Error, Debug)]
pub enum ModelError {
    /// HTTP request could not be sent or its body could not be read
    #[error("Request to model provider failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status
    #[error("Model API returned error status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// Provider rejected the request because of rate limiting (HTTP 429)
    #[error("Model API rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),

    /// Provider refused to answer the prompt
    #[error("Model blocked the prompt: {0}")]
    Blocked(String),

    /// Response body was not what the client expected
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// Failure raised by a custom model client
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
