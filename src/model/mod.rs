//! Model client capability
//!
//! A model client turns a prompt into a raw provider response and then
//! formats that response into text plus token usage. Agents only talk to the
//! provider through this trait, so the default Gemini client can be swapped
//! for any custom implementation.

pub mod error;
pub mod gemini;
pub mod gemini_types;
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::ModelError;
pub use gemini::GeminiClient;
pub use stub::{ScriptedModel, StaticModel};

/// Raw, provider-specific response body
pub type RawResponse = serde_json::Value;

/// Text and token usage extracted from a raw response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResponse {
    /// Generated text (empty when the provider returned no content)
    pub text: String,
    /// Tokens consumed by the prompt
    pub input_tokens: u64,
    /// Tokens produced by the model
    pub output_tokens: u64,
}

/// Capability boundary to a language-model provider
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a prompt to the provider and return its raw response
    ///
    /// # Errors
    /// Returns `ModelError` for transport, provider or response failures.
    /// These are retried by the task loop.
    async fn generate_response(&self, prompt: &str) -> Result<RawResponse, ModelError>;

    /// Extract text and token counts from a raw response
    ///
    /// Must not fail: missing content yields empty text and zero counts.
    fn format_response(&self, raw: &RawResponse) -> FormattedResponse;
}
