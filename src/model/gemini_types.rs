//! Gemini API wire types
//!
//! Structs that mirror the Gemini `generateContent` JSON format. Response
//! types default every field so a partial body still formats cleanly.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiApiResponse {
    /// List of candidate responses from the model
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    pub prompt_feedback: Option<PromptFeedback>,
    /// Token accounting for the call
    pub usage_metadata: Option<UsageMetadata>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    /// The content of this candidate
    pub content: Content,
    /// Why the model stopped generating (if applicable)
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Content {
    /// List of content parts (typically one text part)
    pub parts: Vec<Part>,
    /// Role of the content (e.g., "model")
    pub role: Option<String>,
}

/// A single part of content (typically text)
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Part {
    /// The text content of this part
    pub text: String,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    pub block_reason: Option<String>,
}

/// Token usage reported by the API
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    /// Tokens in the prompt
    pub prompt_token_count: u64,
    /// Tokens across all candidates
    pub candidates_token_count: u64,
}

/// Request structure for Gemini API
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// List of content items to send
    pub contents: Vec<RequestContent>,
}

/// Content structure for requests
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

/// A single part for requests (typically text)
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

impl GeminiApiRequest {
    /// Build a single-turn text request
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}
