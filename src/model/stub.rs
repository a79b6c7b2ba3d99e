//! Offline model clients
//!
//! `StaticModel` always answers with the same text; `ScriptedModel` plays back
//! a queue of responses and failures and records every prompt it receives.
//! Both are useful for dry runs and for exercising retry behavior.

use crate::model::{FormattedResponse, ModelClient, ModelError, RawResponse};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn generate_response(&self, prompt: &str) -> Result<RawResponse, ModelError> {
        (**self).generate_response(prompt).await
    }

    fn format_response(&self, raw: &RawResponse) -> FormattedResponse {
        (**self).format_response(raw)
    }
}

fn encode(response: &FormattedResponse) -> RawResponse {
    json!({
        "text": response.text,
        "inputTokens": response.input_tokens,
        "outputTokens": response.output_tokens,
    })
}

fn decode(raw: &RawResponse) -> FormattedResponse {
    FormattedResponse {
        text: raw
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string(),
        input_tokens: raw
            .get("inputTokens")
            .and_then(|t| t.as_u64())
            .unwrap_or(0),
        output_tokens: raw
            .get("outputTokens")
            .and_then(|t| t.as_u64())
            .unwrap_or(0),
    }
}

/// Model client that always returns the same response
#[derive(Debug, Clone)]
pub struct StaticModel {
    response: FormattedResponse,
}

impl StaticModel {
    /// Respond with `text`, counting tokens by whitespace-separated words
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let words = text.split_whitespace().count().max(1) as u64;
        Self::with_tokens(text, words, words)
    }

    /// Respond with `text` and fixed token counts
    pub fn with_tokens(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            response: FormattedResponse {
                text: text.into(),
                input_tokens,
                output_tokens,
            },
        }
    }
}

#[async_trait]
impl ModelClient for StaticModel {
    async fn generate_response(&self, _prompt: &str) -> Result<RawResponse, ModelError> {
        Ok(encode(&self.response))
    }

    fn format_response(&self, raw: &RawResponse) -> FormattedResponse {
        decode(raw)
    }
}

#[derive(Debug, Clone)]
enum Step {
    Respond(FormattedResponse),
    Fail(String),
}

/// Model client that plays back a scripted sequence of outcomes
///
/// Once the script is exhausted every further call fails.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn respond(self, text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        self.push(Step::Respond(FormattedResponse {
            text: text.into(),
            input_tokens,
            output_tokens,
        }))
    }

    /// Queue a failure with the given message
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    /// Queue `times` identical failures
    pub fn fail_times(mut self, times: usize, message: &str) -> Self {
        for _ in 0..times {
            self = self.fail(message);
        }
        self
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// Number of generate calls received so far
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn push(self, step: Step) -> Self {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
        self
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate_response(&self, prompt: &str) -> Result<RawResponse, ModelError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.steps.lock().ok().and_then(|mut steps| steps.pop_front());
        match next {
            Some(Step::Respond(response)) => Ok(encode(&response)),
            Some(Step::Fail(message)) => Err(ModelError::Other(anyhow!(message))),
            None => Err(ModelError::Other(anyhow!("scripted model has no responses left"))),
        }
    }

    fn format_response(&self, raw: &RawResponse) -> FormattedResponse {
        decode(raw)
    }
}
