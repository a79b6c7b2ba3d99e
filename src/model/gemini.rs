//! Gemini API client
//!
//! Default model client. Calls the `generateContent` endpoint directly over
//! HTTP and formats the JSON body into text plus token usage.

use crate::config::GeminiConfig;
use crate::error::WorkflowError;
use crate::model::gemini_types::{GeminiApiRequest, GeminiApiResponse};
use crate::model::{FormattedResponse, ModelClient, ModelError, RawResponse};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Model client backed by the Gemini REST API
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from explicit configuration
    ///
    /// # Errors
    /// * `WorkflowError::Config` if the API key is missing or the HTTP client
    ///   cannot be built.
    pub fn new(config: &GeminiConfig) -> Result<Self, WorkflowError> {
        let api_key = config.require_api_key()?.to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| WorkflowError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from `GEMINI_*` environment variables
    ///
    /// # Errors
    /// * `WorkflowError::Config` if `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, WorkflowError> {
        Self::new(&GeminiConfig::from_env())
    }

    /// Model name used for requests
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate_response(&self, prompt: &str) -> Result<RawResponse, ModelError> {
        let request_body = GeminiApiRequest::from_prompt(prompt);

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            "Calling Gemini API"
        );

        let response = self
            .http
            .post(self.endpoint())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                ModelError::Request(format!("Failed to send HTTP request to Gemini API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(ModelError::RateLimited(error_body));
            }

            return Err(ModelError::Status {
                status: status_code,
                body: error_body,
            });
        }

        let response_body = response.text().await.map_err(|e| {
            ModelError::Request(format!(
                "Failed to read response body from Gemini API: {}",
                e
            ))
        })?;

        let raw: RawResponse = serde_json::from_str(&response_body).map_err(|e| {
            ModelError::InvalidResponse(format!(
                "Failed to parse JSON response from Gemini API: {} - Response body: {}",
                e, response_body
            ))
        })?;

        if let Some(reason) = raw
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
        {
            return Err(ModelError::Blocked(reason.to_string()));
        }

        tracing::debug!(
            response_len = response_body.len(),
            "Successfully received response from Gemini API"
        );

        Ok(raw)
    }

    fn format_response(&self, raw: &RawResponse) -> FormattedResponse {
        let parsed = GeminiApiResponse::deserialize(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected Gemini response shape");
            GeminiApiResponse::default()
        });

        let text = parsed
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        let (input_tokens, output_tokens) = parsed
            .usage_metadata
            .map(|usage| (usage.prompt_token_count, usage.candidates_token_count))
            .unwrap_or((0, 0));

        FormattedResponse {
            text,
            input_tokens,
            output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use serial_test::serial;

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .expect("client should build")
    }

    #[test]
    fn test_new_without_api_key_is_config_error() {
        let result = GeminiClient::new(&GeminiConfig::default());
        let err = result.unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_missing_key() {
        std::env::remove_var("GEMINI_API_KEY");
        let result = GeminiClient::from_env();
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_response_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
                "key".into(),
                "test-key".into(),
            )]))
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "test prompt"}]}]
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "This is a test response"}],
                            "role": "model"
                        },
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {
                        "promptTokenCount": 12,
                        "candidatesTokenCount": 7,
                        "totalTokenCount": 19
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let raw = client.generate_response("test prompt").await;

        mock.assert_async().await;
        let formatted = client.format_response(&raw.unwrap());
        assert_eq!(formatted.text, "This is a test response");
        assert_eq!(formatted.input_tokens, 12);
        assert_eq!(formatted.output_tokens, 7);
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_response_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.generate_response("test prompt").await;

        mock.assert_async().await;
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("blocked the prompt") && error_msg.contains("SAFETY"),
            "Error message should mention the block reason, got: {}",
            error_msg
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_response_rate_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.generate_response("test prompt").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ModelError::RateLimited(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_response_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.generate_response("test prompt").await;

        mock.assert_async().await;
        match result {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_response_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.generate_response("test prompt").await;

        mock.assert_async().await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse JSON"));
    }

    #[test]
    fn test_format_response_without_content() {
        let client = test_client("http://localhost");

        let formatted = client.format_response(&json!({"candidates": []}));
        assert_eq!(formatted, FormattedResponse::default());

        let formatted = client.format_response(&json!("unexpected"));
        assert_eq!(formatted.text, "");
        assert_eq!(formatted.input_tokens, 0);
    }

    #[test]
    fn test_format_response_joins_parts() {
        let client = test_client("http://localhost");
        let raw = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}
            }]
        });

        let formatted = client.format_response(&raw);
        assert_eq!(formatted.text, "Hello, world");
        assert_eq!(formatted.output_tokens, 0);
    }
}
