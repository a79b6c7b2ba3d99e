//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::error::WorkflowError;
use std::env;

/// Default Gemini model name
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini API base URL
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default number of attempts per task
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default log filter when neither `AGENT_WORKFLOW_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Default model client configuration
    pub gemini: GeminiConfig,
    /// Workflow execution configuration
    pub workflow: WorkflowConfig,
    /// Log filter directive (EnvFilter syntax)
    pub log_filter: String,
}

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; required before a client can be built
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds (no timeout when unset)
    pub timeout_secs: Option<u64>,
}

/// Workflow execution configuration
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum attempts per task before the run fails
    pub max_attempts: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_API_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl GeminiConfig {
    /// Load Gemini settings from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env::var("GEMINI_MODEL")
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env::var("GEMINI_API_BASE_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE_URL.to_string()),
            timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok()),
        }
    }

    /// Return the API key or a configuration error when it is absent
    pub fn require_api_key(&self) -> Result<&str, WorkflowError> {
        self.api_key.as_deref().ok_or_else(|| {
            WorkflowError::Config(
                "GEMINI_API_KEY environment variable is not set or is empty. Please set it to use the Gemini API."
                    .to_string(),
            )
        })
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            gemini: GeminiConfig::from_env(),
            workflow: WorkflowConfig {
                max_attempts: env::var("WORKFLOW_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            },
            log_filter: env::var("AGENT_WORKFLOW_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Validate configuration values
    ///
    /// The API key is not checked here; it is only required when the default
    /// model client is constructed.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.workflow.max_attempts == 0 {
            return Err(WorkflowError::Config(
                "max_attempts must be > 0".to_string(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(WorkflowError::Config(
                "gemini model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
