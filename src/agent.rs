//! Agents
//!
//! An agent carries a persona (role, goal, background) and owns the model
//! client it talks to. It turns a task prompt plus dependency context into
//! the final prompt and records token usage on the task it ran.

use crate::error::WorkflowError;
use crate::model::{GeminiClient, ModelClient, ModelError};
use crate::task::Task;
use crate::template::{self, Input};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an agent
pub type AgentId = String;

/// Last known execution status of an agent
///
/// Informational only; scheduling never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Not running a task
    Idle,
    /// Waiting on the model client
    Busy,
    /// Last task attempt failed
    Error,
}

/// Persona text used to build prompts
///
/// Workflows keep a resolved copy per run so the agent's own text is never
/// rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    /// Role the agent plays (e.g. "research analyst")
    pub role: String,
    /// What the agent is trying to achieve
    pub goal: String,
    /// Background that shapes the agent's answers
    pub background: String,
}

impl Persona {
    /// Substitute placeholders in every persona field
    pub fn resolve(&self, input: &Input) -> Self {
        Self {
            role: template::resolve(&self.role, input),
            goal: template::resolve(&self.goal, input),
            background: template::resolve(&self.background, input),
        }
    }

    /// Personality preamble placed at the top of every prompt
    pub fn personality(&self) -> String {
        format!(
            "You are a {}. {}. Your goal is: {}.",
            self.role, self.background, self.goal
        )
    }

    /// Build the full prompt for a task
    ///
    /// Context is only included when it is non-empty.
    pub fn compose_prompt(&self, task_prompt: &str, context: &str) -> String {
        if context.is_empty() {
            format!("{}\n\n{}", self.personality(), task_prompt)
        } else {
            format!(
                "{}\n\n{}\n\nUse the following context from previous tasks to complete your work:\n{}",
                self.personality(),
                task_prompt,
                context
            )
        }
    }
}

/// Agent bound to a model client
pub struct Agent {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// Role text (may contain placeholders)
    pub role: String,
    /// Goal text (may contain placeholders)
    pub goal: String,
    /// Background text (may contain placeholders)
    pub background: String,
    state: AgentState,
    model: Box<dyn ModelClient>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("background", &self.background)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent backed by the default Gemini client
    ///
    /// # Errors
    /// * `WorkflowError::Config` if `GEMINI_API_KEY` is not set. This is not
    ///   retried.
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        background: impl Into<String>,
    ) -> Result<Self, WorkflowError> {
        let model = GeminiClient::from_env()?;
        Ok(Self::with_model(role, goal, background, model))
    }

    /// Create an agent with an explicit model client
    pub fn with_model(
        role: impl Into<String>,
        goal: impl Into<String>,
        background: impl Into<String>,
        model: impl ModelClient + 'static,
    ) -> Self {
        Self::with_boxed_model(role, goal, background, Box::new(model))
    }

    /// Create an agent from an already boxed model client
    pub fn with_boxed_model(
        role: impl Into<String>,
        goal: impl Into<String>,
        background: impl Into<String>,
        model: Box<dyn ModelClient>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            role: role.into(),
            goal: goal.into(),
            background: background.into(),
            state: AgentState::Idle,
            model,
        }
    }

    /// Replace the generated ID
    pub fn with_id(mut self, id: impl Into<AgentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Generate a new unique ID for an agent
    pub fn generate_id() -> AgentId {
        Uuid::new_v4().to_string()
    }

    /// Current execution state
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Persona as defined, placeholders unresolved
    pub fn persona(&self) -> Persona {
        Persona {
            role: self.role.clone(),
            goal: self.goal.clone(),
            background: self.background.clone(),
        }
    }

    /// Run one attempt of a task
    ///
    /// Builds the prompt from `persona`, the task prompt and the task's
    /// dependency context, calls the model and writes the token counts onto
    /// the task.
    ///
    /// # Errors
    /// Model failures are returned unchanged so the task can retry.
    pub async fn execute_task(
        &mut self,
        persona: &Persona,
        task_prompt: &str,
        task: &mut Task,
    ) -> Result<String, ModelError> {
        self.state = AgentState::Busy;

        let prompt = persona.compose_prompt(task_prompt, task.context());

        tracing::debug!(
            agent_id = %self.id,
            task_id = %task.id,
            prompt_len = prompt.len(),
            has_context = !task.context().is_empty(),
            "Agent executing task"
        );

        let raw = match self.model.generate_response(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                self.state = AgentState::Error;
                tracing::debug!(agent_id = %self.id, error = %e, "Model call failed");
                return Err(e);
            }
        };

        let formatted = self.model.format_response(&raw);
        task.record_tokens(formatted.input_tokens, formatted.output_tokens);

        self.state = AgentState::Idle;
        Ok(formatted.text)
    }
}
