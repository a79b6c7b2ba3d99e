//! Tasks
//!
//! A task is one step of a workflow: a description, the output it is expected
//! to produce, the agent that runs it and the tasks whose outputs it builds on.
//! Execution retries failed attempts immediately, up to the workflow's
//! attempt budget.

use crate::agent::{Agent, AgentId, Persona};
use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::error::WorkflowError;
use crate::template::{self, Input};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Unique identifier for a task
pub type TaskId = String;

/// Description and expected output of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Brief {
    /// What the task asks for
    pub description: String,
    /// Guidelines the response must follow
    pub expected_output: String,
}

impl Brief {
    /// Substitute placeholders in both fields
    pub fn resolve(&self, input: &Input) -> Self {
        Self {
            description: template::resolve(&self.description, input),
            expected_output: template::resolve(&self.expected_output, input),
        }
    }

    /// Task prompt: the description followed by the output guidelines
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nYour response must be the full, complete content, not a summary of it. It must follow these guidelines: {}",
            self.description, self.expected_output
        )
    }
}

/// A single workflow step
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique identifier for the task
    pub id: TaskId,
    /// Description text (may contain placeholders)
    pub description: String,
    /// Expected output text (may contain placeholders)
    pub expected_output: String,
    /// Agent that runs this task
    pub agent_id: AgentId,
    /// Tasks whose outputs form this task's context, in order
    pub dependencies: Vec<TaskId>,
    context: String,
    output: Option<String>,
    input_tokens: u64,
    output_tokens: u64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    total_time: Option<Duration>,
    retry_count: u32,
}

impl Task {
    /// Create a task run by `agent_id`
    pub fn new(
        agent_id: impl Into<AgentId>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent_id: agent_id.into(),
            dependencies: Vec::new(),
            context: String::new(),
            output: None,
            input_tokens: 0,
            output_tokens: 0,
            start_time: None,
            end_time: None,
            total_time: None,
            retry_count: 0,
        }
    }

    /// Replace the generated ID
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a dependency on another task
    pub fn depends_on(mut self, task: &Task) -> Self {
        self.dependencies.push(task.id.clone());
        self
    }

    /// Replace the dependency list with the given task IDs
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Brief as defined, placeholders unresolved
    pub fn brief(&self) -> Brief {
        Brief {
            description: self.description.clone(),
            expected_output: self.expected_output.clone(),
        }
    }

    /// Prompt built from the unresolved brief
    ///
    /// Placeholders are never substituted here, even after a run. Use
    /// `Workflow::resolved_brief(id)` and its `prompt()` for the text the
    /// model was sent.
    pub fn prompt(&self) -> String {
        self.brief().prompt()
    }

    /// Context assembled from dependency outputs during the last run
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Output of the last successful attempt
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Prompt tokens of the last successful attempt
    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    /// Completion tokens of the last successful attempt
    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    /// Wall-clock start of the successful attempt
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Wall-clock end of the successful attempt
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Duration of the successful attempt
    pub fn total_time(&self) -> Option<Duration> {
        self.total_time
    }

    /// Zero-based index of the attempt that succeeded, or of the last attempt
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub(crate) fn record_tokens(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
    }

    /// Clear everything a previous run left behind
    pub(crate) fn reset(&mut self) {
        self.context.clear();
        self.output = None;
        self.input_tokens = 0;
        self.output_tokens = 0;
        self.start_time = None;
        self.end_time = None;
        self.total_time = None;
        self.retry_count = 0;
    }

    /// Execute the task with the default attempt budget
    ///
    /// See [`Task::execute_with_attempts`].
    pub async fn execute(
        &mut self,
        agent: &mut Agent,
        persona: &Persona,
        brief: &Brief,
        completed: &[Task],
    ) -> Result<String, WorkflowError> {
        self.execute_with_attempts(agent, persona, brief, completed, DEFAULT_MAX_ATTEMPTS)
            .await
    }

    /// Execute the task, retrying failed attempts
    ///
    /// Context is taken from the outputs of `completed` tasks listed as
    /// dependencies. At least one attempt is always made.
    ///
    /// # Errors
    /// * `WorkflowError::TaskFailed` once every attempt has failed; the last
    ///   model error is kept as the source.
    pub async fn execute_with_attempts(
        &mut self,
        agent: &mut Agent,
        persona: &Persona,
        brief: &Brief,
        completed: &[Task],
        max_attempts: u32,
    ) -> Result<String, WorkflowError> {
        self.context = dependency_context(&self.dependencies, completed);
        let prompt = brief.prompt();
        let max_attempts = max_attempts.max(1);

        let mut attempt = 0;
        loop {
            self.retry_count = attempt;

            debug!(
                task_id = %self.id,
                agent_id = %agent.id,
                attempt = attempt + 1,
                max_attempts = max_attempts,
                "Starting task attempt"
            );

            let started_at = Utc::now();
            let clock = Instant::now();

            match agent.execute_task(persona, &prompt, self).await {
                Ok(output) => {
                    self.total_time = Some(clock.elapsed());
                    self.start_time = Some(started_at);
                    self.end_time = Some(Utc::now());

                    info!(
                        task_id = %self.id,
                        attempt = attempt + 1,
                        input_tokens = self.input_tokens,
                        output_tokens = self.output_tokens,
                        duration_ms = clock.elapsed().as_millis() as u64,
                        output_len = output.len(),
                        "Task completed"
                    );

                    self.output = Some(output.clone());
                    return Ok(output);
                }
                Err(e) => {
                    warn!(
                        task_id = %self.id,
                        attempt = attempt + 1,
                        error = %e,
                        "Task attempt failed"
                    );

                    if attempt + 1 < max_attempts {
                        attempt += 1;
                        warn!(
                            task_id = %self.id,
                            next_attempt = attempt + 1,
                            max_attempts = max_attempts,
                            "Retrying task"
                        );
                        continue;
                    }

                    error!(
                        task_id = %self.id,
                        attempts = max_attempts,
                        error = %e,
                        "Task failed after exhausting all attempts"
                    );

                    return Err(WorkflowError::TaskFailed {
                        task_id: self.id.clone(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Join the outputs of `dependencies` found in `completed`, in declared order
///
/// Dependencies without output are skipped.
pub fn dependency_context(dependencies: &[TaskId], completed: &[Task]) -> String {
    dependencies
        .iter()
        .filter_map(|dep| {
            completed
                .iter()
                .find(|task| &task.id == dep)
                .and_then(|task| task.output())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScriptedModel, StaticModel};
    use std::sync::Arc;

    fn finished(id: &str, output: Option<&str>) -> Task {
        let mut task = Task::new("agent", "d", "e").with_id(id);
        task.output = output.map(str::to_string);
        task
    }

    #[test]
    fn test_brief_prompt_embeds_expected_output() {
        let task = Task::new("agent", "Write a poem about {topic}", "Four lines");
        let prompt = task.prompt();

        assert!(prompt.starts_with("Write a poem about {topic}"));
        assert!(prompt.contains("not a summary"));
        assert!(prompt.ends_with("Four lines"));
    }

    #[test]
    fn test_dependency_context_order_and_missing() {
        let completed = vec![
            finished("a", Some("alpha")),
            finished("b", None),
            finished("c", Some("gamma")),
        ];

        let deps = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(dependency_context(&deps, &completed), "gamma\nalpha");
        assert_eq!(dependency_context(&[], &completed), "");
        assert_eq!(dependency_context(&["zzz".to_string()], &completed), "");
    }

    #[tokio::test]
    async fn test_execute_succeeds_after_failures() {
        let model = Arc::new(
            ScriptedModel::new()
                .fail_times(2, "flaky")
                .respond("finally", 3, 4),
        );
        let mut agent = Agent::with_model("r", "g", "b", Arc::clone(&model));
        let mut task = Task::new(&agent.id, "d", "e");
        let persona = agent.persona();
        let brief = task.brief();

        let output = task
            .execute(&mut agent, &persona, &brief, &[])
            .await
            .unwrap();

        assert_eq!(output, "finally");
        assert_eq!(task.output(), Some("finally"));
        assert_eq!(task.retry_count(), 2);
        assert_eq!(task.input_tokens(), 3);
        assert_eq!(task.output_tokens(), 4);
        assert!(task.start_time().is_some());
        assert!(task.end_time() >= task.start_time());
        assert!(task.total_time().is_some());
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_execute_fails_after_budget() {
        let model = Arc::new(ScriptedModel::new().fail_times(5, "model unavailable"));
        let mut agent = Agent::with_model("r", "g", "b", Arc::clone(&model));
        let mut task = Task::new(&agent.id, "d", "e").with_id("t1");
        let persona = agent.persona();
        let brief = task.brief();

        let err = task
            .execute_with_attempts(&mut agent, &persona, &brief, &[], 2)
            .await
            .unwrap_err();

        match &err {
            WorkflowError::TaskFailed {
                task_id, attempts, ..
            } => {
                assert_eq!(task_id, "t1");
                assert_eq!(*attempts, 2);
            }
            other => panic!("Expected TaskFailed, got {:?}", other),
        }
        assert!(err.to_string().contains("model unavailable"));
        assert_eq!(task.retry_count(), 1);
        assert!(task.output().is_none());
        assert!(task.start_time().is_none());
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let mut agent = Agent::with_model("r", "g", "b", StaticModel::new("ok"));
        let mut task = Task::new(&agent.id, "d", "e");
        let persona = agent.persona();
        let brief = task.brief();

        let output = task
            .execute_with_attempts(&mut agent, &persona, &brief, &[], 0)
            .await
            .unwrap();
        assert_eq!(output, "ok");
        assert_eq!(task.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_context_reaches_prompt() {
        let model = Arc::new(ScriptedModel::new().respond("child", 1, 1));
        let mut agent = Agent::with_model("r", "g", "b", Arc::clone(&model));
        let parent = finished("parent", Some("parent output"));
        let mut child = Task::new(&agent.id, "d", "e").depends_on(&parent);
        let persona = agent.persona();
        let brief = child.brief();

        child
            .execute(&mut agent, &persona, &brief, std::slice::from_ref(&parent))
            .await
            .unwrap();

        assert_eq!(child.context(), "parent output");
        assert!(model.prompts()[0].ends_with("parent output"));
    }

    #[test]
    fn test_reset_clears_run_state() {
        let mut task = finished("a", Some("x"));
        task.record_tokens(5, 6);
        task.retry_count = 2;

        task.reset();
        assert!(task.output().is_none());
        assert_eq!(task.input_tokens(), 0);
        assert_eq!(task.retry_count(), 0);
    }
}
