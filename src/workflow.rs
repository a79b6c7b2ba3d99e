//! Workflows
//!
//! A workflow runs its tasks one at a time, in the order they were given.
//! Placeholders are resolved into a per-run view first, so agent and task
//! definitions are never rewritten and a workflow can be run again with
//! different input. The output of the last task in the list is the result of
//! the run; the caller is responsible for listing tasks in dependency order.

use crate::agent::{Agent, AgentId, AgentState, Persona};
use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::error::WorkflowError;
use crate::task::{Brief, Task, TaskId};
use crate::template::{self, Input};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Unique identifier for a workflow
pub type WorkflowId = String;

/// Lifecycle of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// `initiate` has not been called yet
    NotStarted,
    /// A run is in progress
    Running,
    /// The last run returned the final task's output
    Completed,
    /// The last run failed
    Failed,
}

/// Text resolved for a single run, keyed by agent and task ID
#[derive(Debug, Clone, Default)]
struct RunView {
    personas: HashMap<AgentId, Persona>,
    briefs: HashMap<TaskId, Brief>,
}

impl RunView {
    fn build(agents: &[Agent], tasks: &[Task], input: Option<&Input>) -> Self {
        let personas = agents
            .iter()
            .map(|agent| {
                let persona = agent.persona();
                let persona = match input {
                    Some(input) => persona.resolve(input),
                    None => persona,
                };
                (agent.id.clone(), persona)
            })
            .collect();

        let briefs = tasks
            .iter()
            .map(|task| {
                let brief = task.brief();
                let brief = match input {
                    Some(input) => brief.resolve(input),
                    None => brief,
                };
                (task.id.clone(), brief)
            })
            .collect();

        Self { personas, briefs }
    }
}

/// Ordered set of tasks and the agents that run them
#[derive(Debug)]
pub struct Workflow {
    id: WorkflowId,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    max_attempts: u32,
    status: WorkflowStatus,
    input_tokens: u64,
    output_tokens: u64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    total_time: Option<Duration>,
    view: RunView,
}

impl Workflow {
    /// Create a workflow from agents and tasks
    ///
    /// An empty task list is accepted here; running it fails with
    /// `WorkflowError::DidNotComplete`. Dependency cycles are not detected.
    ///
    /// # Errors
    /// * `WorkflowError::InvalidWorkflow` for duplicate agent or task IDs,
    ///   tasks naming an unknown agent, unknown dependencies or a task that
    ///   depends on itself.
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>) -> Result<Self, WorkflowError> {
        validate(&agents, &tasks)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            agents,
            tasks,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: WorkflowStatus::NotStarted,
            input_tokens: 0,
            output_tokens: 0,
            start_time: None,
            end_time: None,
            total_time: None,
            view: RunView::default(),
        })
    }

    /// Replace the generated ID
    pub fn with_id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the number of attempts each task gets (at least one is always made)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Workflow ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Agents, in the order given
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Tasks, in execution order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up an agent by ID
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Look up a task by ID
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Attempt budget per task
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Status of the most recent run
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Prompt tokens summed over tasks that produced output
    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    /// Completion tokens summed over tasks that produced output
    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    /// Start of the most recent run
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// End of the most recent successful run
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Duration of the most recent successful run
    pub fn total_time(&self) -> Option<Duration> {
        self.total_time
    }

    /// Persona text used for `agent_id` in the most recent run
    pub fn resolved_persona(&self, agent_id: &str) -> Option<&Persona> {
        self.view.personas.get(agent_id)
    }

    /// Brief text used for `task_id` in the most recent run
    pub fn resolved_brief(&self, task_id: &str) -> Option<&Brief> {
        self.view.briefs.get(task_id)
    }

    /// Every placeholder name referenced by agent or task text
    pub fn placeholders(&self) -> BTreeSet<String> {
        let agent_text = self
            .agents
            .iter()
            .flat_map(|a| [a.role.as_str(), a.goal.as_str(), a.background.as_str()]);
        let task_text = self
            .tasks
            .iter()
            .flat_map(|t| [t.description.as_str(), t.expected_output.as_str()]);

        agent_text
            .chain(task_text)
            .flat_map(template::placeholders)
            .collect()
    }

    /// Placeholder names that `input` does not supply
    pub fn missing_inputs(&self, input: &Input) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| !input.contains_key(name))
            .collect()
    }

    /// Run every task in order and return the last task's output
    ///
    /// When `input` is given, placeholders in agent and task text are
    /// resolved for this run. Missing keys are logged and left in the text.
    ///
    /// # Errors
    /// * `WorkflowError::TaskFailed` when a task exhausts its attempts; no
    ///   further tasks run.
    /// * `WorkflowError::DidNotComplete` when there are no tasks.
    pub async fn initiate(&mut self, input: Option<&Input>) -> Result<String, WorkflowError> {
        let span = info_span!(
            "workflow",
            workflow_id = %self.id,
            run_id = %Uuid::new_v4(),
        );
        self.run(input).instrument(span).await
    }

    async fn run(&mut self, input: Option<&Input>) -> Result<String, WorkflowError> {
        self.reset();

        if let Some(input) = input {
            let missing = self.missing_inputs(input);
            if !missing.is_empty() {
                warn!(missing = ?missing, "Placeholders without input values are left unresolved");
            }
        }
        self.view = RunView::build(&self.agents, &self.tasks, input);

        self.status = WorkflowStatus::Running;
        self.start_time = Some(Utc::now());
        let clock = Instant::now();

        info!(
            task_count = self.tasks.len(),
            agent_count = self.agents.len(),
            max_attempts = self.max_attempts,
            "Workflow started"
        );

        let last_index = self.tasks.len().checked_sub(1);
        for index in 0..self.tasks.len() {
            let (completed, remaining) = self.tasks.split_at_mut(index);
            let task = &mut remaining[0];

            let agent = self
                .agents
                .iter_mut()
                .find(|agent| agent.id == task.agent_id)
                .ok_or_else(|| {
                    WorkflowError::InvalidWorkflow(format!(
                        "Task '{}' references unknown agent '{}'",
                        task.id, task.agent_id
                    ))
                })?;
            let persona = self.view.personas.get(&agent.id).ok_or_else(|| {
                WorkflowError::InvalidWorkflow(format!("No persona resolved for agent '{}'", agent.id))
            })?;
            let brief = self.view.briefs.get(&task.id).ok_or_else(|| {
                WorkflowError::InvalidWorkflow(format!("No brief resolved for task '{}'", task.id))
            })?;

            match task
                .execute_with_attempts(agent, persona, brief, completed, self.max_attempts)
                .await
            {
                Ok(output) => {
                    self.input_tokens += task.input_tokens();
                    self.output_tokens += task.output_tokens();

                    if Some(index) == last_index {
                        self.end_time = Some(Utc::now());
                        self.total_time = Some(clock.elapsed());
                        self.status = WorkflowStatus::Completed;

                        info!(
                            input_tokens = self.input_tokens,
                            output_tokens = self.output_tokens,
                            duration_ms = clock.elapsed().as_millis() as u64,
                            "Workflow completed"
                        );
                        return Ok(output);
                    }
                }
                Err(e) => {
                    self.status = WorkflowStatus::Failed;
                    error!(
                        task_id = %task.id,
                        completed_tasks = index,
                        error = %e,
                        "Workflow failed"
                    );
                    return Err(e);
                }
            }
        }

        self.status = WorkflowStatus::Failed;
        error!("Workflow did not complete: no tasks to run");
        Err(WorkflowError::DidNotComplete)
    }

    fn reset(&mut self) {
        for task in &mut self.tasks {
            task.reset();
        }
        self.input_tokens = 0;
        self.output_tokens = 0;
        self.start_time = None;
        self.end_time = None;
        self.total_time = None;
        self.view = RunView::default();
    }

    /// Summary of the most recent run
    pub fn report(&self) -> WorkflowReport {
        WorkflowReport {
            workflow_id: self.id.clone(),
            status: self.status,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            start_time: self.start_time,
            end_time: self.end_time,
            total_time_ms: self.total_time.map(|d| d.as_millis() as u64),
            agents: self
                .agents
                .iter()
                .map(|agent| AgentReport {
                    agent_id: agent.id.clone(),
                    state: agent.state(),
                })
                .collect(),
            tasks: self
                .tasks
                .iter()
                .map(|task| TaskReport {
                    task_id: task.id.clone(),
                    agent_id: task.agent_id.clone(),
                    completed: task.output().is_some(),
                    retry_count: task.retry_count(),
                    input_tokens: task.input_tokens(),
                    output_tokens: task.output_tokens(),
                    start_time: task.start_time(),
                    end_time: task.end_time(),
                    total_time_ms: task.total_time().map(|d| d.as_millis() as u64),
                })
                .collect(),
        }
    }
}

/// Check IDs and references before a workflow is built
fn validate(agents: &[Agent], tasks: &[Task]) -> Result<(), WorkflowError> {
    let mut agent_ids = HashSet::new();
    for agent in agents {
        if !agent_ids.insert(agent.id.as_str()) {
            return Err(WorkflowError::InvalidWorkflow(format!(
                "Duplicate agent ID '{}'",
                agent.id
            )));
        }
    }

    let mut task_ids = HashSet::new();
    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            return Err(WorkflowError::InvalidWorkflow(format!(
                "Duplicate task ID '{}'",
                task.id
            )));
        }
    }

    for task in tasks {
        if !agent_ids.contains(task.agent_id.as_str()) {
            return Err(WorkflowError::InvalidWorkflow(format!(
                "Task '{}' references unknown agent '{}'",
                task.id, task.agent_id
            )));
        }
        for dep in &task.dependencies {
            if dep == &task.id {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "Task '{}' cannot depend on itself",
                    task.id
                )));
            }
            if !task_ids.contains(dep.as_str()) {
                return Err(WorkflowError::InvalidWorkflow(format!(
                    "Task '{}' depends on unknown task '{}'",
                    task.id, dep
                )));
            }
        }
    }

    Ok(())
}

/// Serializable summary of a workflow run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    /// Workflow ID
    pub workflow_id: WorkflowId,
    /// Run status
    pub status: WorkflowStatus,
    /// Prompt tokens across completed tasks
    pub input_tokens: u64,
    /// Completion tokens across completed tasks
    pub output_tokens: u64,
    /// Run start
    pub start_time: Option<DateTime<Utc>>,
    /// Run end (successful runs only)
    pub end_time: Option<DateTime<Utc>>,
    /// Run duration in milliseconds (successful runs only)
    pub total_time_ms: Option<u64>,
    /// Final agent states
    pub agents: Vec<AgentReport>,
    /// Per-task results, in execution order
    pub tasks: Vec<TaskReport>,
}

/// Agent entry in a [`WorkflowReport`]
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    /// Agent ID
    pub agent_id: AgentId,
    /// State after the run
    pub state: AgentState,
}

/// Task entry in a [`WorkflowReport`]
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Task ID
    pub task_id: TaskId,
    /// Agent that ran the task
    pub agent_id: AgentId,
    /// Whether the task produced output
    pub completed: bool,
    /// Zero-based index of the final attempt
    pub retry_count: u32,
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Start of the successful attempt
    pub start_time: Option<DateTime<Utc>>,
    /// End of the successful attempt
    pub end_time: Option<DateTime<Utc>>,
    /// Duration of the successful attempt in milliseconds
    pub total_time_ms: Option<u64>,
}
