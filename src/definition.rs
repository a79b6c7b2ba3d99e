//! Workflow definition files
//!
//! JSON documents describing agents and tasks. Building a definition needs a
//! factory that supplies the model client for each agent.
//!
//! ```json
//! {
//!   "id": "blog",
//!   "agents": [
//!     {"id": "researcher", "role": "research analyst", "goal": "find facts about {topic}", "background": "You cite sources"}
//!   ],
//!   "tasks": [
//!     {"id": "notes", "agent": "researcher", "description": "Collect notes on {topic}", "expected_output": "Bullet list"},
//!     {"id": "post", "agent": "researcher", "description": "Write the post", "expected_output": "Markdown", "depends_on": ["notes"]}
//!   ]
//! }
//! ```

use crate::agent::Agent;
use crate::error::WorkflowError;
use crate::model::ModelClient;
use crate::task::Task;
use crate::template::Input;
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow ID (generated when absent)
    #[serde(default)]
    pub id: Option<String>,
    /// Agents available to tasks
    pub agents: Vec<AgentDefinition>,
    /// Tasks, in execution order
    pub tasks: Vec<TaskDefinition>,
    /// Attempt budget per task
    #[serde(default, alias = "maxAttempts")]
    pub max_attempts: Option<u32>,
}

/// Serialized agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Agent ID referenced by tasks
    pub id: String,
    /// Role text
    pub role: String,
    /// Goal text
    pub goal: String,
    /// Background text
    #[serde(default)]
    pub background: String,
}

/// Serialized task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task ID referenced by dependents
    pub id: String,
    /// ID of the agent that runs the task
    pub agent: String,
    /// Description text
    pub description: String,
    /// Expected output text
    #[serde(alias = "expectedOutput")]
    pub expected_output: String,
    /// IDs of tasks whose outputs become context
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl WorkflowDefinition {
    /// Parse a definition from JSON text
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a definition file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json).map_err(|e| {
            WorkflowError::Definition(format!("{}: {}", path.display(), e))
        })
    }

    /// Build a runnable workflow
    ///
    /// `model_for` is called once per agent, in definition order.
    ///
    /// # Errors
    /// * Whatever `model_for` returns (typically `WorkflowError::Config`).
    /// * `WorkflowError::InvalidWorkflow` for broken references.
    pub fn build<F>(&self, mut model_for: F) -> Result<Workflow, WorkflowError>
    where
        F: FnMut(&AgentDefinition) -> Result<Box<dyn ModelClient>, WorkflowError>,
    {
        let agents = self
            .agents
            .iter()
            .map(|def| {
                let model = model_for(def)?;
                Ok(
                    Agent::with_boxed_model(&def.role, &def.goal, &def.background, model)
                        .with_id(&def.id),
                )
            })
            .collect::<Result<Vec<_>, WorkflowError>>()?;

        let tasks = self
            .tasks
            .iter()
            .map(|def| {
                Task::new(&def.agent, &def.description, &def.expected_output)
                    .with_id(&def.id)
                    .with_dependencies(def.depends_on.iter().cloned())
            })
            .collect();

        let mut workflow = Workflow::new(agents, tasks)?;
        if let Some(id) = &self.id {
            workflow = workflow.with_id(id);
        }
        if let Some(max_attempts) = self.max_attempts {
            workflow = workflow.with_max_attempts(max_attempts);
        }
        Ok(workflow)
    }
}

/// Read placeholder values from a JSON object file
pub async fn load_input(path: impl AsRef<Path>) -> Result<Input, WorkflowError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&json)
        .map_err(|e| WorkflowError::Definition(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaticModel;
    use crate::template::InputValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BLOG: &str = r#"{
        "id": "blog",
        "agents": [
            {"id": "researcher", "role": "research analyst", "goal": "find facts about {topic}", "background": "You cite sources"},
            {"id": "writer", "role": "writer", "goal": "write", "background": "Plain style"}
        ],
        "tasks": [
            {"id": "notes", "agent": "researcher", "description": "Collect notes on {topic}", "expected_output": "Bullet list"},
            {"id": "post", "agent": "writer", "description": "Write the post", "expectedOutput": "Markdown", "depends_on": ["notes"]}
        ],
        "max_attempts": 2
    }"#;

    fn static_factory(def: &AgentDefinition) -> Result<Box<dyn ModelClient>, WorkflowError> {
        Ok(Box::new(StaticModel::new(format!("from {}", def.id))))
    }

    #[test]
    fn test_build_from_json() {
        let definition = WorkflowDefinition::from_json(BLOG).unwrap();
        let workflow = definition.build(static_factory).unwrap();

        assert_eq!(workflow.id(), "blog");
        assert_eq!(workflow.max_attempts(), 2);
        assert_eq!(workflow.agents().len(), 2);
        assert_eq!(workflow.task("post").unwrap().dependencies, vec!["notes"]);
        assert_eq!(workflow.task("post").unwrap().expected_output, "Markdown");
    }

    #[tokio::test]
    async fn test_built_workflow_runs() {
        let definition = WorkflowDefinition::from_json(BLOG).unwrap();
        let mut workflow = definition.build(static_factory).unwrap();

        let input = Input::from([("topic".to_string(), InputValue::from("tea"))]);
        let output = workflow.initiate(Some(&input)).await.unwrap();

        assert_eq!(output, "from writer");
        assert_eq!(workflow.task("post").unwrap().context(), "from researcher");
    }

    #[test]
    fn test_factory_error_propagates() {
        let definition = WorkflowDefinition::from_json(BLOG).unwrap();
        let result = definition.build(|_| Err(WorkflowError::Config("no key".to_string())));
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let json = r#"{"agents": [], "tasks": [{"id": "t", "agent": "nobody", "description": "d", "expected_output": "e"}]}"#;
        let definition = WorkflowDefinition::from_json(json).unwrap();
        let err = definition.build(static_factory).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
    }

    #[tokio::test]
    async fn test_load_files() {
        let mut def_file = NamedTempFile::new().unwrap();
        def_file.write_all(BLOG.as_bytes()).unwrap();
        let definition = WorkflowDefinition::load(def_file.path()).await.unwrap();
        assert_eq!(definition.tasks.len(), 2);

        let mut input_file = NamedTempFile::new().unwrap();
        input_file
            .write_all(br#"{"topic": "tea", "count": 3}"#)
            .unwrap();
        let input = load_input(input_file.path()).await.unwrap();
        assert_eq!(input["count"], InputValue::Integer(3));

        let mut bad_file = NamedTempFile::new().unwrap();
        bad_file.write_all(b"not json").unwrap();
        let err = WorkflowDefinition::load(bad_file.path()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Definition(_)));
    }
}
