//! Agent Workflow Library
//!
//! Runs sequences of agent calls against a language model. Each task's
//! output can feed later tasks as context; failed attempts are retried and
//! token and timing totals are collected per task and per run.
//! The CLI binary is in `src/main.rs`.

pub mod agent;
pub mod config;
pub mod definition;
pub mod error;
pub mod logging;
pub mod model;
pub mod task;
pub mod template;
pub mod workflow;

pub use agent::{Agent, AgentId, AgentState, Persona};
pub use error::WorkflowError;
pub use model::{FormattedResponse, ModelClient, ModelError};
pub use task::{Brief, Task, TaskId};
pub use template::{Input, InputValue};
pub use workflow::{Workflow, WorkflowReport, WorkflowStatus};
