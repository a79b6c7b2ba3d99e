//! Agent Workflow CLI
//!
//! Runs a workflow definition file and prints the final task's output.

use agent_workflow::config::Config;
use agent_workflow::definition::{load_input, AgentDefinition, WorkflowDefinition};
use agent_workflow::logging::{self, LogConfig};
use agent_workflow::model::{GeminiClient, ModelClient, StaticModel};
use agent_workflow::{Input, InputValue, WorkflowError};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Run a sequential multi-agent workflow
#[derive(Debug, Parser)]
#[command(name = "agent-workflow", version, about)]
struct Cli {
    /// Workflow definition file (JSON)
    definition: PathBuf,

    /// Placeholder value as key=value (repeatable)
    #[arg(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    inputs: Vec<(String, String)>,

    /// JSON object with placeholder values
    #[arg(long, value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Attempts per task (overrides the definition and WORKFLOW_MAX_ATTEMPTS)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print a JSON run report after the output
    #[arg(long)]
    report: bool,

    /// Answer every task with a canned response instead of calling Gemini
    #[arg(long)]
    dry_run: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(max_attempts) = cli.max_attempts {
        config.workflow.max_attempts = max_attempts;
    }
    config.validate()?;

    let _log_guard = logging::init(&LogConfig {
        filter: config.log_filter.clone(),
        log_file: cli.log_file.clone(),
    })?;

    let definition = WorkflowDefinition::load(&cli.definition).await?;

    let mut input = match &cli.input_file {
        Some(path) => Some(load_input(path).await?),
        None => None,
    };
    if !cli.inputs.is_empty() {
        let values = input.get_or_insert_with(Input::new);
        for (key, value) in &cli.inputs {
            values.insert(key.clone(), InputValue::Text(value.clone()));
        }
    }

    let gemini = config.gemini.clone();
    let dry_run = cli.dry_run;
    let mut workflow = definition
        .build(|agent: &AgentDefinition| -> Result<Box<dyn ModelClient>, WorkflowError> {
            if dry_run {
                Ok(Box::new(StaticModel::new(format!(
                    "[dry run] response from {}",
                    agent.id
                ))))
            } else {
                Ok(Box::new(GeminiClient::new(&gemini)?))
            }
        })
        .context("Failed to build workflow")?;

    let max_attempts = cli
        .max_attempts
        .or(definition.max_attempts)
        .unwrap_or(config.workflow.max_attempts);
    workflow = workflow.with_max_attempts(max_attempts);

    info!(
        definition = %cli.definition.display(),
        workflow_id = %workflow.id(),
        dry_run = dry_run,
        "Running workflow"
    );

    let result = workflow.initiate(input.as_ref()).await;

    if let Ok(output) = &result {
        println!("{}", output);
    }
    if cli.report {
        println!("{}", serde_json::to_string_pretty(&workflow.report())?);
    }

    result.map(|_| ()).context("Workflow run failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("topic=Rust"),
            Ok(("topic".to_string(), "Rust".to_string()))
        );
        assert_eq!(
            parse_key_value("eq=a=b"),
            Ok(("eq".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_inputs() {
        let cli = Cli::parse_from([
            "agent-workflow",
            "flow.json",
            "-i",
            "topic=Rust",
            "--input",
            "audience=kids",
            "--max-attempts",
            "5",
            "--dry-run",
        ]);
        assert_eq!(cli.definition, PathBuf::from("flow.json"));
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.max_attempts, Some(5));
        assert!(cli.dry_run);
        assert!(!cli.report);
    }
}
