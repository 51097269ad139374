//! `agentgraph task`: inspect tasks, edges, and history directly against the
//! store.

use anyhow::{Context, Result};
use clap::Subcommand;
use uuid::Uuid;

use agentgraph_core::TaskStore;

use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Fetch a task by id.
    Get { task_id: Uuid },

    /// List every task currently `PENDING`.
    List,

    /// List a task's version history.
    History { task_id: Uuid },

    /// List every edge belonging to a workflow.
    Edges { workflow_id: Uuid },
}

pub async fn run(command: TaskCommand, store: &dyn TaskStore, output: OutputFormat) -> Result<()> {
    match command {
        TaskCommand::Get { task_id } => {
            let task = store
                .get_task_by_id(task_id)
                .await
                .context("fetching task")?
                .ok_or_else(|| anyhow::anyhow!("task not found: {task_id}"))?;
            if output.is_text() {
                print_field("id", &task.id.to_string());
                print_field("workflow_id", &task.workflow_id.to_string());
                print_field("assignee_id", &task.assignee_id);
                print_field("status", &task.status.to_string());
                print_field("input_data", &task.input_data.to_string());
                if let Some(result) = &task.result {
                    print_field("result", &result.to_string());
                }
            } else {
                output.print_value(&task);
            }
        }
        TaskCommand::List => {
            let tasks = store.list_pending_tasks().await.context("listing pending tasks")?;
            if output.is_text() {
                print_table_header(&[("ID", 36), ("ASSIGNEE", 24), ("STATUS", 10)]);
                for task in &tasks {
                    print_table_row(&[
                        (task.id.to_string().as_str(), 36),
                        (task.assignee_id.as_str(), 24),
                        (task.status.to_string().as_str(), 10),
                    ]);
                }
            } else {
                output.print_value(&tasks);
            }
        }
        TaskCommand::History { task_id } => {
            let history = store.list_history(task_id).await.context("listing task history")?;
            if output.is_text() {
                print_table_header(&[("VERSION", 8), ("CREATED_AT", 30)]);
                for record in &history {
                    print_table_row(&[
                        (record.version_number.to_string().as_str(), 8),
                        (record.created_at.to_rfc3339().as_str(), 30),
                    ]);
                }
            } else {
                output.print_value(&history);
            }
        }
        TaskCommand::Edges { workflow_id } => {
            let edges = store
                .get_edges_by_workflow_id(workflow_id)
                .await
                .context("listing workflow edges")?;
            if output.is_text() {
                print_table_header(&[("SOURCE", 36), ("TARGET", 36)]);
                for edge in &edges {
                    print_table_row(&[
                        (edge.source_task_id.to_string().as_str(), 36),
                        (edge.target_task_id.to_string().as_str(), 36),
                    ]);
                }
            } else {
                output.print_value(&edges);
            }
        }
    }
    Ok(())
}
