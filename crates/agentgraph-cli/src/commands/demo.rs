//! `agentgraph demo`: an in-memory, no-Postgres-required walkthrough. Submits
//! a two-task blueprint (`HelloWorld` agent feeding an `Echo` tool) and
//! dispatches it to completion, printing each task's final state.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use agentgraph_core::{EchoToolExecutor, ExecutorRegistry, GraphEngine, HelloWorldAgentExecutor};
use agentgraph_types::{EdgeDefinition, PlanBlueprint, TaskDefinition};

use crate::output::{print_field, OutputFormat};

pub async fn run(store: Arc<dyn agentgraph_core::TaskStore>, output: OutputFormat) -> Result<()> {
    let executors = ExecutorRegistry::new()
        .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor))
        .with_tool("Echo", Arc::new(EchoToolExecutor));
    let engine = GraphEngine::new(store.clone(), executors);

    let blueprint = PlanBlueprint {
        workflow_id: None,
        new_tasks: vec![
            TaskDefinition {
                task_id: "greet".into(),
                parent_task_id: None,
                input_data: json!({}),
                assignee_id: "Agent:HelloWorld".into(),
                context_overrides: None,
                directives: None,
            },
            TaskDefinition {
                task_id: "echo".into(),
                parent_task_id: None,
                input_data: json!({}),
                assignee_id: "Tool:Echo".into(),
                context_overrides: None,
                directives: None,
            },
        ],
        new_edges: vec![EdgeDefinition {
            source_task_id: "greet".into(),
            target_task_id: "echo".into(),
            condition: None,
            data_flow: None,
        }],
        update_tasks: vec![],
    };

    let workflow_id = store
        .create_workflow_from_blueprint(blueprint)
        .await
        .context("materializing demo blueprint")?;

    let edges = store.get_edges_by_workflow_id(workflow_id).await?;
    let greet_task_id = edges
        .first()
        .map(|e| e.source_task_id)
        .ok_or_else(|| anyhow::anyhow!("demo blueprint produced no edges"))?;

    // First pass: claims `greet` PENDING -> RUNNING, runs the agent, and
    // records its FinalAnswer as COMPLETED. Successor activation doesn't
    // happen here -- it's driven by a second dispatch of the now-completed
    // task, the same as the work queue re-delivering its own completion
    // notification.
    engine
        .dispatch_one(greet_task_id)
        .await
        .context("dispatching greet task")?;

    // Second pass: claim_task returns the COMPLETED task read-only, so this
    // call routes straight to activate_successors, evaluating `echo`'s edge
    // and writing its data-flow-mapped input.
    engine
        .dispatch_one(greet_task_id)
        .await
        .context("activating greet's successors")?;

    let echo_task_id = edges[0].target_task_id;
    engine
        .dispatch_one(echo_task_id)
        .await
        .context("dispatching echo task")?;

    print_result(store.as_ref(), workflow_id, greet_task_id, echo_task_id, output).await
}

async fn print_result(
    store: &dyn agentgraph_core::TaskStore,
    workflow_id: Uuid,
    greet_task_id: Uuid,
    echo_task_id: Uuid,
    output: OutputFormat,
) -> Result<()> {
    let greet = store.get_task_by_id(greet_task_id).await?;
    let echo = store.get_task_by_id(echo_task_id).await?;

    if output.is_text() {
        print_field("workflow_id", &workflow_id.to_string());
        if let Some(task) = &greet {
            print_field("greet.status", &task.status.to_string());
        }
        if let Some(task) = &echo {
            print_field("echo.status", &task.status.to_string());
            if let Some(result) = &task.result {
                print_field("echo.result", &result.to_string());
            }
        }
    } else {
        output.print_value(&json!({
            "workflow_id": workflow_id,
            "greet": greet,
            "echo": echo,
        }));
    }
    Ok(())
}
