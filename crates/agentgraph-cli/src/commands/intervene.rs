//! `agentgraph intervene`: operator actions against a running task --
//! pause, resume, or roll back to a prior history version.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use uuid::Uuid;

use agentgraph_core::TaskStore;
use agentgraph_types::{InterventionRequest, InterventionType};

#[derive(Clone, Copy, ValueEnum)]
pub enum InterventionKind {
    Pause,
    Resume,
    Rollback,
}

#[derive(Args)]
pub struct InterveneArgs {
    #[arg(long, value_enum)]
    pub kind: InterventionKind,

    #[arg(long)]
    pub task_id: Uuid,

    /// Required for `rollback`: the `TaskHistoryRecord.version_number` to
    /// restore.
    #[arg(long)]
    pub version: Option<i32>,

    /// Overrides `input_data` on resume/rollback instead of restoring the
    /// snapshot's own value.
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long, default_value = "")]
    pub comment: String,
}

pub async fn run(args: InterveneArgs, store: &dyn TaskStore) -> Result<()> {
    let intervention_type = match args.kind {
        InterventionKind::Pause => InterventionType::Pause,
        InterventionKind::Resume => InterventionType::Resume,
        InterventionKind::Rollback => InterventionType::RollbackAndModify,
    };

    let new_input_data = args
        .input
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("parsing --input as JSON")?;

    let request = InterventionRequest {
        intervention_type,
        target_task_id: args.task_id,
        rollback_to_version: args.version,
        new_input_data,
        new_assignee_id: args.assignee,
        comment: args.comment,
    };

    store
        .apply_intervention(request)
        .await
        .context("applying intervention")?;
    println!("applied to task {}", args.task_id);
    Ok(())
}
