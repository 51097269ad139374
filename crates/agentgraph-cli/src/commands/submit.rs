//! `agentgraph submit`: materialize a `PlanBlueprint` read from a file.

use anyhow::{Context, Result};
use clap::Args;

use agentgraph_core::TaskStore;
use agentgraph_types::PlanBlueprint;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct SubmitArgs {
    /// Path to a JSON or YAML file containing a `PlanBlueprint`.
    #[arg(long, short)]
    pub file: String,
}

fn parse_blueprint(path: &str, contents: &str) -> Result<PlanBlueprint> {
    if path.ends_with(".yaml") || path.ends_with(".yml") {
        serde_yaml::from_str(contents).context("parsing blueprint as YAML")
    } else {
        serde_json::from_str(contents).context("parsing blueprint as JSON")
    }
}

pub async fn run(args: SubmitArgs, store: &dyn TaskStore, output: OutputFormat) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading blueprint file {}", args.file))?;
    let blueprint = parse_blueprint(&args.file, &contents)?;

    let workflow_id = store
        .create_workflow_from_blueprint(blueprint)
        .await
        .context("materializing blueprint")?;

    if output.is_text() {
        println!("workflow_id: {workflow_id}");
    } else {
        output.print_value(&serde_json::json!({ "workflow_id": workflow_id }));
    }
    Ok(())
}
