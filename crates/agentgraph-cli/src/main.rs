// agentgraph CLI
//
// Design Decision: operate the orchestrator directly against the store
// (submit a blueprint, inspect a task, list pending tasks, run a worker)
// rather than through an HTTP client, since no HTTP surface is in scope.
// Design Decision: clap derive for ergonomic argument parsing.
// Design Decision: text/json/yaml output formats for scripting.

mod commands;
mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentgraph")]
#[command(about = "Operate a durable agent graph orchestrator")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Materialize a `PlanBlueprint` read from a file against `DATABASE_URL`.
    Submit(commands::submit::SubmitArgs),

    /// Inspect tasks, edges, and history.
    Task {
        #[command(subcommand)]
        command: commands::task::TaskCommand,
    },

    /// Pause, resume, or roll back a task.
    Intervene(commands::intervene::InterveneArgs),

    /// Run the full durable worker pipeline against `DATABASE_URL`.
    Worker(commands::worker::WorkerArgs),

    /// Run an in-memory walkthrough; no `DATABASE_URL` required.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(?path, "loaded .env");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Submit(args) => {
            let store = commands::connect_store().await?;
            commands::submit::run(args, store.as_ref(), output_format).await
        }
        Commands::Task { command } => {
            let store = commands::connect_store().await?;
            commands::task::run(command, store.as_ref(), output_format).await
        }
        Commands::Intervene(args) => {
            let store = commands::connect_store().await?;
            commands::intervene::run(args, store.as_ref()).await
        }
        Commands::Worker(args) => {
            let database_url = std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set to run a worker"))?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(args.concurrency as u32 + 2)
                .connect(&database_url)
                .await?;
            let store = Arc::new(agentgraph_core::PostgresTaskStore::new(pool));
            store.migrate().await?;
            commands::worker::run(args, store).await
        }
        Commands::Demo => {
            let store = commands::in_memory_store();
            commands::demo::run(store, output_format).await
        }
    }
}
