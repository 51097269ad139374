//! `agentgraph worker run`: the full durable pipeline -- `LISTEN`/`NOTIFY`
//! feeding a bounded work queue, backstopped by a reconciliation sweep, all
//! drained concurrently through a `WorkerPool`.
//!
//! Only the `HelloWorld`/`Echo` fixture executors are registered here. A real
//! deployment embeds `agentgraph-core` directly and registers its own
//! `AgentExecutor`/`ToolExecutor` implementations against an
//! `ExecutorRegistry`; this binary's job is to demonstrate the orchestrator
//! operating against a real Postgres instance end to end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{error, info};

use agentgraph_core::{
    work_queue, EchoToolExecutor, ExecutorRegistry, GraphEngine, HelloWorldAgentExecutor,
    NotificationListener, PostgresTaskStore, ReconciliationSweeper, WorkerPool, WorkerPoolConfig,
};

#[derive(Args)]
pub struct WorkerArgs {
    /// Maximum number of concurrently in-flight dispatch cycles.
    #[arg(long, env = "WORKER_CONCURRENCY", default_value = "20")]
    pub concurrency: usize,

    /// Reconciliation sweep interval, in seconds.
    #[arg(long, default_value = "30")]
    pub sweep_interval_secs: u64,
}

pub async fn run(args: WorkerArgs, store: Arc<PostgresTaskStore>) -> Result<()> {
    let executors = ExecutorRegistry::new()
        .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor))
        .with_tool("Echo", Arc::new(EchoToolExecutor));

    let task_store: Arc<dyn agentgraph_core::TaskStore> = store.clone();
    let engine = GraphEngine::new(task_store.clone(), executors);
    let pool = WorkerPool::new(engine, WorkerPoolConfig::new(args.concurrency))
        .map_err(|e| anyhow::anyhow!("invalid worker pool configuration: {e}"))?;

    let (producer, consumer) = work_queue(1024);

    let sweeper = ReconciliationSweeper::new(
        task_store,
        producer.clone(),
        Duration::from_secs(args.sweep_interval_secs),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    let listener = NotificationListener::connect(store.pool(), producer)
        .await
        .context("connecting notification listener")?;
    let listener_handle = tokio::spawn(async move {
        if let Err(err) = listener.run().await {
            error!(error = %err, "notification listener exited");
        }
    });

    let pool_shutdown = pool.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        let _ = pool_shutdown.send(true);
    });

    info!(concurrency = args.concurrency, "worker pool running");
    pool.run(consumer).await;

    sweeper_handle.abort();
    listener_handle.abort();
    Ok(())
}
