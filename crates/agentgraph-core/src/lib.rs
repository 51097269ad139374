//! # Durable Workflow Orchestrator for Agent Graphs
//!
//! A PostgreSQL-backed execution engine for DAGs of LLM agent/tool tasks.
//!
//! ## Features
//!
//! - **Durable task graph**: tasks, edges, and versioned task history persist
//!   in Postgres; workers never hold authoritative state in memory.
//! - **Predicate-gated edges**: a safe CEL-subset expression language decides
//!   which successors activate.
//! - **Data-flow remapping**: dotted-path projections carry a source task's
//!   result into a successor's input.
//! - **Automatic retries**: exponential backoff with jitter, layered with a
//!   per-assignee circuit breaker.
//! - **Change-notification pipeline**: `LISTEN`/`NOTIFY` feeds a bounded work
//!   queue, backstopped by a periodic reconciliation sweep.
//! - **Structured tracing**: `tracing` spans on every claim/dispatch/materialize
//!   entry point.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      NotificationListener                    │
//! │        (LISTEN task_created/task_updated -> work queue)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         WorkerPool                            │
//! │       (claims tasks, dispatches through GraphEngine)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         GraphEngine                           │
//! │  (state machine, predicate eval, data-flow mapping,          │
//! │   blueprint materialization, reliability wrapping)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TaskStore                             │
//! │   (Postgres: tasks, edges, task_history; or in-memory)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use agentgraph_core::prelude::*;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
//! let executors = ExecutorRegistry::new()
//!     .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor));
//! let engine = GraphEngine::new(store.clone(), executors);
//!
//! let (producer, consumer) = work_queue(1024);
//! let pool = WorkerPool::new(engine, WorkerPoolConfig::new(20))?;
//! pool.run(consumer).await;
//! ```

pub mod bench;
pub mod engine;
pub mod eval;
pub mod executor;
pub mod notify;
pub mod persistence;
pub mod reliability;
pub mod worker;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::engine::{EngineError, GraphEngine};
    pub use crate::eval::{DataFlowMapper, PredicateEvaluator};
    pub use crate::executor::{
        AgentExecutor, EchoToolExecutor, ExecutorCallError, ExecutorError, ExecutorRegistry,
        HelloWorldAgentExecutor, ToolExecutor,
    };
    pub use crate::notify::{work_queue, NotificationListener, ReconciliationSweeper, WorkQueueConsumer, WorkQueueProducer};
    pub use crate::persistence::{InMemoryTaskStore, PostgresTaskStore, StoreError, TaskStore};
    pub use crate::reliability::{CircuitBreakerConfig, CircuitBreakerRegistry, RetryPolicy};
    pub use crate::worker::{BackpressureConfig, BackpressureError, BackpressureState, WorkerPool, WorkerPoolConfig, WorkerPoolError};
}

// Re-export key types at crate root.
pub use engine::{EngineError, GraphEngine};
pub use eval::{DataFlowMapper, PredicateEvaluator};
pub use executor::{
    EchoToolExecutor, ExecutorCallError, ExecutorError, ExecutorRegistry, HelloWorldAgentExecutor,
};
pub use notify::{work_queue, NotificationListener, ReconciliationSweeper, WorkQueueConsumer, WorkQueueProducer};
pub use persistence::{InMemoryTaskStore, PostgresTaskStore, StoreError, TaskStore};
pub use reliability::{CircuitBreakerConfig, CircuitBreakerRegistry, RetryPolicy};
pub use worker::{BackpressureConfig, BackpressureError, BackpressureState, WorkerPool, WorkerPoolConfig, WorkerPoolError};
