//! Executor interfaces: the boundary the engine dispatches through.
//!
//! The agent runtime, tool runtime, LLM gateway and prompt fusion are
//! external collaborators, out of scope here -- only the trait boundary
//! lives in this crate, plus a registry resolving `assignee_id`/`tool_id` to
//! a concrete implementation and a pair of fixture executors used by tests
//! and the CLI's demo command.

mod fixtures;
mod registry;

pub use fixtures::{EchoToolExecutor, HelloWorldAgentExecutor};
pub use registry::ExecutorRegistry;

use async_trait::async_trait;
use agentgraph_types::{AgentResult, Task, ToolCallRequest, ToolResult};

/// A transient failure reaching the executor itself (timeout, transport
/// error, gateway unavailable) -- distinct from an executor returning a
/// semantic `FAILURE` status, which is terminal for the task. Only this
/// variant is retried and counted by the circuit breaker.
#[derive(Debug, thiserror::Error)]
#[error("executor call failed: {0}")]
pub struct ExecutorCallError(pub String);

/// Invoked when a `PENDING` task's `assignee_id` starts with `Agent:`.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> Result<AgentResult, ExecutorCallError>;
}

/// Invoked when an agent turn's intent is a `ToolCallRequest`, or directly
/// for a task whose `assignee_id` starts with `Tool:`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, request: &ToolCallRequest) -> Result<ToolResult, ExecutorCallError>;
}

/// No executor is registered for the assignee/tool id the engine tried to
/// dispatch to.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("no agent executor registered for assignee: {0}")]
    AgentNotFound(String),

    #[error("no tool executor registered for tool id: {0}")]
    ToolNotFound(String),
}
