//! Minimal executors used by tests and the CLI's demo command.
//!
//! Grounded on `original_source/agentservice/generic_agents/HelloWorldAgent.py`
//! (a hard-coded `FinalAnswer` used to validate wiring) and
//! `original_source/toolservices/core/executor.py`'s success path (wrap
//! whatever the tool returned in `ToolResult { status: Success, .. }`).

use async_trait::async_trait;
use serde_json::json;

use agentgraph_types::{
    AgentIntent, AgentOutput, AgentResult, ExecutorStatus, FinalAnswer, Task, ToolCallRequest,
    ToolResult,
};

use super::{AgentExecutor, ExecutorCallError, ToolExecutor};

/// Always succeeds with a fixed final answer, ignoring the task's input.
pub struct HelloWorldAgentExecutor;

#[async_trait]
impl AgentExecutor for HelloWorldAgentExecutor {
    async fn execute(&self, _task: &Task) -> Result<AgentResult, ExecutorCallError> {
        Ok(AgentResult {
            status: ExecutorStatus::Success,
            output: AgentOutput {
                thought: "This is a simple Hello World agent for testing connectivity.".into(),
                intent: AgentIntent::FinalAnswer(FinalAnswer {
                    content: json!("Hello World!"),
                }),
            },
            failure_details: None,
            metadata: None,
        })
    }
}

/// Echoes its arguments back as a successful tool output.
pub struct EchoToolExecutor;

#[async_trait]
impl ToolExecutor for EchoToolExecutor {
    async fn execute(&self, request: &ToolCallRequest) -> Result<ToolResult, ExecutorCallError> {
        Ok(ToolResult {
            status: ExecutorStatus::Success,
            output: Some(request.arguments.clone()),
            error_type: None,
            error_message: None,
            post_execution_plan: None,
        })
    }
}
