//! Agent intents: the semantic category of an agent's successful output.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blueprint::PlanBlueprint;

/// The agent is done; `content` is the answer surfaced to the task's
/// `result`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalAnswer {
    pub content: serde_json::Value,
}

/// The agent wants a tool invoked before it continues; the engine dispatches
/// to the tool executor and re-enters the task with the tool's output
/// available via `result.last_tool_result`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolCallRequest {
    pub tool_id: String,
    pub arguments: serde_json::Value,
}

/// An agent's successful output is exactly one of these three shapes.
///
/// Recast from the source's runtime type check on an untagged union into a
/// tagged variant with an interpreter function per arm.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentIntent {
    FinalAnswer(FinalAnswer),
    ToolCallRequest(ToolCallRequest),
    PlanBlueprint(PlanBlueprint),
}

/// Structured reason code for a failed agent turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    LlmRefusal,
    ToolExecutionFailed,
    ValidationError,
    ResourceUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailureDetails {
    #[serde(rename = "type")]
    pub kind: FailureType,
    pub message: String,
}

/// The envelope an agent executor returns. `thought` is the agent's rationale
/// for `intent`, carried through even on success so it can be logged or
/// shown to an operator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentOutput {
    pub thought: String,
    pub intent: AgentIntent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutorStatus {
    Success,
    Failure,
}

/// The full result of one agent turn, as returned by the agent executor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentResult {
    pub status: ExecutorStatus,
    pub output: AgentOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<FailureDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
