//! Tool results: the envelope a tool executor returns for a `ToolCallRequest`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blueprint::PlanBlueprint;
use crate::intent::ExecutorStatus;

/// The result of one tool invocation.
///
/// `post_execution_plan` is a supplemental field: a tool may itself return a
/// follow-up sub-plan, which the engine materializes before re-entering the
/// calling task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolResult {
    pub status: ExecutorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_execution_plan: Option<PlanBlueprint>,
}
