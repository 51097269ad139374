//! Human intervention requests: an operator may pause a task, resume it, or
//! roll it back to a prior `TaskHistoryRecord` version while optionally
//! overwriting its input or assignee.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionType {
    RollbackAndModify,
    Pause,
    Resume,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterventionRequest {
    pub intervention_type: InterventionType,
    pub target_task_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_to_version: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_input_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_assignee_id: Option<String>,
    pub comment: String,
}
