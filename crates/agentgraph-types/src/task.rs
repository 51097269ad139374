//! Task rows: the unit of dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::directives::TaskDirectives;

/// Task lifecycle state.
///
/// Transitions are restricted to the state machine in the persistence layer;
/// this type only encodes the four reachable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Claimable; not currently held by any worker.
    Pending,
    /// Claimed by a worker and currently in dispatch.
    Running,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A task row: an agent or tool invocation awaiting, in progress, or having
/// completed dispatch.
///
/// `result` is reused as mutable scratch space for tool-call re-entry:
/// its presence does not imply `status = Completed`. The key
/// `last_tool_result` is written by the tool re-entry path; `content` by the
/// final-answer path; `message` by the blueprint path; `error` /
/// `failure_details` by the failure paths. Consumers must branch on `status`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub assignee_id: String,
    pub status: TaskStatus,
    pub input_data: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub directives: Option<TaskDirectives>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// `true` if `assignee_id` designates an agent executor.
    pub fn is_agent(&self) -> bool {
        self.assignee_id.starts_with("Agent:")
    }

    /// `true` if `assignee_id` designates a direct tool executor.
    pub fn is_tool(&self) -> bool {
        self.assignee_id.starts_with("Tool:")
    }
}

/// An append-only versioned snapshot of a task's input/result, used by
/// rollback and time-travel interventions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskHistoryRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    /// Strictly increasing per task, starting at 1, gapless.
    pub version_number: i32,
    pub data_snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
