//! Plan blueprints: the batch of new tasks, new edges, and task updates a
//! successful agent turn (or an external submitter) hands to the Blueprint
//! Materializer for atomic expansion.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::directives::TaskDirectives;
use crate::edge::{Condition, DataFlow};
use crate::task::TaskStatus;

/// Priority hint carried by context overrides; interpreted by the context
/// builder this crate does not implement -- stored faithfully.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Normal,
    Highest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContextOverrides {
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_assets: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_task_results: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_hoc_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_context_config: Option<serde_json::Value>,
}

/// A task within a blueprint, identified by a placeholder id scoped to that
/// blueprint. The materializer substitutes a real, DB-assigned UUID for
/// `task_id` before any row is visible to readers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskDefinition {
    /// Placeholder id chosen by the blueprint's author; never the real
    /// primary key once materialized.
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    pub input_data: serde_json::Value,
    pub assignee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_overrides: Option<ContextOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directives: Option<TaskDirectives>,
}

/// An edge within a blueprint, referencing tasks by placeholder -- or by a
/// real id, if it points at a task that already exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EdgeDefinition {
    pub source_task_id: String,
    pub target_task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_flow: Option<DataFlow>,
}

/// An in-place update to an existing (real-id) task, applied after
/// placeholder remapping.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdate {
    pub task_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_input_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
}

/// A batch of new tasks, new edges, and task updates to be applied
/// atomically by the Blueprint Materializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PlanBlueprint {
    /// `None` means the materializer generates a fresh workflow id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Uuid>,
    #[serde(default)]
    pub new_tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub new_edges: Vec<EdgeDefinition>,
    #[serde(default)]
    pub update_tasks: Vec<TaskUpdate>,
}
