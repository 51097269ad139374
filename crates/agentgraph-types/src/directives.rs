//! Task directives: loop/timeout/on-failure/human-interaction descriptors.
//!
//! Directives are persisted faithfully and logged on dispatch; the engine
//! does not interpret them. They exist here so that blueprints which set
//! them round-trip losslessly.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blueprint::TaskDefinition;

/// Loop iteration strategy for a directive-bearing task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopKind {
    ParallelIteration,
    SerialIteration,
}

/// Describes a loop over `input_source_task_id`'s result, spawning one task
/// per iteration from `task_template`.
///
/// `task_template` is a nominal recursive reference (a definition, not a
/// reference to an existing task) -- there is no runtime cycle, only a
/// heap-allocated sub-tree.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoopDirective {
    #[serde(rename = "type")]
    pub kind: LoopKind,
    pub iteration_input_key: String,
    pub input_source_task_id: String,
    pub task_template: Box<TaskDefinition>,
    pub max_iterations: Option<u32>,
}

/// Directives attached to a task: stored and logged, never interpreted by
/// the core state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskDirectives {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_directive: Option<LoopDirective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_interaction: Option<serde_json::Value>,
}
