//! Edges: directed, optionally conditional links between tasks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An edge's boolean guard, evaluated against the source task's result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Condition {
    /// Dialect identifier. `"CEL"` is the only dialect required by this
    /// implementation; unrecognized dialects evaluate to `false`.
    pub evaluator: String,
    pub expression: String,
}

/// The projection from source-result fields into target-input fields along
/// an edge: `target_key -> source_expression`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataFlow {
    pub mappings: HashMap<String, String>,
}

/// A directed conditional link from one task to another in the same
/// workflow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Edge {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub source_task_id: Uuid,
    pub target_task_id: Uuid,
    pub condition: Option<Condition>,
    pub data_flow: Option<DataFlow>,
    pub created_at: DateTime<Utc>,
}
