//! `TaskStore`: the persistence contract every backend implements.

use async_trait::async_trait;
use agentgraph_types::{
    Condition, DataFlow, Edge, InterventionRequest, PlanBlueprint, Task, TaskHistoryRecord,
    TaskStatus,
};
use serde_json::Value;
use uuid::Uuid;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Task not found.
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    /// An edge or task update referenced a task id (real or placeholder) that
    /// could not be resolved within the blueprint or the existing graph.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A history rollback referenced a version number that does not exist.
    #[error("task history version not found: task={task_id} version={version}")]
    HistoryVersionNotFound { task_id: Uuid, version: i32 },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Store for tasks, edges, and task history.
///
/// Implementations must be thread-safe and support concurrent access. The
/// `claim_task` operation is the exclusivity boundary: at most one worker may
/// hold a claim on a given task at any instant.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Create a standalone task outside of blueprint materialization (used by
    /// external submitters and by tests).
    async fn create_task(
        &self,
        workflow_id: Uuid,
        assignee_id: &str,
        input_data: Option<Value>,
        parent_task_id: Option<Uuid>,
        directives: Option<agentgraph_types::TaskDirectives>,
    ) -> Result<Uuid, StoreError>;

    /// Fetch a task by id without claiming it.
    async fn get_task_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// List every task currently `PENDING`. Used at bootstrap and by the
    /// reconciliation sweep to catch notifications missed during a listener
    /// connection gap.
    async fn list_pending_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Set `status` and (optionally) replace `result` in one write.
    async fn update_task_status_and_result(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<bool, StoreError>;

    /// Rewrite `result` without changing `status` -- the tool-call re-entry
    /// path. `result` is scratch space here, not a status proxy.
    async fn update_task_context(&self, task_id: Uuid, context: Value) -> Result<bool, StoreError>;

    /// Rewrite `input_data` and `status` together -- the successor
    /// activation path.
    async fn update_task_input_and_status(
        &self,
        task_id: Uuid,
        input_data: Value,
        status: TaskStatus,
    ) -> Result<bool, StoreError>;

    /// Pessimistically claim a task for dispatch.
    ///
    /// Returns `Ok(None)` (not an error) if the row is currently locked by
    /// another worker or no longer exists -- both are routine, expected
    /// outcomes of the at-least-once notification contract.
    async fn claim_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Fetch all edges whose `source_task_id` is `task_id`.
    async fn get_outgoing_edges(&self, task_id: Uuid) -> Result<Vec<Edge>, StoreError>;

    /// Create a single edge directly (outside of blueprint materialization).
    async fn create_edge(
        &self,
        workflow_id: Uuid,
        source_task_id: Uuid,
        target_task_id: Uuid,
        condition: Option<Condition>,
        data_flow: Option<DataFlow>,
    ) -> Result<Uuid, StoreError>;

    /// Fetch every edge belonging to a workflow.
    async fn get_edges_by_workflow_id(&self, workflow_id: Uuid) -> Result<Vec<Edge>, StoreError>;

    /// Atomically materialize a blueprint: insert `new_tasks`, remap
    /// placeholders into `new_edges`, and apply `update_tasks`. Returns the
    /// workflow id the blueprint was materialized under (generated if the
    /// blueprint did not name one).
    ///
    /// Any failure rolls back the entire operation; no partial blueprint is
    /// ever observable.
    async fn create_workflow_from_blueprint(
        &self,
        blueprint: PlanBlueprint,
    ) -> Result<Uuid, StoreError>;

    /// Append a new, strictly-incrementing history snapshot for a task.
    async fn append_history(
        &self,
        task_id: Uuid,
        version_number: i32,
        snapshot: Value,
    ) -> Result<(), StoreError>;

    /// List all history records for a task, ordered by `version_number`.
    async fn list_history(&self, task_id: Uuid) -> Result<Vec<TaskHistoryRecord>, StoreError>;

    /// Fetch the most recent history record for a task, if any.
    async fn latest_history(&self, task_id: Uuid) -> Result<Option<TaskHistoryRecord>, StoreError>;

    /// Apply an operator-issued human intervention: `PAUSE`, `RESUME`, or
    /// `ROLLBACK_AND_MODIFY` (see DESIGN.md).
    async fn apply_intervention(&self, request: InterventionRequest) -> Result<(), StoreError>;
}
