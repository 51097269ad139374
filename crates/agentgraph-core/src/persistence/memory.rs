//! An in-memory [`TaskStore`] implementation: the substrate for unit and
//! integration tests, and for running the engine without a database in
//! demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use agentgraph_types::{
    Condition, DataFlow, Edge, InterventionRequest, InterventionType, PlanBlueprint, Task,
    TaskHistoryRecord, TaskStatus,
};

use super::store::{StoreError, TaskStore};

#[derive(Default, Clone)]
struct Inner {
    tasks: HashMap<Uuid, Task>,
    edges: HashMap<Uuid, Edge>,
    history: HashMap<Uuid, Vec<TaskHistoryRecord>>,
}

impl Inner {
    fn snapshot_history(&mut self, task_id: Uuid) -> Result<(), StoreError> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let snapshot = serde_json::to_value(task).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let versions = self.history.entry(task_id).or_default();
        let next_version = versions.last().map(|v| v.version_number + 1).unwrap_or(1);
        versions.push(TaskHistoryRecord {
            id: Uuid::now_v7(),
            task_id,
            version_number: next_version,
            data_snapshot: snapshot,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Resolves a blueprint-scoped id: first as a placeholder minted earlier
    /// in this same materialization, otherwise as a real id already present
    /// in the store (a reference is left unchanged if it is already a real
    /// id).
    fn resolve_reference(
        &self,
        placeholders: &HashMap<String, Uuid>,
        reference: &str,
    ) -> Result<Uuid, StoreError> {
        if let Some(id) = placeholders.get(reference) {
            return Ok(*id);
        }
        if let Ok(id) = reference.parse::<Uuid>() {
            if self.tasks.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(StoreError::UnresolvedReference(reference.to_string()))
    }
}

/// Thread-safe in-memory store. Every operation takes and releases the lock
/// within a single method call -- there is no cross-call held lock, mirroring
/// how a Postgres backend only holds its row lock for the lifetime of one
/// transaction.
#[derive(Default)]
pub struct InMemoryTaskStore {
    inner: Mutex<Inner>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(
        &self,
        workflow_id: Uuid,
        assignee_id: &str,
        input_data: Option<Value>,
        parent_task_id: Option<Uuid>,
        directives: Option<agentgraph_types::TaskDirectives>,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock();
        let now = Utc::now();
        let id = Uuid::now_v7();
        let task = Task {
            id,
            workflow_id,
            parent_task_id,
            assignee_id: assignee_id.to_string(),
            status: TaskStatus::Pending,
            input_data: input_data.unwrap_or_else(|| Value::Object(Default::default())),
            result: None,
            directives,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(id, task);
        inner.snapshot_history(id)?;
        Ok(id)
    }

    async fn get_task_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().tasks.get(&task_id).cloned())
    }

    async fn list_pending_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .inner
            .lock()
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_task_status_and_result(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(task) = inner.tasks.get_mut(&task_id) else {
            return Ok(false);
        };
        task.status = status;
        if let Some(result) = result {
            task.result = Some(result);
        }
        task.updated_at = Utc::now();
        inner.snapshot_history(task_id)?;
        Ok(true)
    }

    async fn update_task_context(&self, task_id: Uuid, context: Value) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(task) = inner.tasks.get_mut(&task_id) else {
            return Ok(false);
        };
        task.result = Some(merge_context(task.result.take(), context));
        task.updated_at = Utc::now();
        inner.snapshot_history(task_id)?;
        Ok(true)
    }

    async fn update_task_input_and_status(
        &self,
        task_id: Uuid,
        input_data: Value,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(task) = inner.tasks.get_mut(&task_id) else {
            return Ok(false);
        };
        task.input_data = input_data;
        task.status = status;
        task.updated_at = Utc::now();
        inner.snapshot_history(task_id)?;
        Ok(true)
    }

    async fn claim_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut inner = self.inner.lock();
        let Some(task) = inner.tasks.get(&task_id).cloned() else {
            return Ok(None);
        };
        match task.status {
            // The PENDING -> RUNNING compare-and-swap *is* the exclusivity
            // mechanism: only the caller that observes PENDING can ever flip
            // it, so at most one claim of a pending task ever succeeds.
            TaskStatus::Pending => {
                let running = inner.tasks.get_mut(&task_id).expect("checked above");
                running.status = TaskStatus::Running;
                running.updated_at = Utc::now();
                let claimed = running.clone();
                inner.snapshot_history(task_id)?;
                Ok(Some(claimed))
            }
            // Already claimed by (or being dispatched by) another worker.
            TaskStatus::Running => Ok(None),
            // Terminal states are claimed read-only for successor
            // activation; duplicate concurrent claims here are safe because
            // activation is idempotent per edge.
            TaskStatus::Completed | TaskStatus::Failed => Ok(Some(task)),
        }
    }

    async fn get_outgoing_edges(&self, task_id: Uuid) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .inner
            .lock()
            .edges
            .values()
            .filter(|e| e.source_task_id == task_id)
            .cloned()
            .collect())
    }

    async fn create_edge(
        &self,
        workflow_id: Uuid,
        source_task_id: Uuid,
        target_task_id: Uuid,
        condition: Option<Condition>,
        data_flow: Option<DataFlow>,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock();
        let id = Uuid::now_v7();
        inner.edges.insert(
            id,
            Edge {
                id,
                workflow_id,
                source_task_id,
                target_task_id,
                condition,
                data_flow,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_edges_by_workflow_id(&self, workflow_id: Uuid) -> Result<Vec<Edge>, StoreError> {
        Ok(self
            .inner
            .lock()
            .edges
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect())
    }

    async fn create_workflow_from_blueprint(
        &self,
        blueprint: PlanBlueprint,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock();
        // Work against a clone; only commit it back if every step succeeds,
        // so a failure partway through never leaves a partial blueprint
        // visible.
        let mut working = inner.clone();
        let result = materialize(&mut working, blueprint);
        match result {
            Ok(workflow_id) => {
                *inner = working;
                Ok(workflow_id)
            }
            Err(err) => Err(err),
        }
    }

    async fn append_history(
        &self,
        task_id: Uuid,
        version_number: i32,
        snapshot: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.tasks.contains_key(&task_id) {
            return Err(StoreError::TaskNotFound(task_id));
        }
        inner.history.entry(task_id).or_default().push(TaskHistoryRecord {
            id: Uuid::now_v7(),
            task_id,
            version_number,
            data_snapshot: snapshot,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_history(&self, task_id: Uuid) -> Result<Vec<TaskHistoryRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .history
            .get(&task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn latest_history(&self, task_id: Uuid) -> Result<Option<TaskHistoryRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .history
            .get(&task_id)
            .and_then(|versions| versions.last().cloned()))
    }

    async fn apply_intervention(&self, request: InterventionRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.tasks.contains_key(&request.target_task_id) {
            return Err(StoreError::TaskNotFound(request.target_task_id));
        }

        match request.intervention_type {
            InterventionType::Pause => {
                let task = inner.tasks.get_mut(&request.target_task_id).unwrap();
                task.result = Some(merge_context(
                    task.result.take(),
                    serde_json::json!({"paused": true, "comment": request.comment}),
                ));
                task.status = TaskStatus::Failed;
                task.updated_at = Utc::now();
            }
            InterventionType::Resume => {
                let task = inner.tasks.get_mut(&request.target_task_id).unwrap();
                task.status = TaskStatus::Pending;
                task.updated_at = Utc::now();
            }
            InterventionType::RollbackAndModify => {
                let version = request.rollback_to_version.ok_or_else(|| {
                    StoreError::UnresolvedReference(
                        "ROLLBACK_AND_MODIFY requires rollback_to_version".to_string(),
                    )
                })?;
                let snapshot = inner
                    .history
                    .get(&request.target_task_id)
                    .and_then(|versions| versions.iter().find(|v| v.version_number == version))
                    .cloned()
                    .ok_or(StoreError::HistoryVersionNotFound {
                        task_id: request.target_task_id,
                        version,
                    })?;
                let restored: Task = serde_json::from_value(snapshot.data_snapshot)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;

                let task = inner.tasks.get_mut(&request.target_task_id).unwrap();
                task.input_data = restored.input_data;
                task.result = restored.result;
                if let Some(new_input) = request.new_input_data {
                    task.input_data = new_input;
                }
                if let Some(new_assignee) = request.new_assignee_id {
                    task.assignee_id = new_assignee;
                }
                task.status = TaskStatus::Pending;
                task.updated_at = Utc::now();
            }
        }

        inner.snapshot_history(request.target_task_id)?;
        Ok(())
    }
}

/// `update_task_context` merges into an existing object result rather than
/// replacing it outright, so a multi-hop tool chain's earlier context
/// survives a later hop's write.
fn merge_context(existing: Option<Value>, context: Value) -> Value {
    match existing {
        Some(Value::Object(mut map)) => {
            if let Value::Object(new_fields) = context {
                map.extend(new_fields);
                Value::Object(map)
            } else {
                context
            }
        }
        _ => context,
    }
}

fn materialize(inner: &mut Inner, blueprint: PlanBlueprint) -> Result<Uuid, StoreError> {
    let workflow_id = blueprint.workflow_id.unwrap_or_else(Uuid::now_v7);
    let mut placeholders: HashMap<String, Uuid> = HashMap::new();
    let now = Utc::now();

    for def in &blueprint.new_tasks {
        let parent_task_id = match &def.parent_task_id {
            Some(placeholder) => Some(inner.resolve_reference(&placeholders, placeholder)?),
            None => None,
        };
        let id = Uuid::now_v7();
        inner.tasks.insert(
            id,
            Task {
                id,
                workflow_id,
                parent_task_id,
                assignee_id: def.assignee_id.clone(),
                status: TaskStatus::Pending,
                input_data: def.input_data.clone(),
                result: None,
                directives: def.directives.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        placeholders.insert(def.task_id.clone(), id);
        inner.snapshot_history(id)?;
    }

    for def in &blueprint.new_edges {
        let source_task_id = inner.resolve_reference(&placeholders, &def.source_task_id)?;
        let target_task_id = inner.resolve_reference(&placeholders, &def.target_task_id)?;
        let id = Uuid::now_v7();
        inner.edges.insert(
            id,
            Edge {
                id,
                workflow_id,
                source_task_id,
                target_task_id,
                condition: def.condition.clone(),
                data_flow: def.data_flow.clone(),
                created_at: now,
            },
        );
    }

    for update in &blueprint.update_tasks {
        let task = inner
            .tasks
            .get_mut(&update.task_id)
            .ok_or(StoreError::UnresolvedReference(update.task_id.to_string()))?;
        if let Some(input) = update.new_input_data.clone() {
            task.input_data = input;
        }
        if let Some(status) = update.new_status {
            task.status = status;
        }
        task.updated_at = now;
        inner.snapshot_history(update.task_id)?;
    }

    Ok(workflow_id)
}
