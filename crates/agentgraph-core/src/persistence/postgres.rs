//! PostgreSQL implementation of [`TaskStore`].
//!
//! Production persistence: row-locked claiming via `SKIP LOCKED`, JSONB
//! columns for the semi-structured `input_data`/`result`/`directives`/
//! `condition`/`data_flow` fields, and a single transaction per blueprint
//! materialization so a failure never leaves a partial blueprint visible.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use agentgraph_types::{
    Condition, DataFlow, Edge, InterventionRequest, InterventionType, PlanBlueprint, Task,
    TaskDirectives, TaskHistoryRecord, TaskStatus,
};

use super::store::{StoreError, TaskStore};

/// PostgreSQL-backed store.
///
/// Holds a connection pool; cheap to clone, safe to share across workers.
#[derive(Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migration. Idempotent; safe to call on
    /// every startup.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, StoreError> {
    let status_str: String = row.try_get("status").map_err(db_err)?;
    Ok(Task {
        id: row.try_get("id").map_err(db_err)?,
        workflow_id: row.try_get("workflow_id").map_err(db_err)?,
        parent_task_id: row.try_get("parent_task_id").map_err(db_err)?,
        assignee_id: row.try_get("assignee_id").map_err(db_err)?,
        status: status_str.parse().map_err(StoreError::Database)?,
        input_data: row
            .try_get::<Option<Value>, _>("input_data")
            .map_err(db_err)?
            .unwrap_or_else(|| Value::Object(Default::default())),
        result: row.try_get("result").map_err(db_err)?,
        directives: row
            .try_get::<Option<Value>, _>("directives")
            .map_err(db_err)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| StoreError::Serialization(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn row_to_edge(row: &sqlx::postgres::PgRow) -> Result<Edge, StoreError> {
    Ok(Edge {
        id: row.try_get("id").map_err(db_err)?,
        workflow_id: row.try_get("workflow_id").map_err(db_err)?,
        source_task_id: row.try_get("source_task_id").map_err(db_err)?,
        target_task_id: row.try_get("target_task_id").map_err(db_err)?,
        condition: row
            .try_get::<Option<Value>, _>("condition")
            .map_err(db_err)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| StoreError::Serialization(e.to_string()))?,
        data_flow: row
            .try_get::<Option<Value>, _>("data_flow")
            .map_err(db_err)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| StoreError::Serialization(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn row_to_history(row: &sqlx::postgres::PgRow) -> Result<TaskHistoryRecord, StoreError> {
    Ok(TaskHistoryRecord {
        id: row.try_get("id").map_err(db_err)?,
        task_id: row.try_get("task_id").map_err(db_err)?,
        version_number: row.try_get("version_number").map_err(db_err)?,
        data_snapshot: row.try_get("data_snapshot").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

async fn append_history_tx(
    tx: &mut Transaction<'_, Postgres>,
    task_id: Uuid,
    snapshot: &Task,
) -> Result<(), StoreError> {
    let version: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM task_history WHERE task_id = $1",
    )
    .bind(task_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(db_err)?;

    let data = serde_json::to_value(snapshot).map_err(|e| StoreError::Serialization(e.to_string()))?;
    sqlx::query(
        "INSERT INTO task_history (id, task_id, version_number, data_snapshot) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::now_v7())
    .bind(task_id)
    .bind(version)
    .bind(data)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    #[instrument(skip(self, input_data, directives))]
    async fn create_task(
        &self,
        workflow_id: Uuid,
        assignee_id: &str,
        input_data: Option<Value>,
        parent_task_id: Option<Uuid>,
        directives: Option<TaskDirectives>,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        let directives_json = directives
            .map(|d| serde_json::to_value(d))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (id, workflow_id, assignee_id, status, input_data, directives, parent_task_id)
            VALUES ($1, $2, $3, 'PENDING', $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(workflow_id)
        .bind(assignee_id)
        .bind(input_data.unwrap_or_else(|| Value::Object(Default::default())))
        .bind(directives_json)
        .bind(parent_task_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("failed to create task: {e}");
            db_err(e)
        })?;
        let task = row_to_task(&row)?;
        append_history_tx(&mut tx, id, &task).await?;
        tx.commit().await.map_err(db_err)?;

        debug!(%id, %workflow_id, assignee_id, "created task");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_task_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_task).transpose()
    }

    #[instrument(skip(self))]
    async fn list_pending_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE status = 'PENDING' ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_task).collect()
    }

    #[instrument(skip(self, result))]
    async fn update_task_status_and_result(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        result: Option<Value>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2,
                result = COALESCE($3, result),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(status.to_string())
        .bind(result)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(false);
        };
        let task = row_to_task(&row)?;
        append_history_tx(&mut tx, task_id, &task).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    #[instrument(skip(self, context))]
    async fn update_task_context(&self, task_id: Uuid, context: Value) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET result = CASE
                    WHEN jsonb_typeof(result) = 'object' AND jsonb_typeof($2::jsonb) = 'object'
                        THEN result || $2::jsonb
                    ELSE $2::jsonb
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(&context)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(false);
        };
        let task = row_to_task(&row)?;
        append_history_tx(&mut tx, task_id, &task).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    #[instrument(skip(self, input_data))]
    async fn update_task_input_and_status(
        &self,
        task_id: Uuid,
        input_data: Value,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(
            r#"
            UPDATE tasks
            SET input_data = $2, status = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(input_data)
        .bind(status.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(false);
        };
        let task = row_to_task(&row)?;
        append_history_tx(&mut tx, task_id, &task).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    /// The `PENDING -> RUNNING` compare-and-swap is the exclusivity
    /// mechanism: `SKIP LOCKED` means a concurrent claimant never blocks
    /// on this row, it just sees zero rows affected. Terminal
    /// rows (`COMPLETED`/`FAILED`) are returned read-only for successor
    /// activation, which is idempotent per edge and does not need the CAS.
    #[instrument(skip(self))]
    async fn claim_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let claimed = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'RUNNING', updated_at = now()
            WHERE id = (
                SELECT id FROM tasks WHERE id = $1 AND status = 'PENDING'
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = claimed {
            let task = row_to_task(&row)?;
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            append_history_tx(&mut tx, task_id, &task).await?;
            tx.commit().await.map_err(db_err)?;
            return Ok(Some(task));
        }

        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let task = row_to_task(&row)?;
        match task.status {
            TaskStatus::Running | TaskStatus::Pending => Ok(None),
            TaskStatus::Completed | TaskStatus::Failed => Ok(Some(task)),
        }
    }

    #[instrument(skip(self))]
    async fn get_outgoing_edges(&self, task_id: Uuid) -> Result<Vec<Edge>, StoreError> {
        let rows = sqlx::query("SELECT * FROM edges WHERE source_task_id = $1")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_edge).collect()
    }

    #[instrument(skip(self, condition, data_flow))]
    async fn create_edge(
        &self,
        workflow_id: Uuid,
        source_task_id: Uuid,
        target_task_id: Uuid,
        condition: Option<Condition>,
        data_flow: Option<DataFlow>,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        let condition_json = condition
            .map(|c| serde_json::to_value(c))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let data_flow_json = data_flow
            .map(|d| serde_json::to_value(d))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO edges (id, workflow_id, source_task_id, target_task_id, condition, data_flow)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(workflow_id)
        .bind(source_task_id)
        .bind(target_task_id)
        .bind(condition_json)
        .bind(data_flow_json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_edges_by_workflow_id(&self, workflow_id: Uuid) -> Result<Vec<Edge>, StoreError> {
        let rows = sqlx::query("SELECT * FROM edges WHERE workflow_id = $1")
            .bind(workflow_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_edge).collect()
    }

    #[instrument(skip(self, blueprint))]
    async fn create_workflow_from_blueprint(
        &self,
        blueprint: PlanBlueprint,
    ) -> Result<Uuid, StoreError> {
        let workflow_id = blueprint.workflow_id.unwrap_or_else(Uuid::now_v7);
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut placeholders: HashMap<String, Uuid> = HashMap::new();

        for def in &blueprint.new_tasks {
            let parent_task_id = match &def.parent_task_id {
                Some(reference) => Some(resolve_reference_tx(&mut tx, &placeholders, reference).await?),
                None => None,
            };
            let id = Uuid::now_v7();
            let directives_json = def
                .directives
                .clone()
                .map(|d| serde_json::to_value(d))
                .transpose()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let row = sqlx::query(
                r#"
                INSERT INTO tasks (id, workflow_id, assignee_id, status, input_data, directives, parent_task_id)
                VALUES ($1, $2, $3, 'PENDING', $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(workflow_id)
            .bind(&def.assignee_id)
            .bind(&def.input_data)
            .bind(directives_json)
            .bind(parent_task_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            let task = row_to_task(&row)?;
            append_history_tx(&mut tx, id, &task).await?;
            placeholders.insert(def.task_id.clone(), id);
        }

        for def in &blueprint.new_edges {
            let source_task_id = resolve_reference_tx(&mut tx, &placeholders, &def.source_task_id).await?;
            let target_task_id = resolve_reference_tx(&mut tx, &placeholders, &def.target_task_id).await?;
            let condition_json = def
                .condition
                .clone()
                .map(|c| serde_json::to_value(c))
                .transpose()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let data_flow_json = def
                .data_flow
                .clone()
                .map(|d| serde_json::to_value(d))
                .transpose()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO edges (id, workflow_id, source_task_id, target_task_id, condition, data_flow)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(workflow_id)
            .bind(source_task_id)
            .bind(target_task_id)
            .bind(condition_json)
            .bind(data_flow_json)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for update in &blueprint.update_tasks {
            let row = sqlx::query(
                r#"
                UPDATE tasks
                SET input_data = COALESCE($2, input_data),
                    status = COALESCE($3, status),
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(update.task_id)
            .bind(update.new_input_data.clone())
            .bind(update.new_status.map(|s| s.to_string()))
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
            let Some(row) = row else {
                return Err(StoreError::UnresolvedReference(update.task_id.to_string()));
            };
            let task = row_to_task(&row)?;
            append_history_tx(&mut tx, update.task_id, &task).await?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(%workflow_id, tasks = blueprint.new_tasks.len(), edges = blueprint.new_edges.len(), "materialized blueprint");
        Ok(workflow_id)
    }

    #[instrument(skip(self, snapshot))]
    async fn append_history(
        &self,
        task_id: Uuid,
        version_number: i32,
        snapshot: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO task_history (id, task_id, version_number, data_snapshot) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::now_v7())
        .bind(task_id)
        .bind(version_number)
        .bind(snapshot)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_history(&self, task_id: Uuid) -> Result<Vec<TaskHistoryRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM task_history WHERE task_id = $1 ORDER BY version_number",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_history).collect()
    }

    #[instrument(skip(self))]
    async fn latest_history(&self, task_id: Uuid) -> Result<Option<TaskHistoryRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM task_history WHERE task_id = $1 ORDER BY version_number DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_history).transpose()
    }

    #[instrument(skip(self, request))]
    async fn apply_intervention(&self, request: InterventionRequest) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let task: Task = {
            let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
                .bind(request.target_task_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .ok_or(StoreError::TaskNotFound(request.target_task_id))?;
            row_to_task(&row)?
        };

        match request.intervention_type {
            InterventionType::Pause => {
                let mut result = task.result.unwrap_or_else(|| Value::Object(Default::default()));
                if let Value::Object(map) = &mut result {
                    map.insert("paused".into(), Value::Bool(true));
                    map.insert("comment".into(), Value::String(request.comment.clone()));
                }
                sqlx::query(
                    "UPDATE tasks SET status = 'FAILED', result = $2, updated_at = now() WHERE id = $1",
                )
                .bind(request.target_task_id)
                .bind(result)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
            InterventionType::Resume => {
                sqlx::query("UPDATE tasks SET status = 'PENDING', updated_at = now() WHERE id = $1")
                    .bind(request.target_task_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
            }
            InterventionType::RollbackAndModify => {
                let version = request.rollback_to_version.ok_or_else(|| {
                    StoreError::UnresolvedReference(
                        "ROLLBACK_AND_MODIFY requires rollback_to_version".to_string(),
                    )
                })?;
                let snapshot_row = sqlx::query(
                    "SELECT data_snapshot FROM task_history WHERE task_id = $1 AND version_number = $2",
                )
                .bind(request.target_task_id)
                .bind(version)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .ok_or(StoreError::HistoryVersionNotFound {
                    task_id: request.target_task_id,
                    version,
                })?;
                let snapshot: Value = snapshot_row.try_get("data_snapshot").map_err(db_err)?;
                let restored: Task = serde_json::from_value(snapshot)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;

                let input_data = request.new_input_data.clone().unwrap_or(restored.input_data);
                let assignee_id = request.new_assignee_id.clone().unwrap_or(restored.assignee_id);

                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET input_data = $2, result = $3, assignee_id = $4, status = 'PENDING', updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(request.target_task_id)
                .bind(input_data)
                .bind(restored.result)
                .bind(assignee_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(request.target_task_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let task = row_to_task(&row)?;
        append_history_tx(&mut tx, request.target_task_id, &task).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

async fn resolve_reference_tx(
    tx: &mut Transaction<'_, Postgres>,
    placeholders: &HashMap<String, Uuid>,
    reference: &str,
) -> Result<Uuid, StoreError> {
    if let Some(id) = placeholders.get(reference) {
        return Ok(*id);
    }
    if let Ok(id) = reference.parse::<Uuid>() {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
        if exists.is_some() {
            return Ok(id);
        }
    }
    Err(StoreError::UnresolvedReference(reference.to_string()))
}
