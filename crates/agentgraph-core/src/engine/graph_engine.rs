use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use agentgraph_types::{
    AgentIntent, AgentResult, ExecutorStatus, FailureDetails, FailureType, PlanBlueprint, Task,
    TaskStatus, ToolResult,
};

use crate::eval::{DataFlowMapper, PredicateEvaluator};
use crate::executor::{ExecutorCallError, ExecutorError, ExecutorRegistry};
use crate::notify::WorkQueueConsumer;
use crate::persistence::{StoreError, TaskStore};
use crate::reliability::{CircuitBreakerConfig, CircuitBreakerRegistry, RetryPolicy};

/// Everything that can go wrong driving one dispatch cycle. Never escapes
/// the run loop -- every variant is caught, logged, and (where a task is
/// already claimed) turned into a `FAILED` status write. A single task's
/// failure must never bring down a worker.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("executor call exhausted its retry budget: {0}")]
    ExecutorExhausted(ExecutorCallError),

    #[error("assignee {0}'s circuit breaker is open")]
    CircuitOpen(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Collaborators injected into the engine's constructor rather than held as
/// module-level singletons, so a test can swap in fakes for any one of
/// them.
pub struct GraphEngine {
    store: Arc<dyn TaskStore>,
    executors: ExecutorRegistry,
    predicate: PredicateEvaluator,
    dataflow: DataFlowMapper,
    retry_policy: RetryPolicy,
    circuit_breakers: CircuitBreakerRegistry,
}

impl GraphEngine {
    pub fn new(store: Arc<dyn TaskStore>, executors: ExecutorRegistry) -> Self {
        Self::with_reliability(
            store,
            executors,
            RetryPolicy::default(),
            CircuitBreakerConfig::default(),
        )
    }

    pub fn with_reliability(
        store: Arc<dyn TaskStore>,
        executors: ExecutorRegistry,
        retry_policy: RetryPolicy,
        circuit_breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            store,
            executors,
            predicate: PredicateEvaluator::new(),
            dataflow: DataFlowMapper::new(),
            retry_policy,
            circuit_breakers: CircuitBreakerRegistry::new(circuit_breaker_config),
        }
    }

    /// Drains `consumer` until it's closed or `shutdown` fires, dispatching
    /// one task per pop. A global interrupt drains the current in-flight
    /// task then exits -- `shutdown` is only observed between pops, never
    /// mid-dispatch.
    #[instrument(skip_all)]
    pub async fn run(&self, mut consumer: WorkQueueConsumer, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            let task_id = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown signal received, draining");
                        break;
                    }
                    continue;
                }
                popped = consumer.pop() => match popped {
                    Some(id) => id,
                    None => {
                        debug!("work queue closed, engine exiting");
                        break;
                    }
                },
            };

            if let Err(err) = self.dispatch_one(task_id).await {
                error!(%task_id, error = %err, "dispatch cycle failed");
            }
        }
    }

    /// One full claim-and-route cycle for a single task id: the main loop
    /// body, minus the queue pop.
    #[instrument(skip(self))]
    pub async fn dispatch_one(&self, task_id: Uuid) -> Result<(), EngineError> {
        let Some(task) = self.store.claim_task(task_id).await? else {
            debug!(%task_id, "claim returned no task -- already owned or gone");
            return Ok(());
        };

        match task.status {
            TaskStatus::Pending => self.process_pending(task).await,
            TaskStatus::Completed => self.activate_successors(&task).await,
            TaskStatus::Running => {
                debug!(%task_id, "stale notification for a task already in dispatch, skipping");
                Ok(())
            }
            TaskStatus::Failed => self.activate_successors(&task).await,
        }
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, assignee = %task.assignee_id))]
    async fn process_pending(&self, task: Task) -> Result<(), EngineError> {
        if task.is_agent() {
            return self.process_agent_task(task).await;
        }
        if task.is_tool() {
            return self.process_tool_task(task).await;
        }
        warn!(assignee = %task.assignee_id, "assignee is neither Agent: nor Tool:, failing task");
        self.fail(
            task.id,
            json!({"error": format!("unroutable assignee_id: {}", task.assignee_id)}),
        )
        .await
    }

    async fn process_agent_task(&self, task: Task) -> Result<(), EngineError> {
        let result = match self.call_agent(&task).await {
            Ok(result) => result,
            Err(EngineError::ExecutorExhausted(err)) => {
                warn!(task_id = %task.id, error = %err, "agent executor exhausted retries");
                return self
                    .fail(task.id, json!({"error": err.0}))
                    .await;
            }
            Err(other) => return Err(other),
        };

        match result.status {
            ExecutorStatus::Success => self.apply_agent_success(&task, result).await,
            ExecutorStatus::Failure => {
                let failure = result.failure_details.unwrap_or(FailureDetails {
                    kind: FailureType::ValidationError,
                    message: "agent reported failure with no details".into(),
                });
                self.fail(
                    task.id,
                    json!({"failure_details": failure, "thought": result.output.thought}),
                )
                .await
            }
        }
    }

    async fn apply_agent_success(&self, task: &Task, result: AgentResult) -> Result<(), EngineError> {
        match result.output.intent {
            AgentIntent::FinalAnswer(final_answer) => {
                self.store
                    .update_task_status_and_result(
                        task.id,
                        TaskStatus::Completed,
                        Some(json!({"content": final_answer.content})),
                    )
                    .await?;
                Ok(())
            }
            AgentIntent::ToolCallRequest(tool_call) => {
                let tool_result = match self.call_tool(&tool_call.tool_id, &tool_call).await {
                    Ok(result) => result,
                    Err(EngineError::ExecutorExhausted(err)) => {
                        warn!(task_id = %task.id, error = %err, "tool executor exhausted retries");
                        return self.fail(task.id, json!({"error": err.0})).await;
                    }
                    Err(other) => return Err(other),
                };

                if let Some(plan) = tool_result.post_execution_plan.clone() {
                    self.materialize(plan, Some(task.workflow_id)).await?;
                }

                // Two writes, matching the persistence contract precisely:
                // first the scratch context (status untouched), then the
                // status flip back to PENDING that makes the task claimable
                // again and retriggers notification.
                self.store
                    .update_task_context(task.id, json!({"last_tool_result": tool_result}))
                    .await?;
                self.store
                    .update_task_status_and_result(task.id, TaskStatus::Pending, None)
                    .await?;
                Ok(())
            }
            AgentIntent::PlanBlueprint(blueprint) => {
                self.materialize(blueprint, Some(task.workflow_id)).await?;
                self.store
                    .update_task_status_and_result(
                        task.id,
                        TaskStatus::Completed,
                        Some(json!({"message": "Plan executed successfully"})),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn process_tool_task(&self, task: Task) -> Result<(), EngineError> {
        let tool_call = agentgraph_types::ToolCallRequest {
            tool_id: task.assignee_id.clone(),
            arguments: task.input_data.clone(),
        };
        let result = match self.call_tool(&task.assignee_id, &tool_call).await {
            Ok(result) => result,
            Err(EngineError::ExecutorExhausted(err)) => {
                return self.fail(task.id, json!({"error": err.0})).await;
            }
            Err(other) => return Err(other),
        };

        match result.status {
            ExecutorStatus::Success => {
                self.store
                    .update_task_status_and_result(
                        task.id,
                        TaskStatus::Completed,
                        Some(json!({"output": result.output})),
                    )
                    .await?;
            }
            ExecutorStatus::Failure => {
                self.store
                    .update_task_status_and_result(
                        task.id,
                        TaskStatus::Failed,
                        Some(json!({
                            "error_type": result.error_type,
                            "error_message": result.error_message,
                        })),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Evaluates every outgoing edge of a just-settled task and activates
    /// each successor whose predicate holds.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn activate_successors(&self, task: &Task) -> Result<(), EngineError> {
        let result = task.result.clone().unwrap_or_else(|| json!({}));
        let edges = self.store.get_outgoing_edges(task.id).await?;

        for edge in edges {
            let holds = self.predicate.evaluate(edge.condition.as_ref(), &result);
            if !holds {
                debug!(edge_id = %edge.id, target = %edge.target_task_id, "predicate false, edge skipped");
                continue;
            }

            let mapped = self.dataflow.apply(edge.data_flow.as_ref(), &result);
            self.store
                .update_task_input_and_status(
                    edge.target_task_id,
                    Value::Object(mapped),
                    TaskStatus::Pending,
                )
                .await?;
            debug!(edge_id = %edge.id, target = %edge.target_task_id, "edge activated successor");
        }

        Ok(())
    }

    async fn materialize(&self, mut blueprint: PlanBlueprint, inherit_workflow_id: Option<Uuid>) -> Result<Uuid, EngineError> {
        if blueprint.workflow_id.is_none() {
            blueprint.workflow_id = inherit_workflow_id;
        }
        let workflow_id = self.store.create_workflow_from_blueprint(blueprint).await?;
        Ok(workflow_id)
    }

    async fn fail(&self, task_id: Uuid, result: Value) -> Result<(), EngineError> {
        self.store
            .update_task_status_and_result(task_id, TaskStatus::Failed, Some(result))
            .await?;
        Ok(())
    }

    /// Wraps an agent executor invocation in the retry policy and the
    /// assignee's circuit breaker.
    async fn call_agent(&self, task: &Task) -> Result<AgentResult, EngineError> {
        let executor = self.executors.agent_for(&task.assignee_id)?;
        self.call_with_reliability(&task.assignee_id, || {
            let executor = Arc::clone(&executor);
            let task = task.clone();
            async move { executor.execute(&task).await }
        })
        .await
    }

    async fn call_tool(
        &self,
        assignee_id: &str,
        request: &agentgraph_types::ToolCallRequest,
    ) -> Result<ToolResult, EngineError> {
        let executor = self.executors.tool_for(assignee_id)?;
        self.call_with_reliability(assignee_id, || {
            let executor = Arc::clone(&executor);
            let request = request.clone();
            async move { executor.execute(&request).await }
        })
        .await
    }

    async fn call_with_reliability<T, F, Fut>(
        &self,
        assignee_id: &str,
        mut call: F,
    ) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ExecutorCallError>>,
    {
        let breaker = self.circuit_breakers.for_assignee(assignee_id);
        let mut attempt = 1;

        loop {
            if !breaker.allow_call() {
                return Err(EngineError::CircuitOpen(assignee_id.to_string()));
            }

            match call().await {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    breaker.record_failure();
                    if !self.retry_policy.should_retry(None)
                        || !self.retry_policy.has_attempts_remaining(attempt)
                    {
                        return Err(EngineError::ExecutorExhausted(err));
                    }
                    let delay = self.retry_policy.delay_for_attempt(attempt + 1);
                    if delay > Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{EchoToolExecutor, HelloWorldAgentExecutor};
    use crate::persistence::InMemoryTaskStore;
    use agentgraph_types::{Condition, DataFlow};
    use std::collections::HashMap;

    fn engine(store: Arc<dyn TaskStore>) -> GraphEngine {
        let executors = ExecutorRegistry::new()
            .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor))
            .with_tool("Echo", Arc::new(EchoToolExecutor));
        GraphEngine::new(store, executors)
    }

    #[tokio::test]
    async fn final_answer_completes_task() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let workflow_id = Uuid::now_v7();
        let task_id = store
            .create_task(workflow_id, "Agent:HelloWorld", None, None, None)
            .await
            .unwrap();

        let engine = engine(store.clone());
        engine.dispatch_one(task_id).await.unwrap();

        let task = store.get_task_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(
            task.result.unwrap()["content"],
            json!("Hello World!")
        );
    }

    #[tokio::test]
    async fn conditional_edge_fires_when_predicate_holds() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let workflow_id = Uuid::now_v7();
        let source = store
            .create_task(workflow_id, "Agent:HelloWorld", None, None, None)
            .await
            .unwrap();
        let target = store
            .create_task(workflow_id, "Agent:HelloWorld", Some(json!({})), None, None)
            .await
            .unwrap();

        let mut mappings = HashMap::new();
        mappings.insert("greeting".to_string(), "content".to_string());
        store
            .create_edge(
                workflow_id,
                source,
                target,
                Some(Condition {
                    evaluator: "CEL".to_string(),
                    expression: "result.content == 'Hello World!'".to_string(),
                }),
                Some(DataFlow { mappings }),
            )
            .await
            .unwrap();

        let engine = engine(store.clone());
        engine.dispatch_one(source).await.unwrap();
        // The completion write re-enters the queue in a real deployment;
        // here we drive the second cycle directly.
        engine.dispatch_one(source).await.unwrap();

        let target_task = store.get_task_by_id(target).await.unwrap().unwrap();
        assert_eq!(target_task.status, TaskStatus::Pending);
        assert_eq!(target_task.input_data["greeting"], json!("Hello World!"));
    }

    #[tokio::test]
    async fn conditional_edge_blocks_when_predicate_fails() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let workflow_id = Uuid::now_v7();
        let source = store
            .create_task(workflow_id, "Agent:HelloWorld", None, None, None)
            .await
            .unwrap();
        let target = store
            .create_task(workflow_id, "Agent:HelloWorld", Some(json!({})), None, None)
            .await
            .unwrap();
        store
            .create_edge(
                workflow_id,
                source,
                target,
                Some(Condition {
                    evaluator: "CEL".to_string(),
                    expression: "result.content == 'Something Else'".to_string(),
                }),
                None,
            )
            .await
            .unwrap();

        let engine = engine(store.clone());
        engine.dispatch_one(source).await.unwrap();
        engine.dispatch_one(source).await.unwrap();

        let target_task = store.get_task_by_id(target).await.unwrap().unwrap();
        assert_eq!(target_task.status, TaskStatus::Pending);
        assert_eq!(target_task.input_data, json!({}));
    }

    #[tokio::test]
    async fn unroutable_assignee_fails_fast() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let workflow_id = Uuid::now_v7();
        let task_id = store
            .create_task(workflow_id, "Group:Unsupported", None, None, None)
            .await
            .unwrap();

        let engine = engine(store.clone());
        engine.dispatch_one(task_id).await.unwrap();

        let task = store.get_task_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn claim_on_missing_task_is_a_noop() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let engine = engine(store);
        engine.dispatch_one(Uuid::now_v7()).await.unwrap();
    }
}
