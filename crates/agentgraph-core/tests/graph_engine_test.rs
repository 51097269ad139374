//! End-to-end dispatch scenarios driven purely through `GraphEngine`'s public
//! API against `InMemoryTaskStore` -- no internals reached into.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use agentgraph_core::executor::{
    AgentExecutor, EchoToolExecutor, ExecutorCallError, ExecutorRegistry, HelloWorldAgentExecutor,
};
use agentgraph_core::persistence::{InMemoryTaskStore, TaskStore};
use agentgraph_core::GraphEngine;
use agentgraph_types::{
    AgentIntent, AgentOutput, AgentResult, Condition, DataFlow, ExecutorStatus, FinalAnswer,
    PlanBlueprint, Task, TaskDefinition, TaskStatus, ToolCallRequest,
};

fn engine_with_fixtures(store: Arc<dyn TaskStore>) -> GraphEngine {
    let executors = ExecutorRegistry::new()
        .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor))
        .with_tool("Echo", Arc::new(EchoToolExecutor));
    GraphEngine::new(store, executors)
}

#[tokio::test]
async fn agent_final_answer_completes_the_task_in_one_dispatch() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let workflow_id = Uuid::now_v7();
    let task_id = store
        .create_task(workflow_id, "Agent:HelloWorld", Some(json!({})), None, None)
        .await
        .unwrap();

    let engine = engine_with_fixtures(store.clone());
    engine.dispatch_one(task_id).await.unwrap();

    let task = store.get_task_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.unwrap()["content"], json!("Hello World!"));
}

/// Returns a `ToolCallRequest` on its first call, then a `FinalAnswer` built
/// from whatever the tool wrote into `result.last_tool_result` on the second.
/// Models a turn-taking agent that inspects its own carried-forward context.
struct ToolThenAnswerAgent {
    calls: AtomicUsize,
}

impl ToolThenAnswerAgent {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl AgentExecutor for ToolThenAnswerAgent {
    async fn execute(&self, task: &Task) -> Result<AgentResult, ExecutorCallError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let intent = if call == 0 {
            AgentIntent::ToolCallRequest(ToolCallRequest {
                tool_id: "Tool:Calc".to_string(),
                arguments: json!({"expr": "2+2"}),
            })
        } else {
            let prior = task
                .result
                .as_ref()
                .and_then(|r| r.get("last_tool_result"))
                .and_then(|r| r.get("output"))
                .cloned()
                .unwrap_or(json!(null));
            AgentIntent::FinalAnswer(FinalAnswer { content: prior })
        };
        Ok(AgentResult {
            status: ExecutorStatus::Success,
            output: AgentOutput { thought: "reasoning".into(), intent },
            failure_details: None,
            metadata: None,
        })
    }
}

struct CalcToolExecutor;

#[async_trait]
impl agentgraph_core::executor::ToolExecutor for CalcToolExecutor {
    async fn execute(
        &self,
        _request: &ToolCallRequest,
    ) -> Result<agentgraph_types::ToolResult, ExecutorCallError> {
        Ok(agentgraph_types::ToolResult {
            status: ExecutorStatus::Success,
            output: Some(json!(4)),
            error_type: None,
            error_message: None,
            post_execution_plan: None,
        })
    }
}

#[tokio::test]
async fn tool_call_reentry_completes_on_the_second_dispatch() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let workflow_id = Uuid::now_v7();
    let task_id = store
        .create_task(workflow_id, "Agent:Calculator", Some(json!({"q": "2+2"})), None, None)
        .await
        .unwrap();

    let executors = ExecutorRegistry::new()
        .with_agent("Calculator", Arc::new(ToolThenAnswerAgent::new()))
        .with_tool("Calc", Arc::new(CalcToolExecutor));
    let engine = GraphEngine::new(store.clone(), executors);

    engine.dispatch_one(task_id).await.unwrap();
    let mid = store.get_task_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(mid.status, TaskStatus::Pending);
    assert_eq!(mid.result.unwrap()["last_tool_result"]["output"], json!(4));

    engine.dispatch_one(task_id).await.unwrap();
    let done = store.get_task_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.result.unwrap()["content"], json!(4));
}

#[tokio::test]
async fn conditional_edge_activates_successor_when_upstream_result_satisfies_it() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let workflow_id = Uuid::now_v7();
    let researcher = store
        .create_task(workflow_id, "Tool:Echo", Some(json!({})), None, None)
        .await
        .unwrap();
    let writer = store
        .create_task(workflow_id, "Tool:Echo", Some(json!({})), None, None)
        .await
        .unwrap();

    let mut mappings = HashMap::new();
    mappings.insert("weather_data".to_string(), "content.data".to_string());
    store
        .create_edge(
            workflow_id,
            researcher,
            writer,
            Some(Condition {
                evaluator: "CEL".to_string(),
                expression: "content.success == true".to_string(),
            }),
            Some(DataFlow { mappings }),
        )
        .await
        .unwrap();

    store
        .update_task_status_and_result(
            researcher,
            TaskStatus::Completed,
            Some(json!({"content": {"success": true, "data": {"temp": 25}}})),
        )
        .await
        .unwrap();

    let engine = engine_with_fixtures(store.clone());
    engine.dispatch_one(researcher).await.unwrap();

    let writer_task = store.get_task_by_id(writer).await.unwrap().unwrap();
    assert_eq!(writer_task.status, TaskStatus::Pending);
    assert_eq!(writer_task.input_data["weather_data"], json!({"temp": 25}));
}

#[tokio::test]
async fn conditional_edge_leaves_successor_untouched_when_predicate_fails() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let workflow_id = Uuid::now_v7();
    let researcher = store
        .create_task(workflow_id, "Tool:Echo", Some(json!({})), None, None)
        .await
        .unwrap();
    let writer = store
        .create_task(workflow_id, "Tool:Echo", Some(json!({"initial": true})), None, None)
        .await
        .unwrap();

    store
        .create_edge(
            workflow_id,
            researcher,
            writer,
            Some(Condition {
                evaluator: "CEL".to_string(),
                expression: "content.success == true".to_string(),
            }),
            None,
        )
        .await
        .unwrap();

    store
        .update_task_status_and_result(
            researcher,
            TaskStatus::Completed,
            Some(json!({"content": {"success": false}})),
        )
        .await
        .unwrap();

    let engine = engine_with_fixtures(store.clone());
    engine.dispatch_one(researcher).await.unwrap();

    let writer_task = store.get_task_by_id(writer).await.unwrap().unwrap();
    assert_eq!(writer_task.status, TaskStatus::Pending);
    assert_eq!(writer_task.input_data, json!({"initial": true}));
}

#[tokio::test]
async fn blueprint_placeholder_ids_remap_to_store_assigned_uuids() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());

    let blueprint = PlanBlueprint {
        workflow_id: None,
        new_tasks: vec![
            TaskDefinition {
                task_id: "p1".into(),
                parent_task_id: None,
                input_data: json!({}),
                assignee_id: "Agent:A".into(),
                context_overrides: None,
                directives: None,
            },
            TaskDefinition {
                task_id: "p2".into(),
                parent_task_id: None,
                input_data: json!({}),
                assignee_id: "Agent:B".into(),
                context_overrides: None,
                directives: None,
            },
        ],
        new_edges: vec![agentgraph_types::EdgeDefinition {
            source_task_id: "p1".into(),
            target_task_id: "p2".into(),
            condition: None,
            data_flow: None,
        }],
        update_tasks: vec![],
    };

    let workflow_id = store.create_workflow_from_blueprint(blueprint).await.unwrap();
    let edges = store.get_edges_by_workflow_id(workflow_id).await.unwrap();
    assert_eq!(edges.len(), 1);

    let source = store.get_task_by_id(edges[0].source_task_id).await.unwrap().unwrap();
    let target = store.get_task_by_id(edges[0].target_task_id).await.unwrap().unwrap();
    assert_eq!(source.assignee_id, "Agent:A");
    assert_eq!(target.assignee_id, "Agent:B");
    assert_ne!(edges[0].source_task_id, edges[0].target_task_id);
}

#[tokio::test]
async fn concurrent_dispatch_claims_a_pending_task_exactly_once() {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let workflow_id = Uuid::now_v7();
    let task_id = store
        .create_task(workflow_id, "Agent:HelloWorld", Some(json!({})), None, None)
        .await
        .unwrap();

    let call_count = Arc::new(AtomicUsize::new(0));

    struct CountingAgent {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AgentExecutor for CountingAgent {
        async fn execute(&self, _task: &Task) -> Result<AgentResult, ExecutorCallError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(AgentResult {
                status: ExecutorStatus::Success,
                output: AgentOutput {
                    thought: "done".into(),
                    intent: AgentIntent::FinalAnswer(FinalAnswer { content: json!("ok") }),
                },
                failure_details: None,
                metadata: None,
            })
        }
    }

    let executors = ExecutorRegistry::new()
        .with_agent("HelloWorld", Arc::new(CountingAgent { count: call_count.clone() }));
    let engine = Arc::new(GraphEngine::new(store.clone(), executors));

    let e1 = engine.clone();
    let e2 = engine.clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { e1.dispatch_one(task_id).await }),
        tokio::spawn(async move { e2.dispatch_one(task_id).await }),
    );
    r1.unwrap().unwrap();
    r2.unwrap().unwrap();

    assert_eq!(call_count.load(Ordering::SeqCst), 1);
    let task = store.get_task_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}
