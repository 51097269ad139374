//! Successor-activation fan-out benchmark.
//!
//! Measures the cost of `activate_successors`: evaluating every outgoing
//! edge of a just-settled task, projecting data flow, and flipping each
//! target back to `PENDING`. Fan-out width is the knob that matters here,
//! since the work is linear in edge count.

use std::sync::Arc;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use agentgraph_core::executor::ExecutorRegistry;
use agentgraph_core::persistence::{InMemoryTaskStore, TaskStore};
use agentgraph_core::GraphEngine;
use agentgraph_types::{EdgeDefinition, PlanBlueprint, TaskDefinition, TaskStatus};
use uuid::Uuid;

fn bench_fan_out(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("successor_activation/fan_out");

    for width in [1, 10, 100, 500] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("edges", width), &width, |b, &width| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let store = Arc::new(InMemoryTaskStore::new());
                let engine = GraphEngine::new(store.clone(), ExecutorRegistry::new());

                let mut total = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let mut new_tasks = vec![TaskDefinition {
                        task_id: "root".into(),
                        parent_task_id: None,
                        input_data: serde_json::json!({}),
                        assignee_id: "Tool:Echo".into(),
                        context_overrides: None,
                        directives: None,
                    }];
                    let mut new_edges = Vec::with_capacity(width);
                    for i in 0..width {
                        let target = format!("successor-{i}");
                        new_tasks.push(TaskDefinition {
                            task_id: target.clone(),
                            parent_task_id: None,
                            input_data: serde_json::json!({}),
                            assignee_id: "Tool:Echo".into(),
                            context_overrides: None,
                            directives: None,
                        });
                        new_edges.push(EdgeDefinition {
                            source_task_id: "root".into(),
                            target_task_id: target,
                            condition: None,
                            data_flow: None,
                        });
                    }

                    let workflow_id = store
                        .create_workflow_from_blueprint(PlanBlueprint {
                            workflow_id: None,
                            new_tasks,
                            new_edges,
                            update_tasks: vec![],
                        })
                        .await
                        .unwrap();

                    let edges = store.get_edges_by_workflow_id(workflow_id).await.unwrap();
                    let root_id = edges[0].source_task_id;
                    store
                        .update_task_status_and_result(root_id, TaskStatus::Completed, None)
                        .await
                        .unwrap();

                    let start = Instant::now();
                    engine.dispatch_one(root_id).await.unwrap();
                    total += start.elapsed();
                }
                total
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out);
criterion_main!(benches);
