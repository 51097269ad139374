//! Task claiming benchmark.
//!
//! Benchmarks the critical path: create -> claim -> complete. This is the
//! core dispatch-throughput metric for the in-memory store; the Postgres
//! store's equivalent cost is dominated by `SKIP LOCKED` row contention,
//! which criterion can't usefully measure without a live database.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use agentgraph_core::persistence::{InMemoryTaskStore, TaskStore};
use agentgraph_types::TaskStatus;
use uuid::Uuid;

/// Single-threaded claim/complete throughput.
fn bench_claim_single(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("task_claiming/single");
    group.throughput(Throughput::Elements(1));

    for batch_size in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("batch", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&rt).iter_custom(|iters| async move {
                    let store = InMemoryTaskStore::new();
                    let workflow_id = Uuid::now_v7();
                    let task_count = (iters * batch_size as u64).max(1);

                    let mut task_ids = Vec::with_capacity(task_count as usize);
                    for _ in 0..task_count {
                        let id = store
                            .create_task(workflow_id, "Tool:Echo", None, None, None)
                            .await
                            .unwrap();
                        task_ids.push(id);
                    }

                    let start = Instant::now();
                    for task_id in task_ids {
                        let task = store.claim_task(task_id).await.unwrap().unwrap();
                        store
                            .update_task_status_and_result(
                                task.id,
                                TaskStatus::Completed,
                                Some(serde_json::json!({"ok": true})),
                            )
                            .await
                            .unwrap();
                    }
                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

/// Claim contention across concurrently racing workers; only one claimant
/// per task should ever win.
fn bench_claim_concurrent(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("task_claiming/concurrent");
    group.sample_size(20);

    for workers in [2, 4, 8] {
        let task_count = 2000u64;
        group.throughput(Throughput::Elements(task_count));
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                b.to_async(&rt).iter(|| async {
                    let store = Arc::new(InMemoryTaskStore::new());
                    let workflow_id = Uuid::now_v7();

                    let mut task_ids = Vec::with_capacity(task_count as usize);
                    for _ in 0..task_count {
                        let id = store
                            .create_task(workflow_id, "Tool:Echo", None, None, None)
                            .await
                            .unwrap();
                        task_ids.push(id);
                    }
                    let task_ids = Arc::new(task_ids);
                    let next = Arc::new(AtomicU64::new(0));

                    let mut handles = Vec::new();
                    for _ in 0..workers {
                        let store = store.clone();
                        let task_ids = task_ids.clone();
                        let next = next.clone();
                        handles.push(tokio::spawn(async move {
                            loop {
                                let i = next.fetch_add(1, Ordering::Relaxed);
                                if i >= task_ids.len() as u64 {
                                    break;
                                }
                                let task_id = task_ids[i as usize];
                                if let Some(task) = store.claim_task(task_id).await.unwrap() {
                                    store
                                        .update_task_status_and_result(
                                            task.id,
                                            TaskStatus::Completed,
                                            None,
                                        )
                                        .await
                                        .unwrap();
                                }
                            }
                        }));
                    }

                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_claim_single, bench_claim_concurrent);
criterion_main!(benches);
