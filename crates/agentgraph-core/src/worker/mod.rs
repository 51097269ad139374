//! Worker pool for task execution.
//!
//! This module provides:
//! - [`WorkerPool`] - drives a [`crate::engine::GraphEngine`] off a work
//!   queue, concurrently, with backpressure and graceful shutdown.
//! - [`BackpressureConfig`] / [`BackpressureState`] - load-aware task
//!   acceptance with watermark hysteresis.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        WorkerPool                          │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │              BackpressureState                      │  │
//! │  │   (high/low watermarks, load tracking)               │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                        │                                   │
//! │                        ▼                                   │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │      GraphEngine::dispatch_one (Semaphore-limited)   │  │
//! │  │  [task 1] [task 2] [task 3] ... [task N]             │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use agentgraph_core::worker::{WorkerPool, WorkerPoolConfig};
//!
//! let pool = WorkerPool::new(engine, WorkerPoolConfig::new(20))?;
//! pool.run(consumer).await;
//! ```

mod backpressure;
mod pool;

pub use backpressure::{BackpressureConfig, BackpressureError, BackpressureState};
pub use pool::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
