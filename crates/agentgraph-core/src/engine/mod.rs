//! The Graph Execution Engine: claims tasks off the work queue,
//! drives the task state machine, interprets agent intents, and re-activates
//! successors.

mod graph_engine;

pub use graph_engine::{EngineError, GraphEngine};
