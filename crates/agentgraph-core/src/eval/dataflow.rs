//! Projects a completed task's result onto a successor's input document.
//!
//! Grounded on `original_source/CentralGraphEngine/engine_enhanced.py`'s
//! `apply_data_flow`, which binds each `target_key` either to a top-level key
//! of the source result or, failing that, to the literal expression string.
//! This implementation goes further: a dotted path is walked from the root
//! of the result document first, and only falls back to treating its last
//! segment as a top-level key, before falling back to the literal.

use serde_json::{Map, Value};
use tracing::warn;

use agentgraph_types::DataFlow;

/// Stateless; holds no configuration of its own.
#[derive(Debug, Clone, Default)]
pub struct DataFlowMapper;

impl DataFlowMapper {
    pub fn new() -> Self {
        Self
    }

    /// Builds the input document a successor task should receive.
    ///
    /// Absent or empty `data_flow` produces an empty object. Each mapping
    /// resolves `source_expression` against `source_result` in three steps:
    /// 1. If the expression contains `.`, walk it as a dotted path from the
    ///    root of `source_result`.
    /// 2. Otherwise, or if the walk above didn't resolve, look up the
    ///    expression's last `.`-segment as a top-level key of
    ///    `source_result`.
    /// 3. If neither resolves, bind the literal expression string itself,
    ///    and log a warning -- this also masks typos in `source_expression`,
    ///    so it is never silent.
    pub fn apply(&self, data_flow: Option<&DataFlow>, source_result: &Value) -> Map<String, Value> {
        let mut output = Map::new();

        let Some(data_flow) = data_flow else {
            return output;
        };

        for (target_key, source_expression) in &data_flow.mappings {
            let resolved = resolve(source_expression, source_result).unwrap_or_else(|| {
                warn!(
                    target_key,
                    source_expression, "data-flow mapping fell back to a literal value"
                );
                Value::String(source_expression.clone())
            });
            output.insert(target_key.clone(), resolved);
        }

        output
    }
}

fn resolve(expression: &str, source_result: &Value) -> Option<Value> {
    if expression.contains('.') {
        if let Some(v) = walk_dotted_path(source_result, expression) {
            return Some(v.clone());
        }
        let last_segment = expression.rsplit('.').next().unwrap_or(expression);
        return source_result.as_object()?.get(last_segment).cloned();
    }
    source_result.as_object()?.get(expression).cloned()
}

fn walk_dotted_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
