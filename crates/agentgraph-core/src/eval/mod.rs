//! Edge routing: predicate evaluation and data-flow remapping.
//!
//! These two components never escalate to the caller. A predicate that
//! fails to parse or evaluate is `false`, never an error the engine has to
//! handle; a data-flow mapping that can't resolve a source expression falls
//! back to binding the expression as a literal. Both behaviors are
//! deliberate -- see [`EvalError`] for why the error type exists at all if
//! nothing ever surfaces it.

mod dataflow;
mod predicate;

pub use dataflow::DataFlowMapper;
pub use predicate::PredicateEvaluator;

/// Never returned to a caller outside this module. `PredicateEvaluator`
/// catches every variant and converts it to `false`; the type exists so the
/// `debug!`-level log explaining *why* a predicate evaluated to `false`
/// carries a real reason instead of a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error("unsupported evaluator dialect: {0}")]
    UnsupportedDialect(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unbound identifier: {0}")]
    UnboundIdentifier(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
