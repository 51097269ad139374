//! Reliability patterns wrapping executor invocations.
//!
//! This module provides:
//! - [`RetryPolicy`] - Configurable retry with exponential backoff
//! - [`CircuitBreakerConfig`] / [`CircuitBreaker`] / [`CircuitBreakerRegistry`] -
//!   per-assignee circuit breaking so a flapping executor fails fast instead
//!   of being retried into the ground on every dispatch.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use retry::RetryPolicy;
