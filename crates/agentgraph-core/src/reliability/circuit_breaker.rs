//! Circuit breaker configuration and the executing breaker itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls allowed
    Closed,

    /// Failure threshold exceeded - all calls rejected
    Open,

    /// Testing if service recovered - limited calls allowed
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Circuit breaker configuration
///
/// Circuit breakers protect external services from cascading failures.
/// When failures exceed a threshold, the circuit "opens" and requests
/// fail fast without calling the service.
///
/// # State Machine
///
/// ```text
/// ┌─────────┐  failure threshold  ┌─────────┐  reset timeout  ┌──────────┐
/// │ Closed  │ ─────────────────► │  Open   │ ──────────────► │ HalfOpen │
/// └─────────┘                     └─────────┘                 └──────────┘
///      ▲                                                            │
///      │                                                            │
///      │              success threshold                             │
///      └────────────────────────────────────────────────────────────┘
/// ```
///
/// # Example
///
/// ```
/// use agentgraph_core::CircuitBreakerConfig;
/// use std::time::Duration;
///
/// let config = CircuitBreakerConfig::default()
///     .with_failure_threshold(5)
///     .with_reset_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of failures required to open the circuit
    pub failure_threshold: u32,

    /// Number of successes required to close the circuit (in half-open state)
    pub success_threshold: u32,

    /// Time to wait before transitioning from open to half-open
    #[serde(with = "duration_millis")]
    pub reset_timeout: Duration,

    /// Sliding window size for failure counting
    #[serde(with = "duration_millis")]
    pub window_size: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            window_size: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold to open the circuit
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the success threshold to close the circuit
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Set the reset timeout (time before trying again after opening)
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Set the sliding window size for failure counting
    pub fn with_window_size(mut self, window: Duration) -> Self {
        self.window_size = window;
        self
    }
}

/// A single assignee's circuit breaker.
///
/// Tracks consecutive failures (closed -> open), a reset timeout before a
/// trial call is allowed (open -> half-open), and consecutive successes in
/// half-open before the circuit fully closes again. State lives in-process;
/// with one engine process per worker pool and the breaker keyed by
/// `assignee_id`, every worker dispatching to the same flapping agent or
/// tool shares one breaker instance via `CircuitBreakerRegistry`.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at_millis: AtomicU64,
    epoch: Instant,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    /// Current state, first advancing Open -> HalfOpen if `reset_timeout`
    /// has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock();
        if *state == CircuitState::Open {
            let opened_at = self.opened_at_millis.load(Ordering::Acquire);
            let elapsed = self.epoch.elapsed().as_millis() as u64 - opened_at;
            if elapsed >= self.config.reset_timeout.as_millis() as u64 {
                *state = CircuitState::HalfOpen;
                self.consecutive_successes.store(0, Ordering::Release);
            }
        }
        *state
    }

    /// Whether a call should be let through right now.
    pub fn allow_call(&self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }

    pub fn record_success(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.consecutive_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    *self.state.lock() = CircuitState::Closed;
                    self.consecutive_failures.store(0, Ordering::Release);
                    self.consecutive_successes.store(0, Ordering::Release);
                }
            }
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => self.trip(),
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.trip();
                }
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&self) {
        *self.state.lock() = CircuitState::Open;
        self.opened_at_millis
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Release);
        self.consecutive_successes.store(0, Ordering::Release);
    }
}

/// One breaker per `assignee_id`, created lazily on first use.
#[derive(Clone)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Arc<Mutex<HashMap<String, Arc<CircuitBreaker>>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn for_assignee(&self, assignee_id: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock();
        breakers
            .entry(assignee_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.clone())))
            .clone()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.reset_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(10)
            .with_success_threshold(3)
            .with_reset_timeout(Duration::from_secs(60));

        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.success_threshold, 3);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }

    #[test]
    fn test_serialization() {
        let config = CircuitBreakerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CircuitBreakerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_breaker_trips_after_threshold() {
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::default().with_failure_threshold(3),
        );
        assert!(breaker.allow_call());
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow_call());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_call());
    }

    #[test]
    fn test_breaker_half_open_after_timeout() {
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::default()
                .with_failure_threshold(1)
                .with_reset_timeout(Duration::from_millis(0)),
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_breaker_closes_after_success_threshold() {
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::default()
                .with_failure_threshold(1)
                .with_success_threshold(2)
                .with_reset_timeout(Duration::from_millis(0)),
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_breaker_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::default()
                .with_failure_threshold(1)
                .with_reset_timeout(Duration::from_millis(0)),
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_registry_reuses_breaker_per_assignee() {
        let registry = CircuitBreakerRegistry::default();
        let a = registry.for_assignee("Agent:Weather");
        let b = registry.for_assignee("Agent:Weather");
        assert!(Arc::ptr_eq(&a, &b));
        let c = registry.for_assignee("Agent:Other");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
