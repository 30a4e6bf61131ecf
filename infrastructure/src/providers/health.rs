//! Provider health tracking with per-provider circuit breakers.
//!
//! A breaker counts consecutive failures for one provider key
//! (`provider:model`). After `failure_threshold` failures it opens and the
//! gateway skips the provider without a network call. There is no timer:
//! the first consult after `timeout` has elapsed closes the breaker, clears
//! the count and lets that caller through as the trial. A failed trial
//! counts as the first of a new run of failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Breaker tuning shared by every provider in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Time an open circuit waits before admitting a trial call.
    pub timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            timeout: Duration::from_millis(300_000),
        }
    }
}

/// Circuit breaker state for a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy: requests allowed.
    Closed,
    /// Tripped: requests skipped until the timeout admits a trial.
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}

/// Consecutive-failure breaker for one provider key.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            trial_started: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Whether a trial call admitted by the timeout is still unreported.
    pub fn trial_in_flight(&self) -> bool {
        self.trial_started.is_some()
    }

    /// Consult the breaker before a call.
    ///
    /// Once the timeout has elapsed the first consult moves the circuit to
    /// `Closed` and is admitted. Until that trial is recorded, other callers
    /// are rejected; a trial that is never recorded (cancelled call) stops
    /// blocking after another timeout period.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        if let Some(started) = self.trial_started {
            if now.saturating_duration_since(started) < self.config.timeout {
                return false;
            }
            self.trial_started = None;
        }

        if self.state == CircuitState::Closed {
            return true;
        }
        if let Some(opened_at) = self.opened_at
            && now.saturating_duration_since(opened_at) < self.config.timeout
        {
            return false;
        }

        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        self.trial_started = Some(now);
        true
    }

    /// Record a successful call. Returns `true` if this completed a trial.
    pub fn record_success(&mut self) -> bool {
        let was_trial = self.trial_started.take().is_some();
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        was_trial
    }

    /// Record a failed call. Returns `true` if the circuit is now open.
    pub fn record_failure_at(&mut self, now: Instant) -> bool {
        self.failure_count = self.failure_count.saturating_add(1);
        self.trial_started = None;
        if self.failure_count >= self.config.failure_threshold.max(1) {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
        }
        self.state == CircuitState::Open
    }
}

/// Point-in-time view of one provider's breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    pub key: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub trial_in_flight: bool,
}

/// Process-wide breaker registry, shared by `Arc`.
///
/// Each provider key has its own mutex; the registry map is locked only to
/// look up or create a breaker. No lock is held across a provider call.
#[derive(Debug, Default)]
pub struct ProviderHealthRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, Arc<Mutex<CircuitBreaker>>>>,
}

impl ProviderHealthRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    fn breaker(&self, key: &str) -> Arc<Mutex<CircuitBreaker>> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(CircuitBreaker::new(self.config))))
            .clone()
    }

    fn with_breaker<T>(&self, key: &str, f: impl FnOnce(&mut CircuitBreaker) -> T) -> T {
        let breaker = self.breaker(key);
        let mut guard = breaker.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, Instant::now())
    }

    pub fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        let (admitted, trial) = self.with_breaker(key, |b| {
            let was_open = b.state() == CircuitState::Open;
            (b.try_acquire_at(now), was_open)
        });
        if admitted && trial {
            info!(provider = key, "Circuit timeout elapsed; closed and admitting trial call");
        }
        admitted
    }

    pub fn record_success(&self, key: &str) {
        if self.with_breaker(key, |b| b.record_success()) {
            info!(provider = key, "Trial call succeeded");
        }
    }

    pub fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now());
    }

    pub fn record_failure_at(&self, key: &str, now: Instant) {
        let (open, failures) = self.with_breaker(key, |b| {
            let open = b.record_failure_at(now);
            (open, b.failure_count())
        });
        if open {
            warn!(
                provider = key,
                failures,
                timeout_ms = self.config.timeout.as_millis() as u64,
                "Circuit open; provider will be skipped"
            );
        } else {
            debug!(provider = key, failures, "Provider failure recorded");
        }
    }

    pub fn state(&self, key: &str) -> CircuitState {
        self.with_breaker(key, |b| b.state())
    }

    /// Current state of every provider seen so far, sorted by key.
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        let breakers: Vec<(String, Arc<Mutex<CircuitBreaker>>)> = {
            let map = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut health: Vec<ProviderHealth> = breakers
            .into_iter()
            .map(|(key, breaker)| {
                let b = breaker.lock().unwrap_or_else(PoisonError::into_inner);
                ProviderHealth {
                    key,
                    state: b.state(),
                    failure_count: b.failure_count(),
                    trial_in_flight: b.trial_in_flight(),
                }
            })
            .collect();
        health.sort_by(|a, b| a.key.cmp(&b.key));
        health
    }

    /// Forget all breaker state.
    pub fn reset(&self) {
        self.breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "anthropic:claude-sonnet-4-0";

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            timeout: Duration::from_millis(300_000),
        }
    }

    #[test]
    fn test_starts_closed() {
        let registry = ProviderHealthRegistry::new(config());
        assert_eq!(registry.state(KEY), CircuitState::Closed);
        assert!(registry.try_acquire(KEY));
    }

    #[test]
    fn test_opens_after_threshold() {
        let registry = ProviderHealthRegistry::new(config());
        let t0 = Instant::now();

        registry.record_failure_at(KEY, t0);
        registry.record_failure_at(KEY, t0);
        assert_eq!(registry.state(KEY), CircuitState::Closed);
        assert!(registry.try_acquire_at(KEY, t0));

        registry.record_failure_at(KEY, t0);
        assert_eq!(registry.state(KEY), CircuitState::Open);
        assert!(!registry.try_acquire_at(KEY, t0 + Duration::from_millis(299_999)));
    }

    #[test]
    fn test_success_resets_count() {
        let registry = ProviderHealthRegistry::new(config());
        let t0 = Instant::now();
        registry.record_failure_at(KEY, t0);
        registry.record_failure_at(KEY, t0);
        registry.record_success(KEY);
        registry.record_failure_at(KEY, t0);
        registry.record_failure_at(KEY, t0);
        assert_eq!(registry.state(KEY), CircuitState::Closed);
    }

    #[test]
    fn test_lifecycle_trial_success_closes() {
        let registry = ProviderHealthRegistry::new(config());
        let t0 = Instant::now();
        for _ in 0..3 {
            registry.record_failure_at(KEY, t0);
        }

        let later = t0 + Duration::from_millis(300_000);
        assert!(registry.try_acquire_at(KEY, later));
        // Only one trial at a time
        assert!(!registry.try_acquire_at(KEY, later));

        registry.record_success(KEY);
        assert_eq!(registry.state(KEY), CircuitState::Closed);
        assert!(registry.try_acquire_at(KEY, later));
        assert_eq!(registry.snapshot()[0].failure_count, 0);
    }

    #[test]
    fn test_timeout_consult_closes_and_clears_count() {
        let registry = ProviderHealthRegistry::new(config());
        let t0 = Instant::now();
        for _ in 0..3 {
            registry.record_failure_at(KEY, t0);
        }

        assert!(registry.try_acquire_at(KEY, t0 + Duration::from_millis(300_000)));

        let health = &registry.snapshot()[0];
        assert_eq!(health.state, CircuitState::Closed);
        assert_eq!(health.failure_count, 0);
        assert!(health.trial_in_flight);
        assert_eq!(registry.state(KEY), CircuitState::Closed);
    }

    #[test]
    fn test_failed_trial_starts_a_new_failure_run() {
        let registry = ProviderHealthRegistry::new(config());
        let t0 = Instant::now();
        for _ in 0..3 {
            registry.record_failure_at(KEY, t0);
        }

        let t1 = t0 + Duration::from_millis(300_001);
        assert!(registry.try_acquire_at(KEY, t1));
        registry.record_failure_at(KEY, t1);

        assert_eq!(registry.state(KEY), CircuitState::Closed);
        assert_eq!(registry.snapshot()[0].failure_count, 1);
        assert!(registry.try_acquire_at(KEY, t1 + Duration::from_millis(1_000)));

        registry.record_failure_at(KEY, t1);
        registry.record_failure_at(KEY, t1);
        assert_eq!(registry.state(KEY), CircuitState::Open);
        assert!(!registry.try_acquire_at(KEY, t1 + Duration::from_millis(1_000)));
    }

    #[test]
    fn test_abandoned_trial_expires() {
        let mut breaker = CircuitBreaker::new(config());
        let t0 = Instant::now();
        for _ in 0..3 {
            breaker.record_failure_at(t0);
        }
        let t1 = t0 + Duration::from_millis(300_000);
        assert!(breaker.try_acquire_at(t1));
        assert!(breaker.trial_in_flight());
        assert!(!breaker.try_acquire_at(t1 + Duration::from_millis(10)));
        assert!(breaker.try_acquire_at(t1 + Duration::from_millis(300_000)));
        assert!(!breaker.trial_in_flight());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_registry_admits_one_trial() {
        let registry = Arc::new(ProviderHealthRegistry::new(config()));
        let t0 = Instant::now();
        for _ in 0..3 {
            registry.record_failure_at(KEY, t0);
        }
        let later = t0 + Duration::from_millis(300_000);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.try_acquire_at(KEY, later) })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(registry.state(KEY), CircuitState::Closed);

        registry.record_success(KEY);
        assert!(registry.try_acquire_at(KEY, later));
    }

    #[test]
    fn test_breakers_are_per_key() {
        let registry = ProviderHealthRegistry::new(BreakerConfig {
            failure_threshold: 1,
            ..config()
        });
        registry.record_failure("anthropic:claude-sonnet-4-0");
        assert_eq!(registry.state("anthropic:claude-sonnet-4-0"), CircuitState::Open);
        assert_eq!(registry.state("openai:gpt-4o"), CircuitState::Closed);

        let snapshot = registry.snapshot();
        let keys: Vec<&str> = snapshot.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["anthropic:claude-sonnet-4-0", "openai:gpt-4o"]);
    }

    #[test]
    fn test_zero_threshold_behaves_as_one() {
        let mut breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 0,
            ..config()
        });
        assert!(breaker.try_acquire_at(Instant::now()));
        assert!(breaker.record_failure_at(Instant::now()));
    }

    #[test]
    fn test_reset() {
        let registry = ProviderHealthRegistry::new(BreakerConfig {
            failure_threshold: 1,
            ..config()
        });
        registry.record_failure(KEY);
        registry.reset();
        assert!(registry.snapshot().is_empty());
        assert_eq!(registry.state(KEY), CircuitState::Closed);
    }
}
