use tracing::warn;

/// Failure-rate circuit breaker over one sequential enhancement batch.
/// Trips once at least `min_attempts` assets have been attempted and more
/// than `failure_threshold` of them failed; already-processed assets keep
/// their results, the rest are never attempted.
#[derive(Debug, Clone)]
pub struct BatchCircuitBreaker {
    min_attempts: usize,
    failure_threshold: f64,
    processed: usize,
    failed: usize,
}

impl BatchCircuitBreaker {
    pub fn new(min_attempts: usize, failure_threshold: f64) -> Self {
        Self {
            min_attempts,
            failure_threshold,
            processed: 0,
            failed: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn attempts(&self) -> usize {
        self.processed + self.failed
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_tripped(&self) -> bool {
        let attempts = self.attempts();
        if attempts < self.min_attempts {
            return false;
        }
        let rate = self.failed as f64 / attempts as f64;
        if rate > self.failure_threshold {
            warn!(
                failed = self.failed,
                attempts, "circuit breaker tripped, aborting batch"
            );
            return true;
        }
        false
    }
}

impl Default for BatchCircuitBreaker {
    fn default() -> Self {
        Self::new(2, 0.5)
    }
}
