use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("poll policy needs max_attempts or max_elapsed")]
    Unbounded,
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("backoff factor must be finite and >= 1.0, got {0}")]
    InvalidBackoff(f64),
}

/// Timing rules for status polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait before the first poll once processing begins.
    pub initial_delay: Duration,
    /// Wait after the first non-terminal answer.
    pub interval: Duration,
    /// Multiplier applied to the wait after each further answer; 1.0 keeps it fixed.
    pub backoff_factor: f64,
    /// Upper bound for the backed-off wait.
    pub max_interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_elapsed: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(5),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(60),
            max_attempts: Some(120),
            max_elapsed: Some(Duration::from_secs(30 * 60)),
        }
    }
}

impl PollPolicy {
    /// Fixed cadence bounded by attempt count only.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: interval,
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
            max_attempts: Some(max_attempts),
            max_elapsed: None,
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts.is_none() && self.max_elapsed.is_none() {
            return Err(PolicyError::Unbounded);
        }
        if self.max_attempts == Some(0) {
            return Err(PolicyError::ZeroAttempts);
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(PolicyError::InvalidBackoff(self.backoff_factor));
        }
        Ok(())
    }

    /// Wait after the `attempt`-th poll (1-based) returned a non-terminal answer.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.interval.as_secs_f64();
        let cap = self.max_interval.as_secs_f64().max(base);
        let scaled = base * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(scaled.min(cap))
    }

    pub(crate) fn attempts_spent(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    pub(crate) fn time_spent(&self, elapsed: Duration) -> bool {
        self.max_elapsed.is_some_and(|max| elapsed >= max)
    }
}
