//! Configuration for the convergence poller and the in-memory ledger adapter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::MembershipError;

/// Convergence poller configuration.
///
/// Durations are stored as milliseconds; the accessors return
/// [`Duration`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Pause after the first incomplete sweep (ms). Zero only yields.
    pub poll_interval_ms: u64,
    /// Growth factor of the pause between consecutive sweeps.
    pub backoff_multiplier: f64,
    /// Upper bound for the pause between sweeps (ms).
    pub max_poll_interval_ms: u64,
    /// Give up with `TimedOut` after this long (ms). `None` waits forever.
    pub deadline_ms: Option<u64>,
    /// Abort if one node fails this many queries in a row. `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            backoff_multiplier: 1.5,
            max_poll_interval_ms: 1_000,
            deadline_ms: Some(30_000),
            max_consecutive_failures: Some(20),
        }
    }
}

impl PollerConfig {
    /// Wait forever: no deadline, no failure bound, no backoff.
    /// Sweeps still yield to the runtime between iterations.
    pub fn unbounded() -> Self {
        Self {
            poll_interval_ms: 0,
            backoff_multiplier: 1.0,
            max_poll_interval_ms: 0,
            deadline_ms: None,
            max_consecutive_failures: None,
        }
    }

    /// Builder: set the initial pause between sweeps.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self.max_poll_interval_ms = self.max_poll_interval_ms.max(self.poll_interval_ms);
        self
    }

    /// Builder: set the backoff growth factor.
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_poll_interval_ms = duration_ms(max_interval);
        self
    }

    /// Builder: set the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(duration_ms(deadline));
        self
    }

    /// Builder: remove the deadline.
    pub fn without_deadline(mut self) -> Self {
        self.deadline_ms = None;
        self
    }

    /// Builder: bound consecutive query failures per node.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = Some(max);
        self
    }

    /// Initial pause between sweeps.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum pause between sweeps.
    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    /// Deadline, if bounded.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Pause to apply after `sweep` (1-based) incomplete sweeps.
    pub fn interval_after(&self, sweep: u32) -> Duration {
        if self.poll_interval_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = sweep.saturating_sub(1).min(64) as i32;
        let scaled = self.poll_interval_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_poll_interval_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), MembershipError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(MembershipError::InvalidConfig(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(MembershipError::InvalidConfig(format!(
                "max_poll_interval_ms ({}) is below poll_interval_ms ({})",
                self.max_poll_interval_ms, self.poll_interval_ms
            )));
        }
        if self.deadline_ms == Some(0) {
            return Err(MembershipError::InvalidConfig(
                "deadline_ms cannot be 0".to_string(),
            ));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(MembershipError::InvalidConfig(
                "max_consecutive_failures cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory ledger adapter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Base delay before a committed record reaches other nodes (ms).
    pub propagation_delay_ms: u64,
    /// Random extra delay added per recipient, uniform in `0..=jitter` (ms).
    pub propagation_jitter_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            propagation_delay_ms: 20,
            propagation_jitter_ms: 30,
        }
    }
}

impl LedgerConfig {
    /// Records reach every node as soon as the delivery tasks run.
    pub fn immediate() -> Self {
        Self {
            propagation_delay_ms: 0,
            propagation_jitter_ms: 0,
        }
    }

    /// Builder: set delay and jitter.
    pub fn with_propagation(mut self, delay: Duration, jitter: Duration) -> Self {
        self.propagation_delay_ms = duration_ms(delay);
        self.propagation_jitter_ms = duration_ms(jitter);
        self
    }

    /// Base propagation delay.
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    /// Maximum jitter.
    pub fn propagation_jitter(&self) -> Duration {
        Duration::from_millis(self.propagation_jitter_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unbounded_has_no_limits() {
        let config = PollerConfig::unbounded();
        assert!(config.deadline().is_none());
        assert!(config.max_consecutive_failures.is_none());
        assert_eq!(config.interval_after(10), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = PollerConfig::default()
            .with_poll_interval(Duration::from_millis(100))
            .with_backoff(2.0, Duration::from_millis(500));
        assert_eq!(config.interval_after(1), Duration::from_millis(100));
        assert_eq!(config.interval_after(2), Duration::from_millis(200));
        assert_eq!(config.interval_after(3), Duration::from_millis(400));
        assert_eq!(config.interval_after(4), Duration::from_millis(500));
        assert_eq!(config.interval_after(1_000), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let shrinking = PollerConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            shrinking.validate(),
            Err(MembershipError::InvalidConfig(_))
        ));

        let inverted = PollerConfig {
            poll_interval_ms: 100,
            max_poll_interval_ms: 10,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        assert!(PollerConfig::default()
            .with_deadline(Duration::ZERO)
            .validate()
            .is_err());
        assert!(PollerConfig::default()
            .with_max_consecutive_failures(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_ledger_config() {
        let config = LedgerConfig::immediate()
            .with_propagation(Duration::from_millis(5), Duration::from_millis(2));
        assert_eq!(config.propagation_delay(), Duration::from_millis(5));
        assert_eq!(config.propagation_jitter(), Duration::from_millis(2));
        assert_eq!(LedgerConfig::default().propagation_delay_ms, 20);
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Property: backoff never shrinks and never exceeds the cap
        #[test]
        fn prop_backoff_monotone_and_capped(
            base_ms in 1u64..1_000,
            cap_factor in 1u64..50,
            multiplier in 1.0f64..4.0,
            sweeps in 1u32..200
        ) {
            let config = PollerConfig::default()
                .with_poll_interval(Duration::from_millis(base_ms))
                .with_backoff(multiplier, Duration::from_millis(base_ms * cap_factor));
            prop_assert!(config.validate().is_ok());

            let mut previous = Duration::ZERO;
            for sweep in 1..=sweeps {
                let pause = config.interval_after(sweep);
                prop_assert!(pause >= previous);
                prop_assert!(pause <= config.max_poll_interval());
                previous = pause;
            }
        }
    }
}
