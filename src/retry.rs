//! Retry policy shared by the analysis poll loop and the channel reconnect loop.
//!
//! The policy makes the interval, growth, jitter and ceiling of both loops
//! explicit:
//!
//! ```toml
//! [polling]
//! strategy = "exponential"
//! interval_ms = 2000
//! max_interval_ms = 30000
//! multiplier = 2.0
//! jitter = 0.1
//! max_attempts = 60
//! ```
//!
//! `max_attempts = 0` (the default) means "keep trying until cancelled".

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// Delay multiplied by `multiplier` after every attempt, capped at `max_interval_ms`.
    Exponential,
}

impl std::fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryStrategy::Fixed => write!(f, "fixed"),
            RetryStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub strategy: RetryStrategy,
    pub interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Fraction of the delay added or removed at random, in `[0.0, 1.0]`.
    #[serde(default)]
    pub jitter: f64,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_max_interval_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Interval between analysis-status polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Delay before reopening a closed channel.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;

/// No computed delay is shorter than this, whatever the settings say.
pub const MIN_DELAY_MS: u64 = 10;

impl RetryPolicy {
    /// Fixed interval, unlimited attempts.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            interval_ms: interval.as_millis() as u64,
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
            jitter: 0.0,
            max_attempts: 0,
        }
    }

    pub fn poll_default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn reconnect_default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let ms = match self.strategy {
            RetryStrategy::Fixed => self.interval_ms,
            RetryStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1).min(63) as i32;
                let grown = self.interval_ms as f64 * self.multiplier.powi(exponent);
                if grown.is_finite() {
                    (grown as u64).min(self.max_interval_ms.max(self.interval_ms))
                } else {
                    self.max_interval_ms.max(self.interval_ms)
                }
            }
        };
        Duration::from_millis(ms.max(MIN_DELAY_MS))
    }

    /// Delay before attempt number `attempt` (1-based), jitter applied.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let spread = self.jitter.min(1.0);
        let factor = rand::thread_rng().gen_range((1.0 - spread)..=(1.0 + spread));
        base.mul_f64(factor).max(Duration::from_millis(MIN_DELAY_MS))
    }

    /// Problems with the policy, as human-readable warnings.
    pub fn validate(&self, section: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.interval_ms == 0 {
            warnings.push(format!("[{}] interval_ms must be greater than 0", section));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            warnings.push(format!(
                "[{}] jitter {} is outside the range 0.0-1.0",
                section, self.jitter
            ));
        }
        if self.strategy == RetryStrategy::Exponential {
            if self.multiplier < 1.0 {
                warnings.push(format!(
                    "[{}] multiplier {} shrinks the delay; use a value >= 1.0",
                    section, self.multiplier
                ));
            }
            if self.max_interval_ms < self.interval_ms {
                warnings.push(format!(
                    "[{}] max_interval_ms ({}) is below interval_ms ({})",
                    section, self.max_interval_ms, self.interval_ms
                ));
            }
        }
        warnings
    }
}

/// A `[polling]` or `[reconnect]` table as written. Keys left out keep the
/// section's own default.
#[derive(Debug, Default, Deserialize)]
struct PolicyTable {
    strategy: Option<RetryStrategy>,
    interval_ms: Option<u64>,
    max_interval_ms: Option<u64>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    max_attempts: Option<u32>,
}

impl PolicyTable {
    fn over(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            strategy: self.strategy.unwrap_or(base.strategy),
            interval_ms: self.interval_ms.unwrap_or(base.interval_ms),
            max_interval_ms: self.max_interval_ms.unwrap_or(base.max_interval_ms),
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            jitter: self.jitter.unwrap_or(base.jitter),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
        }
    }
}

/// `deserialize_with` for `[polling]`: partial tables fill in from
/// [`RetryPolicy::poll_default`].
pub fn deserialize_poll<'de, D: Deserializer<'de>>(d: D) -> Result<RetryPolicy, D::Error> {
    PolicyTable::deserialize(d).map(|table| table.over(RetryPolicy::poll_default()))
}

/// `deserialize_with` for `[reconnect]`: partial tables fill in from
/// [`RetryPolicy::reconnect_default`].
pub fn deserialize_reconnect<'de, D: Deserializer<'de>>(d: D) -> Result<RetryPolicy, D::Error> {
    PolicyTable::deserialize(d).map(|table| table.over(RetryPolicy::reconnect_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_constant_delay() {
        let policy = RetryPolicy::poll_default();
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(50), Duration::from_millis(2000));
    }

    #[test]
    fn test_default_policies_are_unlimited() {
        assert!(RetryPolicy::poll_default().allows(u32::MAX - 1));
        assert!(RetryPolicy::reconnect_default().allows(10_000));
        assert_eq!(
            RetryPolicy::reconnect_default().delay(3),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn test_max_attempts_ceiling() {
        let policy = RetryPolicy::poll_default().with_max_attempts(3);
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn test_exponential_growth_capped() {
        let policy = RetryPolicy {
            strategy: RetryStrategy::Exponential,
            interval_ms: 100,
            max_interval_ms: 1000,
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: 0,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(800));
        assert_eq!(policy.delay(5), Duration::from_millis(1000));
        assert_eq!(policy.delay(500), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy {
            jitter: 0.2,
            ..RetryPolicy::fixed(Duration::from_millis(1000))
        };
        for attempt in 1..50 {
            let d = policy.delay(attempt);
            assert!(d >= Duration::from_millis(800), "{:?} too short", d);
            assert!(d <= Duration::from_millis(1200), "{:?} too long", d);
        }
    }

    #[test]
    fn test_parse_from_toml_with_defaults() {
        let policy: RetryPolicy = toml::from_str("interval_ms = 500").unwrap();
        assert_eq!(policy.strategy, RetryStrategy::Fixed);
        assert_eq!(policy.max_attempts, 0);
        assert_eq!(policy.max_interval_ms, 30_000);
    }

    #[test]
    fn test_delay_never_below_floor() {
        let zero = RetryPolicy::fixed(Duration::ZERO);
        assert_eq!(zero.delay(1), Duration::from_millis(MIN_DELAY_MS));

        let shrinking = RetryPolicy {
            strategy: RetryStrategy::Exponential,
            interval_ms: 100,
            max_interval_ms: 1000,
            multiplier: -2.0,
            jitter: 1.0,
            max_attempts: 0,
        };
        for attempt in 1..20 {
            assert!(shrinking.delay(attempt) >= Duration::from_millis(MIN_DELAY_MS));
        }
    }

    #[derive(Debug, Deserialize)]
    struct Sections {
        #[serde(default = "RetryPolicy::poll_default", deserialize_with = "deserialize_poll")]
        polling: RetryPolicy,
        #[serde(
            default = "RetryPolicy::reconnect_default",
            deserialize_with = "deserialize_reconnect"
        )]
        reconnect: RetryPolicy,
    }

    #[test]
    fn test_partial_tables_keep_section_defaults() {
        let sections: Sections =
            toml::from_str("[polling]\nmax_attempts = 30\n\n[reconnect]\njitter = 0.1\n").unwrap();
        assert_eq!(sections.polling.interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(sections.polling.max_attempts, 30);
        assert_eq!(sections.reconnect.interval_ms, DEFAULT_RECONNECT_DELAY_MS);
        assert_eq!(sections.reconnect.jitter, 0.1);

        let missing: Sections = toml::from_str("").unwrap();
        assert_eq!(missing.polling, RetryPolicy::poll_default());
        assert_eq!(missing.reconnect, RetryPolicy::reconnect_default());
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let policy = RetryPolicy {
            strategy: RetryStrategy::Exponential,
            interval_ms: 0,
            max_interval_ms: 0,
            multiplier: 0.5,
            jitter: 1.5,
            max_attempts: 0,
        };
        let warnings = policy.validate("polling");
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.starts_with("[polling]")));
        assert!(RetryPolicy::poll_default().validate("polling").is_empty());
    }
}
