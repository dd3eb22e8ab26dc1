//! Retry configuration.
//!
//! `RetryConfig` is immutable once built and shared (behind an `Arc`) by every subscription of a
//! decorated source. `RetryOptions` is the flat option surface (`delay`, `maxRetryAttempts`,
//! `scalingFactor`, `excludedStatusCodes`, `resetRetryCountOnEmission`); with the `serde`
//! feature it deserializes from camelCase keys, every key optional.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use resubscribe::RetryConfig;
//!
//! let config = RetryConfig::builder()
//!     .base_delay(Duration::from_millis(500))
//!     .max_attempts(5)
//!     .scaling_factor(2.0)
//!     .exclude_status_code(401)
//!     .reset_on_emission(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.delay_for(3), Duration::from_secs(2));
//! assert!(config.is_excluded(401));
//! ```

use crate::backoff::Backoff;
use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::time::Duration;

/// Default delay before the first retry.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);
/// Default retry budget.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default scaling factor (constant delay).
pub const DEFAULT_SCALING_FACTOR: f64 = 1.0;

/// Immutable retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    backoff: Backoff,
    max_attempts: usize,
    excluded_codes: BTreeSet<i32>,
    reset_on_emission: bool,
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.backoff.base()
    }

    /// Retries allowed per failure episode. Zero makes the decorator a pass-through.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn scaling_factor(&self) -> f64 {
        self.backoff.factor()
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn excluded_codes(&self) -> &BTreeSet<i32> {
        &self.excluded_codes
    }

    pub fn is_excluded(&self, code: i32) -> bool {
        self.excluded_codes.contains(&code)
    }

    pub fn reset_on_emission(&self) -> bool {
        self.reset_on_emission
    }

    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::constant(DEFAULT_DELAY),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            excluded_codes: BTreeSet::new(),
            reset_on_emission: false,
        }
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Clone)]
pub struct RetryConfigBuilder {
    base_delay: Duration,
    max_attempts: usize,
    scaling_factor: f64,
    excluded_codes: BTreeSet<i32>,
    reset_on_emission: bool,
}

impl RetryConfigBuilder {
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self {
            base_delay: DEFAULT_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            excluded_codes: BTreeSet::new(),
            reset_on_emission: false,
        }
    }

    /// Delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Retry budget (resubscriptions, not counting the initial subscription).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Multiplier applied per attempt. Must be finite and > 0.
    pub fn scaling_factor(mut self, factor: f64) -> Self {
        self.scaling_factor = factor;
        self
    }

    /// Never retry errors carrying this status code.
    pub fn exclude_status_code(mut self, code: i32) -> Self {
        self.excluded_codes.insert(code);
        self
    }

    pub fn excluded_status_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        self.excluded_codes.extend(codes);
        self
    }

    /// Reset the attempt counter whenever a value is forwarded downstream.
    pub fn reset_on_emission(mut self, reset: bool) -> Self {
        self.reset_on_emission = reset;
        self
    }

    /// Build the configuration, validating inputs.
    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        Ok(RetryConfig {
            backoff: Backoff::scaled(self.base_delay, self.scaling_factor)?,
            max_attempts: self.max_attempts,
            excluded_codes: self.excluded_codes,
            reset_on_emission: self.reset_on_emission,
        })
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat option surface, keyed the way callers configure the decorator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default, deny_unknown_fields))]
pub struct RetryOptions {
    /// Base delay in milliseconds.
    pub delay: u64,
    pub max_retry_attempts: usize,
    pub scaling_factor: f64,
    pub excluded_status_codes: Vec<i32>,
    pub reset_retry_count_on_emission: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY.as_millis() as u64,
            max_retry_attempts: DEFAULT_MAX_ATTEMPTS,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            excluded_status_codes: Vec::new(),
            reset_retry_count_on_emission: false,
        }
    }
}

impl TryFrom<RetryOptions> for RetryConfig {
    type Error = ConfigError;

    fn try_from(options: RetryOptions) -> Result<Self, Self::Error> {
        RetryConfig::builder()
            .base_delay(Duration::from_millis(options.delay))
            .max_attempts(options.max_retry_attempts)
            .scaling_factor(options.scaling_factor)
            .excluded_status_codes(options.excluded_status_codes)
            .reset_on_emission(options.reset_retry_count_on_emission)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RetryConfig::default();
        assert_eq!(config.base_delay(), Duration::from_millis(1000));
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.scaling_factor(), 1.0);
        assert!(config.excluded_codes().is_empty());
        assert!(!config.reset_on_emission());
        assert_eq!(RetryConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RetryConfig::builder()
            .base_delay(Duration::from_millis(2))
            .max_attempts(7)
            .scaling_factor(3.0)
            .exclude_status_code(404)
            .excluded_status_codes([401, 403])
            .reset_on_emission(true)
            .build()
            .expect("valid config");

        assert_eq!(config.base_delay(), Duration::from_millis(2));
        assert_eq!(config.max_attempts(), 7);
        assert_eq!(config.scaling_factor(), 3.0);
        assert_eq!(config.excluded_codes().iter().copied().collect::<Vec<_>>(), vec![401, 403, 404]);
        assert!(config.reset_on_emission());
        assert_eq!(config.delay_for(3), Duration::from_millis(18));
    }

    #[test]
    fn zero_attempts_is_valid() {
        let config = RetryConfig::builder().max_attempts(0).build().unwrap();
        assert_eq!(config.max_attempts(), 0);
    }

    #[test]
    fn builder_rejects_non_positive_factor() {
        let err = RetryConfig::builder().scaling_factor(0.0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidScalingFactor(0.0));
    }

    #[test]
    fn options_convert_with_defaults() {
        let config = RetryConfig::try_from(RetryOptions::default()).unwrap();
        assert_eq!(config, RetryConfig::default());

        let config = RetryConfig::try_from(RetryOptions {
            delay: 0,
            max_retry_attempts: 2,
            excluded_status_codes: vec![0, 500],
            ..RetryOptions::default()
        })
        .unwrap();
        assert_eq!(config.base_delay(), Duration::ZERO);
        assert_eq!(config.max_attempts(), 2);
        assert!(config.is_excluded(0));
        assert!(config.is_excluded(500));
        assert!(!config.is_excluded(503));
    }

    #[test]
    fn options_reject_negative_factor() {
        let options = RetryOptions { scaling_factor: -1.0, ..RetryOptions::default() };
        assert!(RetryConfig::try_from(options).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_from_camel_case() {
        let options: RetryOptions = serde_json::from_str(
            r#"{"delay": 2, "maxRetryAttempts": 3, "scalingFactor": 2,
                "excludedStatusCodes": [401], "resetRetryCountOnEmission": true}"#,
        )
        .unwrap();
        assert_eq!(options.delay, 2);
        assert_eq!(options.max_retry_attempts, 3);
        assert_eq!(options.scaling_factor, 2.0);
        assert_eq!(options.excluded_status_codes, vec![401]);
        assert!(options.reset_retry_count_on_emission);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_missing_keys_take_defaults() {
        let options: RetryOptions = serde_json::from_str(r#"{"maxRetryAttempts": 0}"#).unwrap();
        assert_eq!(options, RetryOptions { max_retry_attempts: 0, ..RetryOptions::default() });
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_reject_unknown_keys() {
        let err = serde_json::from_str::<RetryOptions>(r#"{"retries": 3}"#);
        assert!(err.is_err());
    }
}
