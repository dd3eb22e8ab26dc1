//! Exponential delay computation for resubscription.
//!
//! Attempt semantics: attempt `0` is the initial subscription (no delay) and retries start at
//! `attempt = 1`. The `n`th retry waits `base * factor^(n - 1)`, so the first retry always waits
//! exactly `base` regardless of the factor.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use resubscribe::Backoff;
//!
//! let backoff = Backoff::scaled(Duration::from_millis(100), 2.0).unwrap();
//! assert_eq!(backoff.delay(0), Duration::ZERO); // initial subscription
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay(3), Duration::from_millis(400));
//! ```
//!
//! Overflow behavior: computations that overflow (or produce a non-finite value) saturate to
//! `MAX_BACKOFF` (1 day). Attempts greater than `i32::MAX` are clamped when computing the power.

use crate::error::ConfigError;
use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Base delay scaled geometrically per attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    factor: f64,
}

impl Backoff {
    /// Same delay before every retry.
    pub fn constant(base: Duration) -> Self {
        Self { base, factor: 1.0 }
    }

    /// Classic doubling backoff.
    pub fn exponential(base: Duration) -> Self {
        Self { base, factor: 2.0 }
    }

    /// `base * factor^(attempt - 1)`. The factor must be finite and strictly positive.
    pub fn scaled(base: Duration, factor: f64) -> Result<Self, ConfigError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::InvalidScalingFactor(factor));
        }
        Ok(Self { base, factor })
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Calculate the delay for a given attempt number (0 = initial subscription, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        scaled_delay(self.base, self.factor, attempt)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::constant(Duration::from_millis(1000))
    }
}

/// Delay before retry number `attempt` (1-indexed).
///
/// Computed in nanoseconds and rounded, so integral factors over whole-millisecond bases are exact.
pub fn scaled_delay(base: Duration, factor: f64, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
    let nanos = (base.as_nanos() as f64) * factor.powi(exponent);
    if !nanos.is_finite() || nanos >= MAX_BACKOFF.as_nanos() as f64 {
        return MAX_BACKOFF;
    }
    if nanos <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(nanos.round() as u64)
}
