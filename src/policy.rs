//! Retry decision logic.
//!
//! Semantics:
//! - Every source error consumes one attempt *before* any check, so the `n`th retry is attempt `n`
//!   (1-indexed).
//! - An error whose status code is excluded stops retrying regardless of the remaining budget.
//! - Otherwise retrying stops once the attempt count exceeds `max_attempts`.
//! - With `reset_on_emission`, every forwarded value returns the counter to zero, so the budget
//!   bounds each run of consecutive failures rather than the whole subscription.
//!
//! Invariants:
//! - A `Retry` decision never carries an attempt greater than `max_attempts`.
//! - The stored counter never exceeds `max_attempts`, including after a `Stop`.
//! - The delay of attempt `n` is `base * factor^(n - 1)`.

use crate::config::RetryConfig;
use std::fmt;
use std::time::Duration;

/// Why a subscription stopped retrying and surfaced the source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The error carried a status code listed as excluded.
    ExcludedStatusCode {
        /// The excluded code
        code: i32,
        /// Attempt number consumed by this error
        attempt: usize,
    },
    /// The retry budget was exhausted.
    Exhausted {
        /// Configured budget
        max_attempts: usize,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ExcludedStatusCode { code, attempt } => {
                write!(f, "status code {} is excluded from retry (attempt {})", code, attempt)
            }
            StopReason::Exhausted { max_attempts } => {
                write!(f, "retry budget of {} attempts exhausted", max_attempts)
            }
        }
    }
}

/// Outcome of evaluating the policy against one source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resubscribe after `delay`.
    Retry { attempt: usize, delay: Duration },
    /// Surface the error downstream.
    Stop(StopReason),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Attempt counter owned by a single subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempts: usize,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts consumed since subscription start or the last reset. Never above `max_attempts`.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Consume an attempt for a source error and decide what happens next.
    ///
    /// The attempt is counted before any check. When the decision is `Stop`, the stored counter is
    /// clamped back to `max_attempts`; the consumed attempt number is still reported in the
    /// `ExcludedStatusCode` reason.
    pub fn on_error(&mut self, config: &RetryConfig, status_code: Option<i32>) -> RetryDecision {
        let attempt = self.attempts.saturating_add(1);

        let stop = if let Some(code) = status_code.filter(|code| config.is_excluded(*code)) {
            StopReason::ExcludedStatusCode { code, attempt }
        } else if attempt > config.max_attempts() {
            StopReason::Exhausted { max_attempts: config.max_attempts() }
        } else {
            self.attempts = attempt;
            return RetryDecision::Retry { attempt, delay: config.delay_for(attempt) };
        };
        self.attempts = attempt.min(config.max_attempts());
        RetryDecision::Stop(stop)
    }

    /// Record a forwarded value. Returns the discarded count when the counter was reset.
    pub fn on_emission(&mut self, config: &RetryConfig) -> Option<usize> {
        if !config.reset_on_emission() || self.attempts == 0 {
            return None;
        }
        Some(std::mem::take(&mut self.attempts))
    }
}
