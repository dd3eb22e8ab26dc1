use crate::policy::StopReason;
use std::fmt;
use std::time::Duration;

#[cfg(feature = "telemetry-json")]
use serde_json::json;

/// Events emitted by a retrying subscription.
///
/// Every subscription ends with exactly one of `Completed`, `Stopped` or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// A resubscription has been scheduled.
    ///
    /// Emitted when the timer starts, before the delay elapses.
    Attempt {
        /// The attempt number (1-indexed)
        attempt: usize,
        /// The delay before resubscribing
        delay: Duration,
    },
    /// A forwarded value reset the attempt counter.
    Reset {
        /// Attempts consumed before the reset
        discarded: usize,
    },
    /// Retrying stopped and the source error was forwarded downstream.
    Stopped {
        /// Which rule stopped retrying
        reason: StopReason,
    },
    /// The source completed normally.
    Completed,
    /// Downstream cancelled the subscription.
    Cancelled,
}

impl RetryEvent {
    /// True for the event that ends a subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryEvent::Stopped { .. } | RetryEvent::Completed | RetryEvent::Cancelled)
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Attempt { attempt, delay } => {
                write!(f, "Attempt(#{}, delay={:?})", attempt, delay)
            }
            RetryEvent::Reset { discarded } => write!(f, "Reset(discarded={})", discarded),
            RetryEvent::Stopped { reason } => write!(f, "Stopped({})", reason),
            RetryEvent::Completed => write!(f, "Completed"),
            RetryEvent::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg_attr(not(feature = "telemetry-json"), allow(dead_code))]
#[inline]
fn clamp_u64(val: u128) -> u64 {
    val.min(u128::from(u64::MAX)) as u64
}

/// Convert a RetryEvent into a JSON value for sinks.
#[cfg(feature = "telemetry-json")]
pub fn event_to_json(event: &RetryEvent) -> serde_json::Value {
    match event {
        RetryEvent::Attempt { attempt, delay } => json!({
            "kind": "retry_attempt",
            "attempt": *attempt,
            "delay_ms": clamp_u64(delay.as_millis()),
        }),
        RetryEvent::Reset { discarded } => json!({
            "kind": "retry_reset",
            "discarded": *discarded,
        }),
        RetryEvent::Stopped { reason } => match reason {
            StopReason::ExcludedStatusCode { code, attempt } => json!({
                "kind": "retry_stopped",
                "reason": "excluded_status_code",
                "code": *code,
                "attempt": *attempt,
            }),
            StopReason::Exhausted { max_attempts } => json!({
                "kind": "retry_stopped",
                "reason": "exhausted",
                "max_attempts": *max_attempts,
            }),
        },
        RetryEvent::Completed => json!({ "kind": "stream_completed" }),
        RetryEvent::Cancelled => json!({ "kind": "stream_cancelled" }),
    }
}
