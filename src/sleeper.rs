//! The retry timer.
//!
//! A retrying stream asks its `Sleeper` for one timer per scheduled resubscription and holds it
//! while in the `AwaitingRetry` phase. The timer fires by resolving; it is cancelled by being
//! dropped, which happens when the stream is cancelled or dropped before the delay elapses.

use futures::future;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One-shot timer factory used between a failed subscription and the next one.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// A future that resolves once `duration` has elapsed. Zero delays are still requested here.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Timers on the tokio runtime clock. Honors `tokio::time::pause`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Resubscribes immediately, whatever the computed delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(future::ready(()))
    }
}

/// Resubscribes immediately and remembers the delay schedule it was asked for.
///
/// Clones share the same record, so a clone handed to `RetryWithDelay::with_sleeper` can be
/// inspected through the original.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    fn delays(&self) -> MutexGuard<'_, Vec<Duration>> {
        self.delays.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requested delays, oldest first.
    pub fn calls(&self) -> Vec<Duration> {
        self.delays().clone()
    }

    /// Sum of every requested delay: the time a real timer would have spent waiting.
    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }

    pub fn clear(&self) {
        self.delays().clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.delays().push(duration);
        Box::pin(future::ready(()))
    }
}
