#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # resubscribe
//!
//! Retry-with-backoff for async streams. Wrap a source of subscriptions and a failing
//! subscription is transparently replaced by a fresh one after a computed delay, up to a retry
//! budget, instead of surfacing the error to every consumer.
//!
//! ## Features
//!
//! - **Exponential delays**: `delay * factor^(attempt - 1)`
//! - **Retry budget** per failure episode, optionally restored by every emitted value
//! - **Excluded status codes** that are never retried
//! - **Cancellation** by drop or `cancel()`, releasing the live subscription or timer
//! - **Telemetry** as `RetryEvent`s delivered to tower-service sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use futures::{stream, StreamExt};
//! use resubscribe::{source_fn, RetryConfig, RetryWithDelay};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let retry = RetryWithDelay::new(
//!         RetryConfig::builder()
//!             .base_delay(Duration::from_millis(10))
//!             .max_attempts(3)
//!             .scaling_factor(2.0)
//!             .build()
//!             .unwrap(),
//!     );
//!
//!     let source = source_fn(|| stream::iter(vec![Ok::<_, std::io::Error>("tick")]));
//!     let values: Vec<_> = retry.apply(source).collect().await;
//!     assert_eq!(values.len(), 1);
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod retry;
pub mod sleeper;
pub mod source;
pub mod stream;
pub mod telemetry;

// Re-exports
pub use backoff::{Backoff, MAX_BACKOFF};
pub use config::{RetryConfig, RetryConfigBuilder, RetryOptions};
pub use error::ConfigError;
pub use policy::{RetryDecision, RetryState, StopReason};
pub use retry::{RetryWithDelay, Retrying, StatusCodeFn, StreamSourceExt};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use source::{source_fn, FnSource, StreamSource};
pub use stream::{Phase, RetryStream, Termination};
