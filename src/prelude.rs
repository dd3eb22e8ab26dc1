//! Convenient re-exports for common types.
pub use crate::{
    backoff::{Backoff, MAX_BACKOFF},
    config::{RetryConfig, RetryOptions},
    policy::StopReason,
    retry::{RetryWithDelay, Retrying, StreamSourceExt},
    sleeper::{Sleeper, TokioSleeper},
    source::{source_fn, StreamSource},
    stream::{RetryStream, Termination},
    telemetry::{LogSink, MemorySink, RetryEvent},
    ConfigError,
};
