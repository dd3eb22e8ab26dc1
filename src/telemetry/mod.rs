//! Telemetry for retrying subscriptions.
//!
//! A retrying stream reports what it decides as `RetryEvent`s. Events flow through
//! `TelemetrySink` implementations which can log, collect, or forward them elsewhere.
//!
//! # Event Types
//!
//! - `Attempt`: a resubscription was scheduled (attempt number and delay)
//! - `Reset`: a forwarded value reset the attempt counter
//! - `Stopped`: retrying stopped; carries the `StopReason`
//! - `Completed` / `Cancelled`: the subscription ended without an error
//!
//! # Telemetry Sinks
//!
//! The `TelemetrySink` trait is a `tower::Service<RetryEvent>`. Streams are polled, not awaited,
//! so events are delivered with [`emit_now`]: best-effort and never blocking the stream.

pub mod events;
pub mod sinks;

pub use events::RetryEvent;
#[cfg(feature = "telemetry-json")]
pub use events::event_to_json;
pub use sinks::{emit_now, FnSink, LogSink, MemorySink, NullSink, TelemetrySink};
