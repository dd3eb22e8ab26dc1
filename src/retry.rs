//! Retry-with-delay operator for stream sources.
//!
//! `RetryWithDelay` is the configured decorator. It is cheap to clone and holds no per-subscription
//! state: every call to [`RetryWithDelay::apply`] (or every `subscribe()` on a [`Retrying`]
//! source) starts from a fresh attempt counter.
//!
//! Semantics:
//! - Values pass through unchanged and in source order.
//! - On a source error the attempt counter is incremented; excluded status codes and an exhausted
//!   budget surface the error, anything else resubscribes after `delay * factor^(attempt - 1)`.
//! - With `reset_on_emission`, each forwarded value returns the counter to zero.
//! - The sleeper controls how delays are applied (production uses `TokioSleeper`; tests can inject
//!   `InstantSleeper`/`TrackingSleeper`).
//!
//! Example
//! ```rust
//! use futures::{stream, StreamExt};
//! use resubscribe::{source_fn, InstantSleeper, RetryConfig, RetryWithDelay};
//!
//! #[derive(Debug)]
//! struct HttpError { status: i32 }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let retry = RetryWithDelay::new(
//!     RetryConfig::builder().max_attempts(2).exclude_status_code(404).build().unwrap(),
//! )
//! .status_code(|e: &HttpError| Some(e.status))
//! .with_sleeper(InstantSleeper);
//!
//! let source = source_fn(|| stream::iter(vec![Ok(1), Err(HttpError { status: 503 })]));
//! let items: Vec<_> = retry.apply(source).collect().await;
//! assert_eq!(items.len(), 4); // three subscriptions, last error surfaced
//! assert!(items[3].is_err());
//! # });
//! ```

use crate::config::{RetryConfig, RetryOptions};
use crate::error::ConfigError;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::source::StreamSource;
use crate::stream::RetryStream;
use crate::telemetry::{NullSink, RetryEvent, TelemetrySink};
use futures::Stream;
use std::fmt;
use std::sync::Arc;
use tower::Service;
use tower_layer::Layer;

/// Reads the status code carried by an error, if any.
pub type StatusCodeFn<E> = Arc<dyn Fn(&E) -> Option<i32> + Send + Sync>;

/// Retry operator combining configuration, status-code classifier, sleeper and telemetry sink.
pub struct RetryWithDelay<E, K = NullSink> {
    pub(crate) config: Arc<RetryConfig>,
    pub(crate) status_code: Option<StatusCodeFn<E>>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) sink: K,
}

impl<E> RetryWithDelay<E> {
    /// Operator with the given configuration, no status codes, tokio timers and no telemetry.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
            status_code: None,
            sleeper: Arc::new(TokioSleeper),
            sink: NullSink,
        }
    }

    /// Operator built from the flat option surface.
    pub fn from_options(options: RetryOptions) -> Result<Self, ConfigError> {
        Ok(Self::new(RetryConfig::try_from(options)?))
    }
}

impl<E> Default for RetryWithDelay<E> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<E, K> RetryWithDelay<E, K> {
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Tell the operator how to read a status code from `E`, for exclusion checks.
    pub fn status_code<F>(mut self, classify: F) -> Self
    where
        F: Fn(&E) -> Option<i32> + Send + Sync + 'static,
    {
        self.status_code = Some(Arc::new(classify));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Report `RetryEvent`s to `sink`. Each subscription gets its own clone.
    pub fn with_sink<K2>(self, sink: K2) -> RetryWithDelay<E, K2>
    where
        K2: TelemetrySink,
    {
        RetryWithDelay {
            config: self.config,
            status_code: self.status_code,
            sleeper: self.sleeper,
            sink,
        }
    }

    /// Decorate a single subscription of `source`.
    pub fn apply<Src>(&self, source: Src) -> RetryStream<Src, E, K>
    where
        Src: StreamSource,
        K: Service<RetryEvent, Response = ()> + Clone,
    {
        RetryStream::new(source, self.clone())
    }
}

impl<E, K: Clone> Clone for RetryWithDelay<E, K> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            status_code: self.status_code.clone(),
            sleeper: self.sleeper.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<E, K: fmt::Debug> fmt::Debug for RetryWithDelay<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryWithDelay")
            .field("config", &self.config)
            .field("status_code", &"<classifier>")
            .field("sleeper", &self.sleeper)
            .field("sink", &self.sink)
            .finish()
    }
}

/// A source whose every subscription is retried. Produced by `RetryWithDelay` as a tower `Layer`.
pub struct Retrying<Src, E, K = NullSink> {
    source: Src,
    retry: RetryWithDelay<E, K>,
}

impl<Src, E, K> Retrying<Src, E, K> {
    pub fn get_ref(&self) -> &Src {
        &self.source
    }

    pub fn into_inner(self) -> Src {
        self.source
    }
}

impl<Src: Clone, E, K: Clone> Clone for Retrying<Src, E, K> {
    fn clone(&self) -> Self {
        Self { source: self.source.clone(), retry: self.retry.clone() }
    }
}

impl<Src: fmt::Debug, E, K: fmt::Debug> fmt::Debug for Retrying<Src, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying").field("source", &self.source).field("retry", &self.retry).finish()
    }
}

impl<Src, T, E, K> StreamSource for Retrying<Src, E, K>
where
    Src: StreamSource + Clone,
    Src::Stream: Stream<Item = Result<T, E>>,
    K: Service<RetryEvent, Response = ()> + Clone,
{
    type Stream = RetryStream<Src, E, K>;

    fn subscribe(&mut self) -> Self::Stream {
        self.retry.apply(self.source.clone())
    }
}

impl<Src, E, K: Clone> Layer<Src> for RetryWithDelay<E, K> {
    type Service = Retrying<Src, E, K>;

    fn layer(&self, source: Src) -> Self::Service {
        Retrying { source, retry: self.clone() }
    }
}

/// Method-chaining entry point for sources.
pub trait StreamSourceExt: StreamSource + Sized {
    /// Retry every subscription of this source with `retry`.
    fn retry_with_delay<E, K>(self, retry: &RetryWithDelay<E, K>) -> Retrying<Self, E, K>
    where
        K: Clone,
    {
        retry.layer(self)
    }
}

impl<S: StreamSource> StreamSourceExt for S {}
