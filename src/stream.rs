//! The retrying subscription.
//!
//! `RetryStream` drives one downstream subscription through three phases:
//!
//! - `Subscribed`: attached to a source subscription, forwarding every value unchanged.
//! - `AwaitingRetry`: the source failed with a retryable error; a timer is pending.
//! - `Terminal`: completed, failed, or cancelled. Yields `None` forever.
//!
//! Before the first poll the stream is `Idle` and owns nothing; the source is subscribed lazily.
//!
//! Invariants:
//! - At most one of {source subscription, timer} is alive at any instant. The previous resource
//!   is dropped before the next one is acquired.
//! - A source error never reaches the consumer unless retrying stopped, and then it is the
//!   source's own error, unwrapped.
//! - Cancellation (`cancel` or drop) releases the live resource before returning; a cancelled
//!   stream never resubscribes or yields again.

use crate::policy::{RetryDecision, RetryState, StopReason};
use crate::retry::RetryWithDelay;
use crate::source::StreamSource;
use crate::telemetry::{emit_now, RetryEvent};
use futures::ready;
use futures::stream::{FusedStream, Stream};
use pin_project::{pin_project, pinned_drop};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::Service;

/// How a retrying subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The source completed normally.
    Completed,
    /// A source error was forwarded; carries the rule that stopped retrying.
    Failed(StopReason),
    /// Downstream cancelled.
    Cancelled,
}

/// Observable phase of a `RetryStream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not polled yet; no source subscription exists.
    Idle,
    /// Attached to a live source subscription.
    Subscribed,
    /// The source failed; a retry timer is pending.
    AwaitingRetry,
    /// Completed, failed or cancelled. Owns nothing.
    Terminal,
}

#[pin_project(project = StateProj)]
enum State<St> {
    Idle,
    Subscribed {
        #[pin]
        stream: St,
    },
    AwaitingRetry {
        timer: Pin<Box<dyn Future<Output = ()> + Send>>,
    },
    Terminal,
}

impl<St> State<St> {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Subscribed { .. } => Phase::Subscribed,
            State::AwaitingRetry { .. } => Phase::AwaitingRetry,
            State::Terminal => Phase::Terminal,
        }
    }
}

enum Step<I> {
    Subscribe,
    Source(Option<I>),
}

/// Stream returned by [`RetryWithDelay::apply`].
#[pin_project(PinnedDrop)]
pub struct RetryStream<Src, E, K>
where
    Src: StreamSource,
    K: Service<RetryEvent, Response = ()>,
{
    source: Src,
    #[pin]
    state: State<Src::Stream>,
    attempts: RetryState,
    retry: RetryWithDelay<E, K>,
    termination: Option<Termination>,
}

impl<Src, E, K> RetryStream<Src, E, K>
where
    Src: StreamSource,
    K: Service<RetryEvent, Response = ()>,
{
    pub(crate) fn new(source: Src, retry: RetryWithDelay<E, K>) -> Self {
        Self { source, state: State::Idle, attempts: RetryState::new(), retry, termination: None }
    }

    /// Which resource, if any, the stream currently holds.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Attempts consumed since the start of the subscription or the last reset.
    ///
    /// Bounded by `max_attempts`: after `StopReason::Exhausted` this reads `max_attempts`.
    pub fn attempts(&self) -> usize {
        self.attempts.attempts()
    }

    /// `None` while the subscription is still running.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Stop the subscription, releasing the live source subscription or timer.
    ///
    /// Idempotent; a no-op once the stream has terminated.
    pub fn cancel(self: Pin<&mut Self>) {
        let mut this = self.project();
        if this.termination.is_some() {
            return;
        }
        this.state.set(State::Terminal);
        *this.termination = Some(Termination::Cancelled);
        tracing::debug!(attempts = this.attempts.attempts(), "retrying stream cancelled");
        emit_now(&mut this.retry.sink, RetryEvent::Cancelled);
    }
}

impl<Src, T, E, K> Stream for RetryStream<Src, E, K>
where
    Src: StreamSource,
    Src::Stream: Stream<Item = Result<T, E>>,
    K: Service<RetryEvent, Response = ()>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            let step = match this.state.as_mut().project() {
                StateProj::Idle => Step::Subscribe,
                StateProj::Subscribed { stream } => Step::Source(ready!(stream.poll_next(cx))),
                StateProj::AwaitingRetry { timer } => {
                    ready!(timer.as_mut().poll(cx));
                    Step::Subscribe
                }
                StateProj::Terminal => return Poll::Ready(None),
            };

            match step {
                Step::Subscribe => {
                    // release the fired timer before opening the next subscription
                    this.state.set(State::Terminal);
                    let stream = this.source.subscribe();
                    this.state.set(State::Subscribed { stream });
                }
                Step::Source(Some(Ok(value))) => {
                    if let Some(discarded) = this.attempts.on_emission(&this.retry.config) {
                        tracing::trace!(discarded, "retry counter reset by emission");
                        emit_now(&mut this.retry.sink, RetryEvent::Reset { discarded });
                    }
                    return Poll::Ready(Some(Ok(value)));
                }
                Step::Source(Some(Err(error))) => {
                    this.state.set(State::Terminal);
                    let status_code =
                        this.retry.status_code.as_ref().and_then(|classify| classify(&error));
                    match this.attempts.on_error(&this.retry.config, status_code) {
                        RetryDecision::Retry { attempt, delay } => {
                            tracing::debug!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "source failed; resubscribing after delay"
                            );
                            emit_now(&mut this.retry.sink, RetryEvent::Attempt { attempt, delay });
                            let timer = this.retry.sleeper.sleep(delay);
                            this.state.set(State::AwaitingRetry { timer });
                        }
                        RetryDecision::Stop(reason) => {
                            tracing::debug!(%reason, "source failed; retrying stopped");
                            *this.termination = Some(Termination::Failed(reason));
                            emit_now(&mut this.retry.sink, RetryEvent::Stopped { reason });
                            return Poll::Ready(Some(Err(error)));
                        }
                    }
                }
                Step::Source(None) => {
                    this.state.set(State::Terminal);
                    *this.termination = Some(Termination::Completed);
                    emit_now(&mut this.retry.sink, RetryEvent::Completed);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<Src, T, E, K> FusedStream for RetryStream<Src, E, K>
where
    Src: StreamSource,
    Src::Stream: Stream<Item = Result<T, E>>,
    K: Service<RetryEvent, Response = ()>,
{
    fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }
}

#[pinned_drop]
impl<Src, E, K> PinnedDrop for RetryStream<Src, E, K>
where
    Src: StreamSource,
    K: Service<RetryEvent, Response = ()>,
{
    fn drop(self: Pin<&mut Self>) {
        self.cancel();
    }
}

impl<Src, E, K> fmt::Debug for RetryStream<Src, E, K>
where
    Src: StreamSource,
    K: Service<RetryEvent, Response = ()>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStream")
            .field("phase", &self.phase())
            .field("attempts", &self.attempts.attempts())
            .field("termination", &self.termination)
            .finish()
    }
}
