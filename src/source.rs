//! Resubscribable stream sources.
//!
//! A `Stream` value is a single subscription: once it errors or ends it cannot be restarted. A
//! `StreamSource` is the thing that hands out fresh subscriptions, which is what a retrying
//! consumer needs to hold on to.
//!
//! Items follow the `Result` convention: `Ok(value)` is an emission, `Err(error)` terminates the
//! subscription with a failure and `None` terminates it normally.

use futures::Stream;

/// Produces a fresh subscription on every call.
pub trait StreamSource {
    /// The subscription type.
    type Stream: Stream;

    /// Start a new, independent subscription.
    fn subscribe(&mut self) -> Self::Stream;
}

impl<S> StreamSource for &mut S
where
    S: StreamSource + ?Sized,
{
    type Stream = S::Stream;

    fn subscribe(&mut self) -> Self::Stream {
        (**self).subscribe()
    }
}

impl<S> StreamSource for Box<S>
where
    S: StreamSource + ?Sized,
{
    type Stream = S::Stream;

    fn subscribe(&mut self) -> Self::Stream {
        (**self).subscribe()
    }
}

/// `StreamSource` backed by a closure. See [`source_fn`].
#[derive(Clone, Copy)]
pub struct FnSource<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource").field("f", &"<fn>").finish()
    }
}

impl<F, St> StreamSource for FnSource<F>
where
    F: FnMut() -> St,
    St: Stream,
{
    type Stream = St;

    fn subscribe(&mut self) -> Self::Stream {
        (self.f)()
    }
}

/// Build a source whose subscriptions are produced by calling `f`.
///
/// ```rust
/// use futures::stream;
/// use resubscribe::{source_fn, StreamSource};
///
/// let mut source = source_fn(|| stream::iter(vec![Ok::<_, std::io::Error>(1), Ok(2)]));
/// let _first = source.subscribe();
/// let _second = source.subscribe();
/// ```
pub fn source_fn<F, St>(f: F) -> FnSource<F>
where
    F: FnMut() -> St,
    St: Stream,
{
    FnSource { f }
}
