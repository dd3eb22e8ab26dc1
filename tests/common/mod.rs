//! Marble-style test sources on tokio's paused clock.
//!
//! One marble character is one frame (1 ms): `-` is an idle frame, `#` fails the subscription,
//! `|` completes it, any other character is emitted as a value. A marble without `#` or `|`
//! never terminates.
#![allow(dead_code)]

use futures::stream::{self, BoxStream, Stream, StreamExt};
use resubscribe::{Sleeper, StreamSource};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const FRAME: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("marble error (status {code:?})")]
pub struct MarbleError {
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Value(char),
    Error,
    Complete,
}

fn parse(marble: &str) -> Vec<(u32, Token)> {
    marble
        .chars()
        .enumerate()
        .filter(|(_, c)| *c != '-')
        .map(|(frame, c)| {
            let token = match c {
                '#' => Token::Error,
                '|' => Token::Complete,
                other => Token::Value(other),
            };
            (frame as u32, token)
        })
        .collect()
}

pub fn frames_since(epoch: Instant) -> u64 {
    (Instant::now() - epoch).as_millis() as u64
}

/// `(subscribe frame, unsubscribe frame)`; the second is `None` while still subscribed.
pub type Subscription = (u64, Option<u64>);

/// Subscribe/unsubscribe frames of every subscription to a `Cold` source.
#[derive(Debug, Clone)]
pub struct SubscriptionLog {
    epoch: Instant,
    entries: Arc<Mutex<Vec<Subscription>>>,
}

impl SubscriptionLog {
    fn open(&self) -> SubscriptionGuard {
        let mut entries = self.entries.lock().unwrap();
        entries.push((frames_since(self.epoch), None));
        SubscriptionGuard { log: self.clone(), index: entries.len() - 1 }
    }

    pub fn entries(&self) -> Vec<Subscription> {
        self.entries.lock().unwrap().clone()
    }

    /// Subscriptions that have not been released.
    pub fn live(&self) -> usize {
        self.entries.lock().unwrap().iter().filter(|(_, end)| end.is_none()).count()
    }
}

struct SubscriptionGuard {
    log: SubscriptionLog,
    index: usize,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let now = frames_since(self.log.epoch);
        self.log.entries.lock().unwrap()[self.index].1 = Some(now);
    }
}

struct ColdState {
    tokens: Arc<Vec<(u32, Token)>>,
    next: usize,
    start: Instant,
    error: MarbleError,
    done: bool,
    _guard: SubscriptionGuard,
}

/// A source that replays the same marble on every subscription, timed from the subscribe call.
#[derive(Debug, Clone)]
pub struct Cold {
    tokens: Arc<Vec<(u32, Token)>>,
    error: MarbleError,
    log: SubscriptionLog,
}

impl Cold {
    pub fn new(marble: &str, epoch: Instant) -> Self {
        Self::with_error(marble, MarbleError { code: None }, epoch)
    }

    pub fn with_error(marble: &str, error: MarbleError, epoch: Instant) -> Self {
        Self {
            tokens: Arc::new(parse(marble)),
            error,
            log: SubscriptionLog { epoch, entries: Arc::new(Mutex::new(Vec::new())) },
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.log.entries()
    }

    pub fn live_subscriptions(&self) -> usize {
        self.log.live()
    }
}

impl StreamSource for Cold {
    type Stream = BoxStream<'static, Result<char, MarbleError>>;

    fn subscribe(&mut self) -> Self::Stream {
        let state = ColdState {
            tokens: self.tokens.clone(),
            next: 0,
            start: Instant::now(),
            error: self.error.clone(),
            done: false,
            _guard: self.log.open(),
        };
        stream::unfold(state, |mut st| async move {
            if st.done {
                return None;
            }
            let Some(&(frame, token)) = st.tokens.get(st.next) else {
                futures::future::pending::<()>().await;
                return None;
            };
            tokio::time::sleep_until(st.start + FRAME * frame).await;
            st.next += 1;
            match token {
                Token::Value(c) => Some((Ok(c), st)),
                Token::Error => {
                    st.done = true;
                    let error = st.error.clone();
                    Some((Err(error), st))
                }
                Token::Complete => None,
            }
        })
        .boxed()
    }
}

/// What the consumer observed, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    Value(char),
    Error,
    Complete,
}

/// Drain `stream`, stamping every notification with its frame.
pub async fn record<S>(stream: S, epoch: Instant) -> Vec<(u64, Note)>
where
    S: Stream<Item = Result<char, MarbleError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut notes = Vec::new();
    while let Some(item) = stream.next().await {
        let note = match item {
            Ok(c) => Note::Value(c),
            Err(_) => Note::Error,
        };
        notes.push((frames_since(epoch), note));
    }
    if notes.last().map(|(_, n)| *n != Note::Error).unwrap_or(true) {
        notes.push((frames_since(epoch), Note::Complete));
    }
    notes
}

/// Render notifications back into a marble, one character per frame.
pub fn marble(notes: &[(u64, Note)]) -> String {
    let len = notes.last().map(|(frame, _)| *frame as usize + 1).unwrap_or(0);
    let mut frames = vec!['-'; len];
    for (frame, note) in notes {
        let slot = &mut frames[*frame as usize];
        assert_eq!(*slot, '-', "two notifications in frame {}", frame);
        *slot = match note {
            Note::Value(c) => *c,
            Note::Error => '#',
            Note::Complete => '|',
        };
    }
    frames.into_iter().collect()
}

/// Tokio-backed sleeper that counts timers still alive (pending and not dropped).
#[derive(Debug, Clone, Default)]
pub struct CountingSleeper {
    live: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

impl CountingSleeper {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

struct LiveTimer(Arc<AtomicUsize>);

impl Drop for LiveTimer {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        let timer = LiveTimer(self.live.clone());
        Box::pin(async move {
            let _timer = timer;
            tokio::time::sleep(duration).await;
        })
    }
}
