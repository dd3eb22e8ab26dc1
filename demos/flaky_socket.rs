//! A feed that drops every few messages, kept alive by resubscribing with backoff.
use futures::{stream, StreamExt};
use resubscribe::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("connection dropped (status {status})")]
struct Dropped {
    status: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let config = RetryConfig::builder()
        .base_delay(Duration::from_millis(50))
        .scaling_factor(2.0)
        .max_attempts(4)
        .exclude_status_code(401)
        .reset_on_emission(true)
        .build()?;
    let retry = RetryWithDelay::new(config)
        .status_code(|e: &Dropped| Some(e.status))
        .with_sink(LogSink);

    let connections = Arc::new(AtomicUsize::new(0));
    let source = source_fn(move || {
        let n = connections.fetch_add(1, Ordering::SeqCst) + 1;
        // the fifth connection is refused outright
        let status = if n == 5 { 401 } else { 503 };
        let ticks = if n == 5 { 0 } else { 3 };
        stream::iter((0..ticks).map(move |i| Ok(format!("conn {} tick {}", n, i))))
            .chain(stream::once(async move { Err(Dropped { status }) }))
            .then(|item| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                item
            })
    });

    let mut feed = Box::pin(retry.apply(source));
    while let Some(item) = feed.next().await {
        match item {
            Ok(message) => println!("{}", message),
            Err(err) => println!("gave up: {}", err),
        }
    }
    println!("ended: {:?}", feed.termination());
    Ok(())
}
