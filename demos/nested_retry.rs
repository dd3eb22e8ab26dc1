//! Two retry layers stacked over one source: the outer layer retries what the inner gave up on.
use futures::{stream, StreamExt};
use resubscribe::prelude::*;
use resubscribe::telemetry::FnSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt::init();

    let subscriptions = Arc::new(AtomicUsize::new(0));
    let counter = subscriptions.clone();
    let source = source_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let failure = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        stream::iter(vec![Ok("value"), Err(failure)])
    });

    let inner = RetryWithDelay::new(
        RetryConfig::builder().base_delay(Duration::from_millis(5)).max_attempts(1).build()?,
    )
    .with_sink(FnSink::new(|event| println!("inner: {}", event)));
    let outer = RetryWithDelay::new(
        RetryConfig::builder()
            .base_delay(Duration::from_millis(20))
            .max_attempts(2)
            .scaling_factor(2.0)
            .build()?,
    )
    .with_sink(FnSink::new(|event| println!("outer: {}", event)));

    let mut source = source.retry_with_delay(&inner).retry_with_delay(&outer);
    let items: Vec<_> = source.subscribe().collect().await;

    println!(
        "{} items, {} source subscriptions",
        items.len(),
        subscriptions.load(Ordering::SeqCst)
    );
    Ok(())
}
