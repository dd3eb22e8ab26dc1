//! Excluded status codes stop retrying immediately.
mod common;

use common::{marble, record, Cold, MarbleError};
use resubscribe::{RetryConfig, RetryWithDelay, StopReason, Termination};
use std::time::Duration;
use tokio::time::Instant;

fn retry(excluded: &[i32]) -> RetryWithDelay<MarbleError> {
    RetryWithDelay::new(
        RetryConfig::builder()
            .base_delay(Duration::from_millis(1))
            .max_attempts(3)
            .excluded_status_codes(excluded.iter().copied())
            .build()
            .expect("valid config"),
    )
    .status_code(|e: &MarbleError| e.code)
}

#[tokio::test(start_paused = true)]
async fn excluded_code_surfaces_on_first_failure() {
    let epoch = Instant::now();
    let source = Cold::with_error("--a-#", MarbleError { code: Some(404) }, epoch);

    let notes = record(retry(&[401, 404]).apply(source.clone()), epoch).await;

    assert_eq!(marble(&notes), "--a-#");
    assert_eq!(source.subscriptions(), vec![(0, Some(4))]);
}

#[tokio::test(start_paused = true)]
async fn zero_is_a_valid_status_code() {
    let epoch = Instant::now();
    let source = Cold::with_error("-#", MarbleError { code: Some(0) }, epoch);
    let mut stream = Box::pin(retry(&[0]).apply(source.clone()));

    let notes = record(stream.as_mut(), epoch).await;

    assert_eq!(marble(&notes), "-#");
    assert_eq!(
        stream.termination(),
        Some(Termination::Failed(StopReason::ExcludedStatusCode { code: 0, attempt: 1 }))
    );
}

#[tokio::test(start_paused = true)]
async fn other_codes_are_retried() {
    let epoch = Instant::now();
    let source = Cold::with_error("-#", MarbleError { code: Some(503) }, epoch);

    let notes = record(retry(&[404]).apply(source.clone()), epoch).await;

    // 1 ms between each of the four subscriptions
    assert_eq!(marble(&notes), "-------#");
    assert_eq!(source.subscriptions().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn errors_without_a_code_are_retried() {
    let epoch = Instant::now();
    let source = Cold::new("-#", epoch);

    let notes = record(retry(&[0, 404]).apply(source.clone()), epoch).await;

    assert_eq!(marble(&notes), "-------#");
    assert_eq!(source.subscriptions(), vec![(0, Some(1)), (2, Some(3)), (4, Some(5)), (6, Some(7))]);
}
