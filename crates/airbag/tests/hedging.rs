// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "This is a test module")]

//! Integration tests for the hedging engine using only public API.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::Poll;
use std::time::Duration;

use airbag::hedging::{HedgingAttempt, HedgingEngine, HedgingError, HedgingMode};
use airbag::snapshot::{RequestBody, RequestSnapshot};
use airbag::{Recovery, RecoveryInfo, ResilienceContext};
use futures::poll;
use http::{Request, StatusCode};
use tick::{Clock, ClockControl};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Status(StatusCode);

impl Recovery for Status {
    fn recovery(&self) -> RecoveryInfo {
        if self.0.is_server_error() {
            RecoveryInfo::retry()
        } else {
            RecoveryInfo::never()
        }
    }
}

fn engine(clock: &Clock, max_hedged: u32, delay: Duration) -> HedgingEngine<Status> {
    let context = ResilienceContext::new(clock).name("integration");
    HedgingEngine::builder("hedging", &context)
        .recovery()
        .max_hedged_attempts(max_hedged)
        .hedging_mode(HedgingMode::delay(delay))
        .build()
}

/// An attempt that never finishes on its own and counts how often it was cancelled.
async fn stalled(attempt: HedgingAttempt, cancellations: Arc<AtomicU32>) -> Status {
    attempt.cancellation().cancelled().await;
    cancellations.fetch_add(1, Ordering::SeqCst);
    Status(StatusCode::GATEWAY_TIMEOUT)
}

#[tokio::test]
async fn hedge_wins_and_primary_is_cancelled_at_most_once() {
    let control = ClockControl::new();
    let clock = control.to_clock();
    let engine = engine(&clock, 1, Duration::from_millis(500));
    let call_token = CancellationToken::new();
    let primary_token = Arc::new(parking_lot::Mutex::new(None::<CancellationToken>));
    let cancellations = Arc::new(AtomicU32::new(0));

    let mut call = pin!(engine.execute(&call_token, |attempt| {
        let primary_token = Arc::clone(&primary_token);
        let cancellations = Arc::clone(&cancellations);
        async move {
            if attempt.is_primary() {
                *primary_token.lock() = Some(attempt.cancellation().clone());
                stalled(attempt, cancellations).await
            } else {
                Status(StatusCode::OK)
            }
        }
    }));

    assert!(poll!(call.as_mut()).is_pending());
    control.advance(Duration::from_millis(500));

    let Poll::Ready(result) = poll!(call.as_mut()) else {
        panic!("the hedge completes once it is launched");
    };
    let hedged = result.expect("hedge succeeds");

    assert_eq!(hedged.output(), &Status(StatusCode::OK));
    assert_eq!(hedged.attempt(), 2);
    assert_eq!(hedged.cancelled(), 1);
    assert!(primary_token.lock().as_ref().expect("primary ran").is_cancelled());
    assert!(!call_token.is_cancelled());
    assert!(cancellations.load(Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn hedge_is_not_launched_before_delay() {
    let control = ClockControl::new();
    let clock = control.to_clock();
    let engine = engine(&clock, 1, Duration::from_secs(1));
    let launched = AtomicU32::new(0);
    let cancellations = Arc::new(AtomicU32::new(0));

    let token = CancellationToken::new();
    let mut call = pin!(engine.execute(&token, |attempt| {
        launched.fetch_add(1, Ordering::SeqCst);
        stalled(attempt, Arc::clone(&cancellations))
    }));

    assert!(poll!(call.as_mut()).is_pending());
    control.advance(Duration::from_millis(999));
    assert!(poll!(call.as_mut()).is_pending());
    assert_eq!(launched.load(Ordering::SeqCst), 1);

    control.advance(Duration::from_millis(1));
    assert!(poll!(call.as_mut()).is_pending());
    assert_eq!(launched.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhaustion_returns_last_failure_and_attempt_count() {
    let clock = ClockControl::new().to_clock();
    let engine = engine(&clock, 2, Duration::from_secs(10));

    let error = engine
        .execute(&CancellationToken::new(), |attempt| async move {
            if attempt.number() == 3 {
                Status(StatusCode::SERVICE_UNAVAILABLE)
            } else {
                Status(StatusCode::BAD_GATEWAY)
            }
        })
        .await
        .expect_err("every attempt fails");

    assert_eq!(error.attempts(), 3);
    assert_eq!(
        error.to_string(),
        "all 3 hedged attempts completed without an acceptable result"
    );
    assert_eq!(error.into_last(), Some(Status(StatusCode::SERVICE_UNAVAILABLE)));
}

#[tokio::test]
async fn client_errors_are_accepted_as_final() {
    let clock = ClockControl::new().to_clock();
    let engine = engine(&clock, 3, Duration::from_secs(10));
    let launched = AtomicU32::new(0);

    let hedged = engine
        .execute(&CancellationToken::new(), |_| {
            launched.fetch_add(1, Ordering::SeqCst);
            async { Status(StatusCode::NOT_FOUND) }
        })
        .await
        .expect("a 404 is not retried");

    assert_eq!(hedged.into_output(), Status(StatusCode::NOT_FOUND));
    assert_eq!(launched.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelling_the_call_cancels_every_attempt() {
    let clock = ClockControl::new().to_clock();
    let context = ResilienceContext::new(&clock);
    let engine = HedgingEngine::builder("hedging", &context)
        .recovery()
        .max_hedged_attempts(2)
        .hedging_mode(HedgingMode::immediate())
        .build();
    let call_token = CancellationToken::new();
    let tokens = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut call = pin!(engine.execute(&call_token, |attempt: HedgingAttempt| {
        tokens.lock().push(attempt.cancellation().clone());
        async move {
            attempt.cancellation().cancelled().await;
            Status(StatusCode::OK)
        }
    }));

    assert!(poll!(call.as_mut()).is_pending());
    call_token.cancel();

    let Poll::Ready(result) = poll!(call.as_mut()) else {
        panic!("cancellation ends the call");
    };

    assert!(matches!(result, Err(HedgingError::Cancelled { attempts: 3 })));
    assert!(tokens.lock().iter().all(CancellationToken::is_cancelled));
}

#[tokio::test]
async fn attempts_replay_a_shared_snapshot() {
    let clock = ClockControl::new().to_clock();
    let engine = engine(&clock, 2, Duration::from_secs(1));
    let request = Request::post("/checkout")
        .header("idempotency-key", "42")
        .body(RequestBody::from("cart=7"))
        .expect("valid request");
    let snapshot = RequestSnapshot::capture(&request).expect("buffered body is replayable");
    let seen = parking_lot::Mutex::new(Vec::new());

    let hedged = engine
        .execute(&CancellationToken::new(), |attempt| {
            let mut replay = snapshot.to_request();
            replay
                .headers_mut()
                .insert("x-attempt", attempt.number().to_string().parse().expect("digits are a valid header"));
            seen.lock().push(replay);

            async move {
                if attempt.is_primary() {
                    Status(StatusCode::SERVICE_UNAVAILABLE)
                } else {
                    Status(StatusCode::CREATED)
                }
            }
        })
        .await
        .expect("hedge succeeds");

    assert_eq!(hedged.attempt(), 2);

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].headers()["x-attempt"], "1");
    assert_eq!(seen[1].headers()["x-attempt"], "2");
    assert!(seen.iter().all(|r| r.headers()["idempotency-key"] == "42"));
    assert!(snapshot.headers().get("x-attempt").is_none());
}
