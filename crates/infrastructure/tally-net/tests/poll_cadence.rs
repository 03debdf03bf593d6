use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tally_net::spawn_poll;

#[tokio::test]
async fn slow_fetches_skip_ticks_instead_of_stacking() {
    let started = Arc::new(AtomicU32::new(0));
    let in_flight = Arc::new(AtomicU32::new(0));
    let overlapped = Arc::new(AtomicU32::new(0));

    let cancel = CancellationToken::new();
    let handle = {
        let started = started.clone();
        let in_flight = in_flight.clone();
        let overlapped = overlapped.clone();
        spawn_poll(
            "slow",
            Duration::ZERO,
            Duration::from_millis(25),
            cancel.clone(),
            move || {
                let started = started.clone();
                let in_flight = in_flight.clone();
                let overlapped = overlapped.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlapped.fetch_add(1, Ordering::SeqCst);
                    }
                    // Three times the period.
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            },
        )
    };

    tokio::time::sleep(Duration::from_millis(400)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(
        overlapped.load(Ordering::SeqCst),
        0,
        "fetches must never overlap"
    );
    let total = started.load(Ordering::SeqCst);
    assert!(total >= 3, "loop stalled: only {total} fetches started");
    assert!(
        total <= 8,
        "missed ticks stacked up: {total} fetches in 400ms"
    );
}

#[tokio::test]
async fn failures_are_swallowed_and_the_loop_continues() {
    let calls = Arc::new(AtomicU32::new(0));

    let cancel = CancellationToken::new();
    let handle = {
        let calls = calls.clone();
        spawn_poll(
            "failing",
            Duration::ZERO,
            Duration::from_millis(20),
            cancel.clone(),
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), String>("backend exploded".into())
                }
            },
        )
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(
        calls.load(Ordering::SeqCst) >= 4,
        "a failing fetch must not end the loop"
    );
}

#[tokio::test]
async fn first_fetch_honors_the_initial_delay() {
    let spawned_at = Instant::now();
    let (first_tx, mut first_rx) = tokio::sync::mpsc::channel(4);

    let cancel = CancellationToken::new();
    let _handle = spawn_poll(
        "delayed",
        Duration::from_millis(80),
        Duration::from_millis(40),
        cancel.clone(),
        move || {
            let first_tx = first_tx.clone();
            async move {
                let _ = first_tx.try_send(Instant::now());
                Ok::<(), String>(())
            }
        },
    );

    let first = first_rx.recv().await.unwrap();
    assert!(
        first.duration_since(spawned_at) >= Duration::from_millis(70),
        "first fetch ran before the initial delay elapsed"
    );

    // Later fetches follow the shorter steady period.
    let second = first_rx.recv().await.unwrap();
    assert!(second.duration_since(first) >= Duration::from_millis(30));
    cancel.cancel();
}

#[tokio::test]
async fn cancellation_stops_the_loop() {
    let calls = Arc::new(AtomicU32::new(0));

    let cancel = CancellationToken::new();
    let handle = {
        let calls = calls.clone();
        spawn_poll(
            "stopping",
            Duration::ZERO,
            Duration::from_millis(10),
            cancel.clone(),
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            },
        )
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    handle.await.unwrap();

    let after_cancel = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_cancel);
}
