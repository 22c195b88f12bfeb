use std::time::Duration;

use photo_browser::config::ScrollOptions;
use photo_browser::events::{Intent, ScrollMetrics};
use photo_browser::tasks::scroll::ScrollMonitor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn at(scroll_offset: u32) -> ScrollMetrics {
    ScrollMetrics {
        viewport_height: 200,
        scroll_offset,
        content_height: 1000,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn raises_signal_only_near_bottom() {
    let (metrics_tx, metrics_rx) = mpsc::channel(8);
    let (intents_tx, mut intents_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let guard = ScrollMonitor::new(&ScrollOptions { bottom_margin: 10 }).attach(
        metrics_rx,
        intents_tx,
        &cancel,
    );

    metrics_tx.send(at(100)).await.unwrap();
    metrics_tx.send(at(789)).await.unwrap();
    let none = tokio::time::timeout(Duration::from_millis(200), intents_rx.recv()).await;
    assert!(none.is_err(), "no signal expected far from the bottom");

    metrics_tx.send(at(790)).await.unwrap();
    let signal = tokio::time::timeout(Duration::from_secs(1), intents_rx.recv())
        .await
        .expect("timeout waiting for signal")
        .expect("monitor closed");
    assert_eq!(signal, Intent::ContinuationSignal);

    // Every qualifying scroll event raises again; the controller decides.
    metrics_tx.send(at(800)).await.unwrap();
    let again = tokio::time::timeout(Duration::from_secs(1), intents_rx.recv())
        .await
        .expect("timeout waiting for second signal");
    assert_eq!(again, Some(Intent::ContinuationSignal));

    assert!(guard.is_attached());
    guard.detach().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_guard_releases_observation() {
    let (metrics_tx, metrics_rx) = mpsc::channel(8);
    let (intents_tx, _intents_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let guard = ScrollMonitor::new(&ScrollOptions::default()).attach(
        metrics_rx,
        intents_tx,
        &cancel,
    );

    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), metrics_tx.closed())
        .await
        .expect("monitor should release its receiver once detached");
    assert!(!cancel.is_cancelled(), "detaching must not cancel the parent");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parent_cancellation_detaches() {
    let (metrics_tx, metrics_rx) = mpsc::channel(8);
    let (intents_tx, _intents_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let _guard = ScrollMonitor::new(&ScrollOptions::default()).attach(
        metrics_rx,
        intents_tx,
        &cancel,
    );

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), metrics_tx.closed())
        .await
        .expect("monitor should stop with its parent");
}
