use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ScrollOptions;
use crate::events::{Intent, ScrollMetrics};

/// Raises continuation signals when the viewport nears the end of the content.
#[derive(Debug, Clone, Copy)]
pub struct ScrollMonitor {
    bottom_margin: u32,
}

impl ScrollMonitor {
    pub fn new(options: &ScrollOptions) -> Self {
        Self {
            bottom_margin: options.bottom_margin,
        }
    }

    pub fn is_near_bottom(&self, metrics: ScrollMetrics) -> bool {
        let seen = metrics
            .viewport_height
            .saturating_add(metrics.scroll_offset);
        seen >= metrics.content_height.saturating_sub(self.bottom_margin)
    }

    /// Start observing `metrics_rx`. Observation stops when the returned guard
    /// is dropped or `parent` is cancelled.
    pub fn attach(
        self,
        metrics_rx: Receiver<ScrollMetrics>,
        intents_tx: Sender<Intent>,
        parent: &CancellationToken,
    ) -> ScrollGuard {
        let cancel = parent.child_token();
        let handle = tokio::spawn(self.observe(metrics_rx, intents_tx, cancel.clone()));
        ScrollGuard {
            cancel,
            handle: Some(handle),
        }
    }

    async fn observe(
        self,
        mut metrics_rx: Receiver<ScrollMetrics>,
        intents_tx: Sender<Intent>,
        cancel: CancellationToken,
    ) {
        loop {
            select! {
                _ = cancel.cancelled() => break,
                maybe_metrics = metrics_rx.recv() => {
                    let Some(metrics) = maybe_metrics else { break };
                    trace!(?metrics, "scroll");
                    if !self.is_near_bottom(metrics) {
                        continue;
                    }
                    if intents_tx.send(Intent::ContinuationSignal).await.is_err() {
                        debug!("controller gone; scroll monitor stopping");
                        break;
                    }
                }
            }
        }
        debug!("scroll monitor detached");
    }
}

/// Keeps the scroll observation alive; dropping it detaches the monitor.
#[derive(Debug)]
pub struct ScrollGuard {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScrollGuard {
    /// Detach and wait for the observer task to wind down.
    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
