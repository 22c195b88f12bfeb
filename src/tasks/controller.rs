use std::sync::Arc;

use anyhow::Result;
use photo_model::Photo;
use tokio::select;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::PhotoApi;
use crate::error::FetchError;
use crate::events::{Intent, PageRequest};
use crate::feed::{FeedController, FeedSnapshot};

struct PageFetched {
    id: u64,
    result: Result<Vec<Photo>, FetchError>,
}

/// Owns the feed state machine and executes the requests it issues.
///
/// Rules:
/// - Mount on start: exactly one feed fetch for page 1.
/// - Intents are applied in arrival order; each may issue one request.
/// - Only one fetch task exists at a time; issuing a new request aborts the
///   previous task, and any completion it still delivers is dropped as stale.
/// - Subscribers see a new snapshot only when the state actually changed.
pub async fn run<A: PhotoApi>(
    api: Arc<A>,
    mut intents: Receiver<Intent>,
    state_tx: watch::Sender<FeedSnapshot>,
    initial_query: Option<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let (done_tx, mut done_rx) = mpsc::channel::<PageFetched>(4);
    let mut feed = FeedController::new();
    let mut fetcher = Fetcher {
        api,
        done_tx,
        current: None,
    };

    if let Some(request) = feed.mount() {
        fetcher.launch(request).await;
    }
    if let Some(query) = initial_query {
        feed.on_query_input(query.clone());
        if let Some(request) = feed.on_query_submit(query) {
            fetcher.launch(request).await;
        }
    }
    publish(&state_tx, &feed);

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_intent = intents.recv() => {
                let Some(intent) = maybe_intent else {
                    debug!("intent channel closed; controller stopping");
                    break;
                };
                if let Some(request) = apply(&mut feed, intent) {
                    fetcher.launch(request).await;
                }
            }

            Some(PageFetched { id, result }) = done_rx.recv() => {
                let completion = feed.complete(id, result);
                fetcher.finished(id);
                debug!(id, ?completion, "fetch completed");
            }
        }
        publish(&state_tx, &feed);
    }

    fetcher.abort().await;
    Ok(())
}

fn apply(feed: &mut FeedController, intent: Intent) -> Option<PageRequest> {
    match intent {
        Intent::QueryInput(text) => {
            feed.on_query_input(text);
            None
        }
        Intent::QuerySubmit(query) => feed.on_query_submit(query),
        Intent::ClearSearch => feed.clear_search(),
        Intent::ContinuationSignal => feed.on_continuation_signal(),
    }
}

fn publish(state_tx: &watch::Sender<FeedSnapshot>, feed: &FeedController) {
    let next = feed.snapshot();
    state_tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

struct Fetcher<A> {
    api: Arc<A>,
    done_tx: Sender<PageFetched>,
    current: Option<(u64, JoinHandle<()>)>,
}

impl<A: PhotoApi> Fetcher<A> {
    async fn launch(&mut self, request: PageRequest) {
        self.abort().await;
        let id = request.id;
        info!(
            id,
            page = request.page,
            query = %request.query,
            mode = ?request.merge,
            "fetching page"
        );
        let api = Arc::clone(&self.api);
        let done_tx = self.done_tx.clone();
        let handle = tokio::spawn(async move {
            let result = api.fetch_page(request).await;
            let _ = done_tx.send(PageFetched { id, result }).await;
        });
        self.current = Some((id, handle));
    }

    fn finished(&mut self, id: u64) {
        if self.current.as_ref().is_some_and(|(current, _)| *current == id) {
            self.current = None;
        }
    }

    /// Abort the running fetch and wait until its future is dropped, so two
    /// requests are never outstanding at once.
    async fn abort(&mut self) {
        if let Some((id, handle)) = self.current.take() {
            if !handle.is_finished() {
                debug!(id, "aborting superseded fetch");
                handle.abort();
            }
            let _ = handle.await;
        }
    }
}
