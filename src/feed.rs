use std::sync::Arc;

use photo_model::Photo;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::events::{MergeMode, PageRequest};

/// Initialization marker for the continuation observer.
///
/// The observer's first activation happens at mount and must not advance the
/// cursor, so signals are ignored until `mount` has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
}

/// Read-only view of the controller state handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub query: String,
    pub page: u32,
    pub photos: Arc<[Photo]>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 1,
            photos: Arc::from(Vec::new()),
            loading: false,
            last_error: None,
        }
    }
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Merged { mode: MergeMode, added: usize },
    Failed,
    /// The response belonged to a superseded request and was dropped.
    Stale,
}

/// Fetch/pagination state machine.
///
/// Owns the collection, cursor, query and loading flag. Every operation that
/// needs network I/O returns the `PageRequest` to execute; the caller runs it
/// and hands the outcome back through [`FeedController::complete`].
#[derive(Debug)]
pub struct FeedController {
    photos: Vec<Photo>,
    page: u32,
    query: String,
    loading: bool,
    continuation: bool,
    phase: Phase,
    in_flight: Option<PageRequest>,
    next_id: u64,
    last_error: Option<String>,
    /// Query and cursor of the last page merged into the collection.
    merged_from: Option<(String, u32)>,
    /// Ticket of an unconfirmed `clear_search` reload.
    clearing: Option<u64>,
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedController {
    pub fn new() -> Self {
        Self {
            photos: Vec::new(),
            page: 1,
            query: String::new(),
            loading: false,
            continuation: false,
            phase: Phase::Uninitialized,
            in_flight: None,
            next_id: 1,
            last_error: None,
            merged_from: None,
            clearing: None,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A continuation signal arrived and has not been consumed yet.
    pub fn is_continuation_pending(&self) -> bool {
        self.continuation
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            query: self.query.clone(),
            page: self.page,
            photos: Arc::from(self.photos.as_slice()),
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }

    /// Initial load: marks the observer ready and fetches page 1 of the feed.
    ///
    /// Returns `None` when already mounted.
    pub fn mount(&mut self) -> Option<PageRequest> {
        if self.phase == Phase::Ready {
            return None;
        }
        self.phase = Phase::Ready;
        debug!("feed mounted; continuation observer armed");
        Some(self.fetch_page())
    }

    /// Start a fetch for the current query and cursor.
    ///
    /// Any request still in flight is superseded; its response will be
    /// reported as stale by `complete`.
    pub fn fetch_page(&mut self) -> PageRequest {
        let merge = if !self.query.is_empty() && self.page == 1 {
            MergeMode::Replace
        } else {
            MergeMode::Append
        };
        self.issue(merge)
    }

    fn issue(&mut self, merge: MergeMode) -> PageRequest {
        let request = PageRequest {
            id: self.next_id,
            page: self.page,
            query: self.query.clone(),
            merge,
        };
        self.next_id += 1;
        self.clearing = None;
        if let Some(previous) = self.in_flight.replace(request.clone()) {
            debug!(
                superseded = previous.id,
                by = request.id,
                "retiring in-flight request"
            );
        }
        self.loading = true;
        request
    }

    /// Move the cursor; a change fires a fetch.
    fn set_page(&mut self, page: u32) -> Option<PageRequest> {
        if page == self.page {
            return None;
        }
        self.page = page;
        Some(self.fetch_page())
    }

    /// Scroll reached the bottom margin.
    ///
    /// Marks a continuation as pending and advances the cursor when idle.
    /// A signal raised while a fetch is in flight stays pending until that
    /// fetch completes, which clears it without advancing.
    pub fn on_continuation_signal(&mut self) -> Option<PageRequest> {
        if self.phase == Phase::Uninitialized {
            return None;
        }
        self.continuation = true;
        self.advance()
    }

    fn advance(&mut self) -> Option<PageRequest> {
        if self.loading || !self.continuation {
            return None;
        }
        self.continuation = false;
        let next = self.page.saturating_add(1);
        self.set_page(next)
    }

    pub fn on_query_input(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    /// Submit a search. Blank queries are ignored.
    pub fn on_query_submit(&mut self, query: impl Into<String>) -> Option<PageRequest> {
        let query = query.into();
        if query.trim().is_empty() {
            return None;
        }
        self.query = query;
        if self.page == 1 {
            // The cursor is unchanged, so no cursor-change fetch would fire.
            Some(self.fetch_page())
        } else {
            self.set_page(1)
        }
    }

    /// Leave search mode and reload the first page of the curated feed.
    ///
    /// The collection is replaced only once that page arrives. If the reload
    /// fails, query and cursor go back to whatever the collection was fetched
    /// with, so later pages keep extending the same source.
    pub fn clear_search(&mut self) -> Option<PageRequest> {
        let searching = self
            .in_flight
            .as_ref()
            .map(PageRequest::is_search)
            .unwrap_or(false);
        if self.query.is_empty() && !searching {
            return None;
        }
        self.query.clear();
        self.page = 1;
        let request = self.issue(MergeMode::Replace);
        self.clearing = Some(request.id);
        Some(request)
    }

    /// Fold a finished fetch back into the state.
    pub fn complete(
        &mut self,
        request_id: u64,
        result: Result<Vec<Photo>, FetchError>,
    ) -> Completion {
        let request = match self.in_flight.take_if(|r| r.id == request_id) {
            Some(request) => request,
            None => {
                debug!(id = request_id, "dropping stale response");
                return Completion::Stale;
            }
        };

        self.continuation = false;
        self.loading = false;

        match result {
            Ok(batch) => {
                let added = batch.len();
                match request.merge {
                    MergeMode::Replace => self.photos = batch,
                    MergeMode::Append => self.photos.extend(batch),
                }
                self.clearing = None;
                self.merged_from = Some((request.query.clone(), request.page));
                self.last_error = None;
                info!(
                    id = request.id,
                    page = request.page,
                    query = %request.query,
                    mode = ?request.merge,
                    added,
                    total = self.photos.len(),
                    "page merged"
                );
                Completion::Merged {
                    mode: request.merge,
                    added,
                }
            }
            Err(err) => {
                warn!(
                    id = request.id,
                    page = request.page,
                    query = %request.query,
                    timeout = err.is_timeout(),
                    "page fetch failed: {err}"
                );
                self.last_error = Some(err.to_string());
                if self.clearing.take_if(|id| *id == request.id).is_some()
                    && let Some((query, page)) = self.merged_from.clone()
                {
                    debug!(query = %query, page, "feed reload failed; keeping current results");
                    self.query = query;
                    self.page = page;
                }
                Completion::Failed
            }
        }
    }
}
