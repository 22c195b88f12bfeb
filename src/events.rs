/// User and scroll intents delivered to the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A keystroke changed the query input; never fetches on its own.
    QueryInput(String),
    /// The search form was submitted with this query.
    QuerySubmit(String),
    /// Return to the curated feed.
    ClearSearch,
    /// The scroll monitor saw the viewport reach the bottom margin.
    ContinuationSignal,
}

/// Viewport geometry sampled on every scroll, in scroll units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub viewport_height: u32,
    pub scroll_offset: u32,
    pub content_height: u32,
}

/// How a fetched page is folded into the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Replace,
    Append,
}

/// Parameters a fetch was issued with.
///
/// The response is merged using these values, never the controller's state at
/// completion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub id: u64,
    pub page: u32,
    pub query: String,
    pub merge: MergeMode,
}

impl PageRequest {
    pub fn is_search(&self) -> bool {
        !self.query.is_empty()
    }
}
