use std::io::Write;

use anyhow::{Context, Result};
use photo_model::Photo;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ViewportOptions;
use crate::events::{Intent, ScrollMetrics};
use crate::feed::FeedSnapshot;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/text`: replace the query input.
    Type(String),
    /// Empty line, `s`, or `s text`.
    Submit(Option<String>),
    Clear,
    /// Rows to scroll; negative is up.
    Scroll(i64),
    Redraw,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(text) = line.strip_prefix('/') {
        return Some(Command::Type(text.to_string()));
    }
    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };
    let rows = |default: i64| -> Option<i64> {
        if rest.is_empty() {
            Some(default)
        } else {
            rest.parse::<u32>().ok().map(i64::from)
        }
    };
    match word {
        "" => Some(Command::Submit(None)),
        "s" | "search" if rest.is_empty() => Some(Command::Submit(None)),
        "s" | "search" => Some(Command::Submit(Some(rest.to_string()))),
        "clear" => Some(Command::Clear),
        "j" | "down" => rows(1).map(Command::Scroll),
        "k" | "up" => rows(1).map(|n| Command::Scroll(-n)),
        "r" | "redraw" => Some(Command::Redraw),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Per-render key for a grid cell. The index keeps it unique even when the
/// API repeats a photo id across pages.
pub fn render_key(index: usize, photo: &Photo) -> String {
    format!("{index}-{}", photo.id)
}

/// Local copy of the query input line.
///
/// Edits are sent to the controller asynchronously, so a snapshot published
/// before the controller handled the latest edit still carries the old query.
/// Such snapshots must not overwrite the line.
#[derive(Debug, Clone, Default)]
pub struct QueryLine {
    text: String,
    published: String,
    dirty: bool,
}

impl QueryLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            published: text.clone(),
            text,
            dirty: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.dirty = self.text != self.published;
    }

    /// Follow a published query once the controller has caught up with the
    /// local edit.
    pub fn sync(&mut self, published: &str) {
        if self.published != published {
            self.published = published.to_string();
        }
        if !self.dirty {
            self.text.clone_from(&self.published);
        } else if self.text == published {
            self.dirty = false;
        }
    }
}

/// Scroll position over a grid of `columns` photos per row.
#[derive(Debug, Clone)]
pub struct Viewport {
    options: ViewportOptions,
    scroll_offset: u32,
}

impl Viewport {
    pub fn new(options: ViewportOptions) -> Self {
        Self {
            options,
            scroll_offset: 0,
        }
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    fn grid_rows(&self, photo_count: usize) -> u32 {
        let columns = self.options.columns.max(1) as usize;
        u32::try_from(photo_count.div_ceil(columns)).unwrap_or(u32::MAX)
    }

    pub fn content_height(&self, photo_count: usize) -> u32 {
        self.grid_rows(photo_count)
            .saturating_mul(self.options.row_height)
    }

    pub fn metrics(&self, photo_count: usize) -> ScrollMetrics {
        ScrollMetrics {
            viewport_height: self.options.height(),
            scroll_offset: self.scroll_offset,
            content_height: self.content_height(photo_count),
        }
    }

    /// Scroll by whole rows, clamped to the scrollable range.
    pub fn scroll_rows(&mut self, rows: i64, photo_count: usize) {
        let max_offset = self
            .content_height(photo_count)
            .saturating_sub(self.options.height());
        let delta = rows.saturating_mul(i64::from(self.options.row_height));
        let target = (i64::from(self.scroll_offset) + delta).clamp(0, i64::from(max_offset));
        self.scroll_offset = u32::try_from(target).unwrap_or(max_offset);
    }

    pub fn reset(&mut self) {
        self.scroll_offset = 0;
    }

    /// Indices of the photos inside the visible window.
    fn visible_range(&self, photo_count: usize) -> std::ops::Range<usize> {
        let columns = self.options.columns.max(1) as usize;
        let first_row = (self.scroll_offset / self.options.row_height.max(1)) as usize;
        let start = (first_row * columns).min(photo_count);
        let end = (start + self.options.rows as usize * columns).min(photo_count);
        start..end
    }
}

/// Draw one frame of the grid.
pub fn draw(
    out: &mut impl Write,
    snapshot: &FeedSnapshot,
    viewport: &Viewport,
) -> std::io::Result<()> {
    let mode = if snapshot.query.is_empty() {
        "feed".to_string()
    } else {
        format!("search \"{}\"", snapshot.query)
    };
    writeln!(
        out,
        "== {mode} | page {} | {} photos ==",
        snapshot.page,
        snapshot.photos.len()
    )?;
    let range = viewport.visible_range(snapshot.photos.len());
    for (index, photo) in snapshot.photos[range.clone()].iter().enumerate() {
        let index = range.start + index;
        write!(out, "[{}] {}", render_key(index, photo), photo.caption())?;
        if let Some(by) = photo.attribution() {
            write!(out, " (by {by})")?;
        }
        if let Some(url) = photo.grid_url() {
            write!(out, " <{url}>")?;
        }
        writeln!(out)?;
    }
    if snapshot.loading {
        writeln!(out, "loading...")?;
    }
    if let Some(err) = &snapshot.last_error {
        writeln!(out, "error: {err}")?;
    }
    out.flush()
}

const HELP: &str =
    "commands: /text (type query), s [text] or empty line (search), clear, j/k [rows], r, q";

/// Terminal presentation layer.
///
/// Redraws whenever the controller publishes a new snapshot and turns input
/// lines into intents. Scrolling produces `ScrollMetrics` for the scroll
/// monitor; this task never touches feed state directly. Returns on `q`,
/// end of input, or cancellation.
pub async fn run<R, W>(
    input: R,
    mut out: W,
    mut state_rx: watch::Receiver<FeedSnapshot>,
    intents_tx: Sender<Intent>,
    metrics_tx: Sender<ScrollMetrics>,
    viewport: ViewportOptions,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut viewport = Viewport::new(viewport);
    let mut query_line = QueryLine::new(state_rx.borrow().query.clone());

    {
        let snapshot = state_rx.borrow_and_update();
        draw(&mut out, &snapshot, &viewport).context("drawing grid")?;
    }

    loop {
        select! {
            _ = cancel.cancelled() => break,

            changed = state_rx.changed() => {
                if changed.is_err() {
                    debug!("controller closed its state channel");
                    break;
                }
                let snapshot = state_rx.borrow_and_update().clone();
                query_line.sync(&snapshot.query);
                draw(&mut out, &snapshot, &viewport).context("drawing grid")?;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("reading input")? else {
                    debug!("input closed");
                    break;
                };
                let Some(command) = parse_command(&line) else {
                    writeln!(out, "{HELP}").context("writing help")?;
                    continue;
                };
                let intent = match command {
                    Command::Type(text) => {
                        query_line.edit(text.clone());
                        Intent::QueryInput(text)
                    }
                    Command::Submit(Some(text)) => {
                        if intents_tx.send(Intent::QueryInput(text.clone())).await.is_err() {
                            break;
                        }
                        query_line.edit(text.clone());
                        Intent::QuerySubmit(text)
                    }
                    Command::Submit(None) => Intent::QuerySubmit(query_line.text().to_string()),
                    Command::Clear => {
                        viewport.reset();
                        Intent::ClearSearch
                    }
                    Command::Scroll(rows) => {
                        let count = state_rx.borrow().photos.len();
                        viewport.scroll_rows(rows, count);
                        let snapshot = state_rx.borrow().clone();
                        draw(&mut out, &snapshot, &viewport).context("drawing grid")?;
                        if metrics_tx.send(viewport.metrics(count)).await.is_err() {
                            debug!("scroll monitor detached");
                        }
                        continue;
                    }
                    Command::Redraw => {
                        let snapshot = state_rx.borrow().clone();
                        draw(&mut out, &snapshot, &viewport).context("drawing grid")?;
                        continue;
                    }
                    Command::Quit => break,
                };
                if intents_tx.send(intent).await.is_err() {
                    debug!("controller gone; presenter stopping");
                    break;
                }
            }
        }
    }

    Ok(())
}
