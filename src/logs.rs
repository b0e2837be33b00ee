//! Log tail engine: initial window, watermark-driven tailing, wrapping and
//! in-memory search.

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::warn;

use crate::error::FleetError;
use crate::model::{AppView, LogBatch, LogEvent, Service};

/// Width of the " HH:MM:SS  " prefix; continuation lines indent to it.
pub const TIMESTAMP_PREFIX: usize = 11;
const MIN_TEXT_WIDTH: usize = 10;

/// Size of the scrolling log area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogViewport {
    pub width: usize,
    pub height: usize,
}

impl LogViewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height: height.max(1) }
    }

    fn text_width(&self) -> usize {
        self.width.saturating_sub(TIMESTAMP_PREFIX).max(MIN_TEXT_WIDTH)
    }
}

fn chunks(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Wrap one event into display lines. The first line carries the clock, the
/// rest are indented to line up under the message.
pub fn wrap_event(event: &LogEvent, viewport: LogViewport) -> Vec<String> {
    let clock = event.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let indent = " ".repeat(TIMESTAMP_PREFIX);
    let mut lines = Vec::new();
    for (i, piece) in event
        .message
        .lines()
        .flat_map(|l| chunks(l, viewport.text_width()))
        .enumerate()
    {
        if i == 0 {
            lines.push(format!(" {}  {}", clock, piece));
        } else {
            lines.push(format!("{}{}", indent, piece));
        }
    }
    if lines.is_empty() {
        lines.push(format!(" {}  ", clock));
    }
    lines
}

/// Number of display lines an event occupies.
pub fn wrapped_height(event: &LogEvent, viewport: LogViewport) -> usize {
    let width = viewport.text_width();
    let n: usize = event
        .message
        .lines()
        .map(|l| l.chars().count().div_ceil(width).max(1))
        .sum();
    n.max(1)
}

/// Largest first-visible event index that still fills the viewport: walk back
/// from the newest event until the wrapped lines no longer fit.
pub fn max_scroll(events: &[LogEvent], viewport: LogViewport) -> usize {
    let mut used = 0;
    for (i, event) in events.iter().enumerate().rev() {
        used += wrapped_height(event, viewport);
        if used > viewport.height {
            return i + 1;
        }
    }
    0
}

/// What the logs screen asks of the controller after a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogsAction {
    None,
    Exit,
    /// Follow was re-enabled; arm a tail tick for this generation.
    ScheduleTail(u64),
}

#[derive(Clone, Debug)]
pub struct LogsState {
    pub session: u64,
    pub service: Service,
    pub log_group: String,
    pub prev_view: AppView,
    pub events: Vec<LogEvent>,
    /// Index of the first visible event.
    pub scroll: usize,
    pub follow: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub watermark_ms: i64,
    /// Bumped whenever a new tail loop starts; older ticks die off.
    pub tail_gen: u64,
    pub search: String,
    pub search_active: bool,
    pub matches: Vec<usize>,
    pub match_cursor: usize,
}

impl LogsState {
    pub fn new(session: u64, service: Service, log_group: String, prev_view: AppView) -> Self {
        Self {
            session,
            service,
            log_group,
            prev_view,
            events: Vec::new(),
            scroll: 0,
            follow: true,
            loading: true,
            error: None,
            watermark_ms: 0,
            tail_gen: 0,
            search: String::new(),
            search_active: false,
            matches: Vec::new(),
            match_cursor: 0,
        }
    }

    fn scroll_to_bottom(&mut self, viewport: LogViewport) {
        self.scroll = max_scroll(&self.events, viewport);
    }

    /// Apply the initial window. Returns the tail generation to arm, if any.
    pub fn loaded(
        &mut self,
        result: Result<Vec<LogEvent>, FleetError>,
        window_start_ms: i64,
        viewport: LogViewport,
    ) -> Option<u64> {
        self.loading = false;
        match result {
            Err(e) => {
                if self.events.is_empty() {
                    self.error = Some(e.to_string());
                } else {
                    warn!(group = %self.log_group, error = %e, "log reload failed");
                }
                None
            }
            Ok(mut events) => {
                events.sort_by_key(|e| e.timestamp);
                self.watermark_ms = events.last().map(|e| e.timestamp_ms()).unwrap_or(window_start_ms);
                self.events = events;
                self.error = None;
                self.refresh_matches();
                if self.follow {
                    self.scroll_to_bottom(viewport);
                    Some(self.tail_gen)
                } else {
                    None
                }
            }
        }
    }

    /// Start of the next tail fetch, or None when this tick is stale.
    pub fn tail_request(&self, generation: u64) -> Option<i64> {
        (self.follow && !self.loading && generation == self.tail_gen).then_some(self.watermark_ms + 1)
    }

    /// Merge a tail result. Returns true when the tail loop should re-arm.
    pub fn tailed(
        &mut self,
        generation: u64,
        result: Result<LogBatch, FleetError>,
        viewport: LogViewport,
    ) -> bool {
        match result {
            Err(e) => warn!(group = %self.log_group, error = %e, "log tail failed"),
            Ok(batch) => self.append(batch, viewport),
        }
        self.follow && generation == self.tail_gen
    }

    /// Append events newer than the watermark and advance it.
    pub fn append(&mut self, batch: LogBatch, viewport: LogViewport) {
        let watermark = self.watermark_ms;
        let mut fresh: Vec<LogEvent> = batch
            .events
            .into_iter()
            .filter(|e| e.timestamp_ms() > watermark)
            .collect();
        fresh.sort_by_key(|e| e.timestamp);
        let newest = fresh.last().map(|e| e.timestamp_ms()).unwrap_or(watermark);
        self.watermark_ms = watermark.max(batch.watermark_ms).max(newest);
        if fresh.is_empty() {
            return;
        }
        self.events.extend(fresh);
        self.refresh_matches();
        if self.follow {
            self.scroll_to_bottom(viewport);
        }
    }

    fn manual_scroll(&mut self, target: usize, viewport: LogViewport) {
        self.follow = false;
        self.scroll = target.min(max_scroll(&self.events, viewport));
    }

    /// Keep the scroll offset valid after the viewport changes size.
    pub fn clamp_scroll(&mut self, viewport: LogViewport) {
        if self.follow {
            self.scroll_to_bottom(viewport);
        } else {
            self.scroll = self.scroll.min(max_scroll(&self.events, viewport));
        }
    }

    pub fn scroll_up(&mut self, n: usize, viewport: LogViewport) {
        self.manual_scroll(self.scroll.saturating_sub(n), viewport);
    }

    pub fn scroll_down(&mut self, n: usize, viewport: LogViewport) {
        self.manual_scroll(self.scroll + n, viewport);
    }

    /// Flip follow mode. Turning it on jumps to the end and starts a new tail loop.
    /// While the initial window is loading only the flag changes; `loaded` arms
    /// the loop.
    pub fn toggle_follow(&mut self, viewport: LogViewport) -> Option<u64> {
        self.follow = !self.follow;
        if !self.follow || self.loading {
            return None;
        }
        self.scroll_to_bottom(viewport);
        self.tail_gen += 1;
        Some(self.tail_gen)
    }

    fn refresh_matches(&mut self) {
        self.matches.clear();
        if self.search.is_empty() {
            self.match_cursor = 0;
            return;
        }
        let needle = self.search.to_lowercase();
        self.matches = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.message.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        if self.match_cursor >= self.matches.len() {
            self.match_cursor = 0;
        }
    }

    pub fn is_match(&self, index: usize) -> bool {
        self.matches.binary_search(&index).is_ok()
    }

    /// Centre the current match, clamped to the scroll range.
    pub fn scroll_to_match(&mut self, viewport: LogViewport) {
        let Some(&target) = self.matches.get(self.match_cursor) else {
            return;
        };
        self.follow = false;
        let centred = target.saturating_sub(viewport.height / 2);
        self.scroll = centred.min(max_scroll(&self.events, viewport));
    }

    pub fn next_match(&mut self, viewport: LogViewport) {
        if self.matches.is_empty() {
            return;
        }
        self.match_cursor = (self.match_cursor + 1) % self.matches.len();
        self.scroll_to_match(viewport);
    }

    pub fn prev_match(&mut self, viewport: LogViewport) {
        if self.matches.is_empty() {
            return;
        }
        self.match_cursor = self.match_cursor.checked_sub(1).unwrap_or(self.matches.len() - 1);
        self.scroll_to_match(viewport);
    }

    pub fn set_search(&mut self, query: &str, viewport: LogViewport) {
        self.search = query.to_string();
        self.match_cursor = 0;
        self.refresh_matches();
        self.scroll_to_match(viewport);
    }

    pub fn handle_key(&mut self, key: &KeyEvent, viewport: LogViewport) -> LogsAction {
        if self.search_active {
            self.search_key(key, viewport);
            return LogsAction::None;
        }
        match key.code {
            KeyCode::Esc => return LogsAction::Exit,
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1, viewport),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1, viewport),
            KeyCode::PageUp => self.scroll_up(viewport.height, viewport),
            KeyCode::PageDown => self.scroll_down(viewport.height, viewport),
            KeyCode::Char('g') | KeyCode::Home => self.manual_scroll(0, viewport),
            // Jumping to the end leaves follow as it was.
            KeyCode::Char('G') | KeyCode::End => self.scroll_to_bottom(viewport),
            KeyCode::Char('f') => {
                if let Some(generation) = self.toggle_follow(viewport) {
                    return LogsAction::ScheduleTail(generation);
                }
            }
            KeyCode::Char('/') => {
                self.search_active = true;
                self.search.clear();
                self.matches.clear();
                self.match_cursor = 0;
            }
            KeyCode::Char('n') => self.next_match(viewport),
            KeyCode::Char('N') => self.prev_match(viewport),
            _ => {}
        }
        LogsAction::None
    }

    fn search_key(&mut self, key: &KeyEvent, viewport: LogViewport) {
        match key.code {
            KeyCode::Enter => self.search_active = false,
            KeyCode::Esc => {
                self.search_active = false;
                self.search.clear();
                self.matches.clear();
                self.match_cursor = 0;
            }
            KeyCode::Backspace => {
                let mut query = self.search.clone();
                if query.pop().is_some() {
                    self.set_search(&query, viewport);
                }
            }
            KeyCode::Char(c) => {
                let query = format!("{}{}", self.search, c);
                self.set_search(&query, viewport);
            }
            _ => {}
        }
    }
}
