mod chrome;
mod dashboard;
mod deploy;
mod detail;
mod help;
mod logs;
mod shared;
mod traffic;

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use crossterm::{cursor, execute, queue, style::{Color, SetForegroundColor, ResetColor}, terminal};

use crate::deploy::DeployState;
use crate::detail::DetailState;
use crate::logs::{LogViewport, LogsState};
use crate::model::AppView;
use crate::rows::ServiceList;
use crate::traffic::TrafficState;

pub use dashboard::{column_header, service_line, visual_lines, DashboardLine};
pub use shared::{status_line, truncate_str};

pub struct Presenter;

/// Minimum terminal dimensions for usable rendering.
pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 10;

impl Presenter {
    /// Check if the terminal is large enough. If not, render a "too small"
    /// message and return `true` (meaning "skip normal rendering").
    pub fn render_size_guard() -> io::Result<bool> {
        let (cols, rows) = terminal::size()?;
        if cols < MIN_COLS || rows < MIN_ROWS {
            let mut out = std::io::stdout();
            execute!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
            let msg = format!(
                "Terminal too small ({}x{}). Resize to at least {}x{}.",
                cols, rows, MIN_COLS, MIN_ROWS
            );
            let y = rows / 2;
            let x = cols.saturating_sub(msg.len() as u16) / 2;
            queue!(out, cursor::MoveTo(x, y), SetForegroundColor(Color::Yellow))?;
            write!(out, "{}", msg)?;
            queue!(out, ResetColor)?;
            out.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn clear(out: &mut impl Write) -> io::Result<()> {
        queue!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))
    }

    pub fn render_title_bar(out: &mut impl Write, size: (u16, u16), breadcrumb: &str, right: &str) -> io::Result<()> {
        chrome::render_title_bar(out, size, breadcrumb, right)
    }

    pub fn render_dashboard(
        out: &mut impl Write,
        list: &ServiceList,
        viewport: usize,
        loading: bool,
        now: DateTime<Utc>,
    ) -> io::Result<()> {
        dashboard::render_dashboard(out, list, viewport, loading, now)
    }

    pub fn render_detail(out: &mut impl Write, state: &DetailState, now: DateTime<Utc>) -> io::Result<()> {
        detail::render_detail(out, state, now)
    }

    pub fn render_deploy(out: &mut impl Write, state: &DeployState, size: (u16, u16), now: DateTime<Utc>) -> io::Result<()> {
        deploy::render_deploy(out, state, size, now)
    }

    pub fn deploy_footer(state: &DeployState) -> &'static str {
        deploy::footer(state)
    }

    pub fn render_logs(out: &mut impl Write, state: &LogsState, viewport: LogViewport) -> io::Result<()> {
        logs::render_logs(out, state, viewport)
    }

    pub fn logs_header(state: &LogsState) -> String {
        logs::header(state)
    }

    pub fn logs_footer(state: &LogsState) -> &'static str {
        logs::footer(state)
    }

    pub fn render_traffic(out: &mut impl Write, state: &TrafficState, size: (u16, u16)) -> io::Result<()> {
        traffic::render_traffic(out, state, size)
    }

    pub fn traffic_footer(state: &TrafficState) -> &'static str {
        traffic::footer(state)
    }

    pub fn render_status(
        out: &mut impl Write,
        size: (u16, u16),
        line: Option<(String, Color)>,
    ) -> io::Result<()> {
        shared::write_status(out, size, line)
    }

    pub fn render_footer(out: &mut impl Write, size: (u16, u16), help: &str) -> io::Result<()> {
        shared::write_footer(out, size, help)
    }

    pub fn render_help(out: &mut impl Write, view: AppView, size: (u16, u16)) -> io::Result<()> {
        help::render_help(out, view, size)
    }
}
