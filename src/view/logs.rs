use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
};

use crate::logs::{wrap_event, LogViewport, LogsState};

use super::shared::{clip, separator, write_colored};

/// Display lines for the visible window: events from `scroll` on, wrapped,
/// cut to the viewport height. Each line carries its event index.
pub fn visible_lines(state: &LogsState, viewport: LogViewport) -> Vec<(usize, String)> {
    let mut lines = Vec::with_capacity(viewport.height);
    for (index, event) in state.events.iter().enumerate().skip(state.scroll) {
        for line in wrap_event(event, viewport) {
            if lines.len() == viewport.height {
                return lines;
            }
            lines.push((index, line));
        }
    }
    lines
}

pub fn header(state: &LogsState) -> String {
    let mode = if state.follow { "FOLLOWING" } else { "PAUSED" };
    let search = if state.search.is_empty() {
        String::new()
    } else if state.matches.is_empty() {
        format!(" | SEARCH: \"{}\" (no matches)", state.search)
    } else {
        format!(
            " | SEARCH: \"{}\" ({}/{})",
            state.search,
            state.match_cursor + 1,
            state.matches.len()
        )
    };
    format!("Logs: {} ({}) - {}{}", state.service.short_name(), state.log_group, mode, search)
}

pub fn footer(state: &LogsState) -> &'static str {
    if state.search_active {
        "Type to search | Enter: Confirm | Esc: Cancel"
    } else if !state.search.is_empty() {
        "Esc: Back | ↑/↓: Scroll | g/G: Top/Bottom | f: Follow | /: Search | n/N: Next/Prev match"
    } else {
        "Esc: Back | ↑/↓: Scroll (pauses follow) | PgUp/PgDn: Page | g/G: Top/Bottom | f: Follow | /: Search"
    }
}

pub fn render_logs(out: &mut impl Write, state: &LogsState, viewport: LogViewport) -> io::Result<()> {
    let width = viewport.width;
    queue!(out, MoveTo(0, 1))?;
    if state.search_active {
        write_colored(out, &format!("  Search: {}_", state.search), Color::Cyan)?;
    } else {
        separator(out, width)?;
    }

    if state.loading && state.events.is_empty() {
        out.write_all(b"  Loading logs...\r\n")?;
        return Ok(());
    }
    if let Some(err) = &state.error {
        write_colored(out, &format!("  Error: {}", err), Color::Red)?;
        return Ok(());
    }
    if state.events.is_empty() {
        out.write_all(b"  No log events in the last 30 minutes.\r\n")?;
        return Ok(());
    }

    let current = state.matches.get(state.match_cursor).copied();
    for (index, line) in visible_lines(state, viewport) {
        let text = clip(&line, width);
        if Some(index) == current {
            queue!(out, SetForegroundColor(Color::Yellow), SetAttribute(Attribute::Bold))?;
            write!(out, "{}\r\n", text)?;
            queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        } else if state.is_match(index) {
            write_colored(out, &text, Color::Yellow)?;
        } else {
            write!(out, "{}\r\n", text)?;
        }
    }
    Ok(())
}
