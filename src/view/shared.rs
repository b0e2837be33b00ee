use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

/// Truncate a string to at most `max_len` characters (not bytes), appending "..."
/// if truncated. Safe for multi-byte UTF-8.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else {
        let keep = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(keep).collect();
        format!("{}...", truncated)
    }
}

/// Cut `s` to `width` characters without an ellipsis.
pub fn clip(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

pub fn writeln(out: &mut impl Write, text: &str) -> io::Result<()> {
    write!(out, "{}\r\n", text)
}

pub fn write_colored(out: &mut impl Write, text: &str, color: Color) -> io::Result<()> {
    queue!(out, SetForegroundColor(color))?;
    write!(out, "{}\r\n", text)?;
    queue!(out, ResetColor)
}

pub fn write_bold(out: &mut impl Write, text: &str) -> io::Result<()> {
    queue!(out, SetAttribute(Attribute::Bold))?;
    write!(out, "{}\r\n", text)?;
    queue!(out, SetAttribute(Attribute::Reset))
}

pub fn write_section_header(out: &mut impl Write, text: &str) -> io::Result<()> {
    queue!(out, SetAttribute(Attribute::Bold), SetForegroundColor(Color::Cyan))?;
    write!(out, "{}\r\n", text)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))
}

pub fn write_selectable(out: &mut impl Write, text: &str, selected: bool) -> io::Result<()> {
    if selected {
        queue!(out, SetBackgroundColor(Color::DarkGrey), SetForegroundColor(Color::White))?;
    }
    write!(out, "{}\r\n", text)?;
    if selected {
        queue!(out, ResetColor)?;
    }
    Ok(())
}

pub fn separator(out: &mut impl Write, width: usize) -> io::Result<()> {
    write_colored(out, &"─".repeat(width), Color::DarkGrey)
}

/// Status line text and color: errors first, then the status message, then
/// warnings.
pub fn status_line(error: Option<&str>, status: Option<&str>, warning: Option<&str>) -> Option<(String, Color)> {
    if let Some(e) = error {
        return Some((format!("Error: {}", e), Color::Red));
    }
    if let Some(s) = status {
        return Some((s.to_string(), Color::Yellow));
    }
    warning.map(|w| (format!("Warning: {}", w), Color::DarkYellow))
}

/// Draw the status line one row above the footer.
pub fn write_status(out: &mut impl Write, size: (u16, u16), line: Option<(String, Color)>) -> io::Result<()> {
    let Some((text, color)) = line else {
        return Ok(());
    };
    let y = size.1.saturating_sub(2);
    queue!(
        out,
        MoveTo(0, y),
        SetForegroundColor(color),
        Print(clip(&format!("  {}", text), size.0 as usize)),
        ResetColor
    )
}

/// Key help on the last row.
pub fn write_footer(out: &mut impl Write, size: (u16, u16), help: &str) -> io::Result<()> {
    let width = size.0 as usize;
    queue!(
        out,
        MoveTo(1, size.1.saturating_sub(1)),
        SetForegroundColor(Color::DarkGrey),
        Print(format!("{:<width$}", clip(help, width.saturating_sub(1)), width = width.saturating_sub(1))),
        ResetColor
    )
}

/// Red confirmation bar three rows from the bottom.
pub fn write_confirmation(out: &mut impl Write, size: (u16, u16), prompt: &str) -> io::Result<()> {
    let width = size.0 as usize;
    queue!(
        out,
        MoveTo(0, size.1.saturating_sub(3)),
        SetBackgroundColor(Color::DarkRed),
        SetForegroundColor(Color::White),
        SetAttribute(Attribute::Bold)
    )?;
    let line = format!("  {}  ", prompt);
    write!(out, "{:<width$}", clip(&line, width), width = width)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))
}
