use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
};

use super::shared::{clip, separator};

/// Breadcrumb on the left, cluster and clock on the right, then a separator.
pub fn render_title_bar(out: &mut impl Write, size: (u16, u16), breadcrumb: &str, right: &str) -> io::Result<()> {
    let width = size.0 as usize;
    queue!(out, MoveTo(0, 0), SetAttribute(Attribute::Bold))?;
    write!(out, "{}", clip(&format!("  {}", breadcrumb), width))?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    let right = format!("{} ", right);
    let col = width.saturating_sub(right.chars().count());
    queue!(out, MoveTo(col as u16, 0), SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{}", right)?;
    queue!(out, ResetColor)?;
    write!(out, "\r\n")?;

    separator(out, width)
}
