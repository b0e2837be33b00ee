use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::model::AppView;

const GLOBAL: &[(&str, &str)] = &[("?", "Toggle this help"), ("Ctrl-C", "Quit")];

pub fn bindings(view: AppView) -> &'static [(&'static str, &'static str)] {
    match view {
        AppView::Dashboard => &[
            ("↑/↓ j/k", "Move"),
            ("PgUp/PgDn", "Page"),
            ("Enter", "Service detail"),
            ("d", "Deploy service"),
            ("D", "Deploy all workers"),
            ("l", "Tail logs"),
            ("t", "Edit traffic weights (web)"),
            ("s", "Shell into a task"),
            ("/", "Filter services"),
            ("r", "Refresh now"),
            ("q", "Quit"),
        ],
        AppView::Detail => &[
            ("↑/↓ j/k", "Select task"),
            ("s", "Shell into task"),
            ("d", "Deploy"),
            ("l", "Logs"),
            ("t", "Traffic"),
            ("r", "Refresh"),
            ("Esc", "Back"),
        ],
        AppView::Deploy => &[
            ("↑/↓ j/k", "Select"),
            ("Enter", "Choose"),
            ("Y", "Confirm deploy"),
            ("Esc", "Back / leave"),
        ],
        AppView::Logs => &[
            ("↑/↓ j/k", "Scroll"),
            ("PgUp/PgDn", "Page"),
            ("g/G", "Top / bottom"),
            ("f", "Toggle follow"),
            ("/", "Search"),
            ("n/N", "Next / previous match"),
            ("Esc", "Back"),
        ],
        AppView::Traffic => &[
            ("↑/↓ j/k", "Select target group"),
            ("←/→ h/l", "Weight -/+ 10"),
            ("1-4", "Presets"),
            ("Enter", "Review changes"),
            ("Y", "Apply"),
            ("Esc", "Cancel"),
        ],
    }
}

/// Centered box listing the keys for `view`, drawn over the current screen.
pub fn render_help(out: &mut impl Write, view: AppView, size: (u16, u16)) -> io::Result<()> {
    let entries: Vec<(&str, &str)> = bindings(view).iter().chain(GLOBAL).copied().collect();
    let box_width: usize = 48;
    let box_height = entries.len() + 4;
    let x = (size.0 as usize).saturating_sub(box_width) / 2;
    let y = (size.1 as usize).saturating_sub(box_height) / 2;

    queue!(out, SetBackgroundColor(Color::DarkBlue), SetForegroundColor(Color::White))?;
    let blank = " ".repeat(box_width);
    for row in 0..box_height {
        queue!(out, MoveTo(x as u16, (y + row) as u16))?;
        write!(out, "{}", blank)?;
    }
    queue!(out, MoveTo((x + 2) as u16, y as u16 + 1), SetAttribute(Attribute::Bold))?;
    write!(out, "Keys")?;
    queue!(out, SetAttribute(Attribute::Reset), SetBackgroundColor(Color::DarkBlue), SetForegroundColor(Color::White))?;
    for (i, (keys, action)) in entries.iter().enumerate() {
        queue!(out, MoveTo((x + 2) as u16, (y + 2 + i) as u16))?;
        write!(out, "{:<12} {}", keys, action)?;
    }
    queue!(out, ResetColor)
}
