use std::io::{self, Write};

use chrono::{DateTime, Utc};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute},
};

use crate::model::Service;
use crate::naming::relative_time;
use crate::rows::{DashboardRow, ServiceList};

use super::shared::{truncate_str, write_colored, write_section_header, write_selectable, writeln};

const NAME_WIDTH: usize = 34;

/// One visual line of the dashboard list.
#[derive(Debug, PartialEq)]
pub enum DashboardLine {
    Blank,
    Header(String),
    Service { row: usize },
}

/// Expand rows into visual lines: headers after the first get a blank line
/// above them.
pub fn visual_lines(rows: &[DashboardRow]) -> Vec<DashboardLine> {
    let mut lines = Vec::with_capacity(rows.len() + 8);
    for (i, row) in rows.iter().enumerate() {
        match row {
            DashboardRow::Header(label) => {
                if i > 0 {
                    lines.push(DashboardLine::Blank);
                }
                lines.push(DashboardLine::Header(label.clone()));
            }
            DashboardRow::Service(_) => lines.push(DashboardLine::Service { row: i }),
        }
    }
    lines
}

fn task_counts(svc: &Service) -> String {
    let mut counts = format!("{}/{}", svc.running_count, svc.desired_count);
    if svc.pending_count > 0 {
        counts.push_str(&format!(" +{}", svc.pending_count));
    }
    counts
}

pub fn column_header() -> String {
    format!(
        "  {:<name$} {:<9} {:<9} {:<13} {}",
        "SERVICE",
        "STATUS",
        "TASKS",
        "IMAGE",
        "DEPLOYED",
        name = NAME_WIDTH
    )
}

pub fn service_line(svc: &Service, now: DateTime<Utc>) -> String {
    let status = if svc.rolling_out { "ROLLING" } else { svc.status.as_str() };
    let digest = if svc.image_digest.is_empty() { "-" } else { svc.image_digest.as_str() };
    format!(
        "  {:<name$} {:<9} {:<9} {:<13} {}",
        truncate_str(svc.short_name(), NAME_WIDTH),
        truncate_str(if status.is_empty() { "-" } else { status }, 9),
        task_counts(svc),
        digest,
        relative_time(svc.last_deployed, now),
        name = NAME_WIDTH
    )
}

pub fn render_dashboard(
    out: &mut impl Write,
    list: &ServiceList,
    viewport: usize,
    loading: bool,
    now: DateTime<Utc>,
) -> io::Result<()> {
    queue!(out, MoveTo(0, 2), SetAttribute(Attribute::Bold))?;
    write!(out, "{}\r\n", column_header())?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    if list.rows.is_empty() {
        writeln(out, "")?;
        if loading {
            writeln(out, "  Loading services...")?;
        } else if !list.filter.is_empty() {
            writeln(out, &format!("  No services match \"{}\".", list.filter))?;
        } else {
            writeln(out, "  No services found.")?;
        }
        return Ok(());
    }

    for line in visual_lines(&list.rows).iter().skip(list.scroll).take(viewport) {
        match line {
            DashboardLine::Blank => writeln(out, "")?,
            DashboardLine::Header(label) => write_section_header(out, &format!("  {}", label))?,
            DashboardLine::Service { row } => {
                let Some(svc) = list.rows[*row].service() else {
                    continue;
                };
                let text = service_line(svc, now);
                let selected = *row == list.cursor;
                if !selected && !svc.status.is_empty() && !svc.is_healthy() {
                    write_colored(out, &text, Color::Yellow)?;
                } else {
                    write_selectable(out, &text, selected)?;
                }
            }
        }
    }
    queue!(out, ResetColor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCatalog;
    use crate::naming::classified;
    use crate::rows::build_rows;

    #[test]
    fn headers_after_the_first_get_a_blank_line() {
        let catalog = WorkerCatalog::default();
        let services = vec![classified("web-stable-service", &catalog), classified("proxy-service", &catalog)];
        let lines = visual_lines(&build_rows(&services));
        assert_eq!(
            lines,
            vec![
                DashboardLine::Header("Web".into()),
                DashboardLine::Service { row: 1 },
                DashboardLine::Blank,
                DashboardLine::Header("Proxy".into()),
                DashboardLine::Service { row: 3 },
            ]
        );
    }

    #[test]
    fn service_line_shows_counts_digest_and_rollout() {
        let mut svc = classified("web-canary-service", &WorkerCatalog::default());
        svc.status = "ACTIVE".into();
        svc.running_count = 2;
        svc.desired_count = 3;
        svc.pending_count = 1;
        svc.rolling_out = true;
        svc.image_digest = "0123456789ab".into();
        let line = service_line(&svc, Utc::now());
        assert!(line.starts_with("  web-canary "));
        assert!(line.contains("ROLLING"));
        assert!(line.contains("2/3 +1"));
        assert!(line.contains("0123456789ab"));
        assert!(line.ends_with("-"));
    }
}
