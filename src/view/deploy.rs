use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use crossterm::{cursor::MoveTo, queue, style::Color};

use crate::deploy::{DeployState, DeployStep, CONFIRM_KEY};
use crate::model::Image;
use crate::naming::relative_time;

use super::shared::{clip, truncate_str, write_bold, write_colored, write_confirmation, write_selectable, writeln};

pub fn image_line(image: &Image, running: bool, now: DateTime<Utc>, width: usize) -> String {
    let marker = if running { "●" } else { " " };
    let tags = image
        .tags
        .iter()
        .filter(|t| t.as_str() != "latest")
        .cloned()
        .collect::<Vec<_>>()
        .join(",");
    let summary = image.commit_summary.as_deref().unwrap_or("");
    let line = format!(
        "  {} {:<12}  {:<9} {:<24} {}",
        marker,
        image.short_digest(),
        relative_time(image.created_at, now),
        truncate_str(&tags, 24),
        summary
    );
    clip(&line, width)
}

pub fn progress_lines(state: &DeployState) -> Vec<(String, Option<Color>)> {
    let mut lines = Vec::new();
    if let Some(at) = state.triggered_at {
        lines.push((format!("  Triggered at {}", at.with_timezone(&Local).format("%H:%M:%S")), None));
    }
    if let Some(err) = &state.error {
        lines.push((format!("  Error: {}", err), Some(Color::Red)));
        return lines;
    }
    match (state.run_id, &state.run) {
        (None, _) => lines.push(("  Waiting for the workflow run to appear...".to_string(), None)),
        (Some(id), None) => lines.push((format!("  Run #{}: starting", id), None)),
        (Some(id), Some(run)) if !run.is_completed() => {
            lines.push((format!("  Run #{}: {}", id, run.status), Some(Color::Yellow)));
        }
        (Some(id), Some(run)) => {
            if run.succeeded() {
                lines.push((format!("  Run #{}: completed successfully", id), Some(Color::Green)));
            } else {
                lines.push((format!("  Run #{}: completed ({})", id, run.conclusion), Some(Color::Red)));
            }
            if let Some(hint) = &state.next_hint {
                lines.push((String::new(), None));
                lines.push((format!("  {}", hint), Some(Color::Cyan)));
            }
        }
    }
    lines
}

pub fn footer(state: &DeployState) -> &'static str {
    match state.step {
        DeployStep::SelectTarget => "Esc: Cancel | ↑/↓: Select | Enter: Choose target | ?: Help",
        DeployStep::SelectImage => "Esc: Back | ↑/↓: Select | Enter: Deploy image | ?: Help",
        DeployStep::Confirm => "Y: Deploy | any other key: Cancel",
        DeployStep::Progress if state.is_completed() => "Esc: Back to dashboard",
        DeployStep::Progress => "Esc: Leave (the deploy keeps running)",
    }
}

pub fn render_deploy(out: &mut impl Write, state: &DeployState, size: (u16, u16), now: DateTime<Utc>) -> io::Result<()> {
    let width = size.0 as usize;
    queue!(out, MoveTo(0, 2))?;
    let target = state.selected_target();
    write_bold(out, &format!("  Deploy {}", state.service.short_name()))?;
    if state.step != DeployStep::SelectTarget {
        writeln(out, &format!("  Target:   {} ({})", target.label, target.workflow))?;
        writeln(out, &format!("  Input:    {}", target.workflow_input))?;
    }
    writeln(out, "")?;

    match state.step {
        DeployStep::SelectTarget => {
            writeln(out, "  Select a deploy target:")?;
            writeln(out, "")?;
            for (i, t) in state.targets().iter().enumerate() {
                let line = format!("  {:<10} {:<22} {}", t.label, t.workflow, t.image_base);
                write_selectable(out, &line, i == state.target_cursor)?;
            }
        }
        DeployStep::SelectImage | DeployStep::Confirm => {
            if state.loading {
                writeln(out, "  Loading images...")?;
            } else if let Some(err) = &state.error {
                write_colored(out, &format!("  Error: {}", err), Color::Red)?;
            } else if state.images.is_empty() {
                writeln(out, &format!("  No images found for {}", target.image_base))?;
            } else {
                let rows = (size.1 as usize).saturating_sub(12);
                let start = state.image_cursor.saturating_sub(rows.saturating_sub(1));
                for (i, image) in state.images.iter().enumerate().skip(start).take(rows.max(1)) {
                    let line = image_line(image, state.is_running(image), now, width);
                    write_selectable(out, &line, i == state.image_cursor)?;
                }
            }
            if state.step == DeployStep::Confirm {
                if let Some(image) = state.selected_image() {
                    let prompt = format!(
                        "Deploy {} to {}? Press {} to confirm, any other key to cancel",
                        image.short_digest(),
                        state.service.short_name(),
                        CONFIRM_KEY
                    );
                    write_confirmation(out, size, &prompt)?;
                }
            }
        }
        DeployStep::Progress => {
            if let Some(image) = state.selected_image() {
                writeln(out, &format!("  Image:    {}", image.short_digest()))?;
                writeln(out, "")?;
            }
            for (text, color) in progress_lines(state) {
                match color {
                    Some(c) => write_colored(out, &text, c)?,
                    None => writeln(out, &text)?,
                }
            }
        }
    }
    Ok(())
}
