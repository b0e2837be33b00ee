use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use crossterm::{cursor::MoveTo, queue, style::Color};

use crate::detail::DetailState;
use crate::model::{Deployment, Task};
use crate::naming::relative_time;

use super::shared::{truncate_str, write_bold, write_colored, write_section_header, write_selectable, writeln};

fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let started = task
        .started_at
        .map(|t| format!("{} ({})", t.with_timezone(&Local).format("%H:%M:%S"), relative_time(Some(t), now)))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<34} {:<10} {:<22} {:<12} {}",
        truncate_str(&task.id, 34),
        truncate_str(&task.status, 10),
        started,
        truncate_str(if task.container.is_empty() { "-" } else { &task.container }, 12),
        if task.private_ip.is_empty() { "-" } else { &task.private_ip },
    )
}

pub fn deployment_line(d: &Deployment, now: DateTime<Utc>) -> String {
    let tasks = if d.pending_count > 0 {
        format!("{}/{} +{}", d.running_count, d.desired_count, d.pending_count)
    } else {
        format!("{}/{}", d.running_count, d.desired_count)
    };
    format!(
        "  {:<9} {:<9} {:<13} {:<10} {}",
        d.status,
        tasks,
        if d.rollout_state.is_empty() { "-" } else { &d.rollout_state },
        relative_time(d.created_at, now),
        d.task_definition
    )
}

pub fn render_detail(out: &mut impl Write, state: &DetailState, now: DateTime<Utc>) -> io::Result<()> {
    let svc = &state.service;
    queue!(out, MoveTo(0, 2))?;

    write_bold(out, &format!("  {}", svc.name))?;
    let group = if svc.category.is_empty() {
        svc.group.label().to_string()
    } else {
        format!("{} ({})", svc.group.label(), svc.category)
    };
    writeln(out, &format!("  Group:    {}", group))?;
    writeln(out, &format!("  Status:   {}{}", svc.status, if svc.rolling_out { "  (rollout in progress)" } else { "" }))?;
    writeln(
        out,
        &format!(
            "  Tasks:    {} running / {} desired / {} pending",
            svc.running_count, svc.desired_count, svc.pending_count
        ),
    )?;
    writeln(out, &format!("  Image:    {}", if svc.image_digest.is_empty() { "-" } else { &svc.image_digest }))?;
    writeln(out, &format!("  Deployed: {}", relative_time(svc.last_deployed, now)))?;
    if !svc.targets.is_empty() {
        let labels: Vec<&str> = svc.targets.iter().map(|t| t.label.as_str()).collect();
        writeln(out, &format!("  Targets:  {}", labels.join(", ")))?;
    }
    writeln(out, "")?;

    write_section_header(out, &format!("  Tasks ({})", state.tasks.len()))?;
    if state.loading {
        writeln(out, "  Loading tasks...")?;
    } else if let Some(err) = &state.error {
        write_colored(out, &format!("  Error: {}", err), Color::Red)?;
    } else if state.tasks.is_empty() {
        writeln(out, "  No tasks.")?;
    } else {
        writeln(
            out,
            &format!("  {:<34} {:<10} {:<22} {:<12} {}", "TASK", "STATUS", "STARTED", "CONTAINER", "IP"),
        )?;
        for (i, task) in state.tasks.iter().enumerate() {
            write_selectable(out, &task_line(task, now), i == state.task_cursor)?;
        }
    }
    writeln(out, "")?;

    write_section_header(out, "  Deployments")?;
    if svc.deployments.is_empty() {
        writeln(out, "  No deployment records.")?;
    } else {
        writeln(out, &format!("  {:<9} {:<9} {:<13} {:<10} {}", "STATUS", "TASKS", "ROLLOUT", "AGE", "TASK DEF"))?;
        for d in &svc.deployments {
            let line = deployment_line(d, now);
            match d.rollout_state.as_str() {
                "FAILED" => write_colored(out, &line, Color::Red)?,
                "IN_PROGRESS" => write_colored(out, &line, Color::Yellow)?,
                _ => writeln(out, &line)?,
            }
        }
    }
    Ok(())
}
