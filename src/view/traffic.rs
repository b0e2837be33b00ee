use std::io::{self, Write};

use crossterm::{cursor::MoveTo, queue, style::Color};

use crate::deploy::CONFIRM_KEY;
use crate::model::TrafficRule;
use crate::traffic::{Preset, TrafficState, TrafficStep};

use super::shared::{truncate_str, write_bold, write_colored, write_confirmation, write_selectable, writeln};

const BAR_WIDTH: usize = 30;

fn share_bar(share: u32) -> String {
    let filled = (share as usize * BAR_WIDTH) / 100;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn weight_line(rule: &TrafficRule, index: usize) -> String {
    let target = &rule.targets[index];
    let share = rule.share_of(index);
    format!(
        "  {:<32} {:>4}  {:>3}%  {}",
        truncate_str(&target.name, 32),
        target.weight,
        share,
        share_bar(share)
    )
}

/// Before/after rows for targets, marking the ones that change.
pub fn diff_lines(rule: &TrafficRule, original: &[u32]) -> Vec<String> {
    rule.targets
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let before = original.get(i).copied().unwrap_or(t.weight);
            let marker = if before != t.weight { "*" } else { " " };
            format!("  {} {:<32} {:>4} → {:<4}", marker, truncate_str(&t.name, 32), before, t.weight)
        })
        .collect()
}

pub fn presets_legend() -> String {
    let presets = ['1', '2', '3', '4']
        .iter()
        .filter_map(|&c| Preset::from_key(c).map(|p| format!("{}: {}", c, p.label())))
        .collect::<Vec<_>>();
    format!("  Presets  {}", presets.join("   "))
}

pub fn footer(state: &TrafficState) -> &'static str {
    match state.step {
        TrafficStep::Editing => "Esc: Cancel | ↑/↓: Select | ←/→: -/+10 | 1-4: Presets | Enter: Review | ?: Help",
        TrafficStep::Confirm => "Y: Apply | any other key: Back to editing",
        TrafficStep::Saving => "Applying...",
    }
}

pub fn render_traffic(out: &mut impl Write, state: &TrafficState, size: (u16, u16)) -> io::Result<()> {
    queue!(out, MoveTo(0, 2))?;
    if state.loading {
        writeln(out, "  Loading traffic rule...")?;
        return Ok(());
    }
    let Some(rule) = &state.rule else {
        if let Some(err) = &state.error {
            write_colored(out, &format!("  Error: {}", err), Color::Red)?;
        }
        return Ok(());
    };

    write_bold(out, &format!("  {} ({})", rule.service_key, rule.label))?;
    writeln(out, &format!("  Total weight: {}", rule.total_weight()))?;
    writeln(out, "")?;

    match state.step {
        TrafficStep::Editing | TrafficStep::Saving => {
            writeln(out, &format!("  {:<32} {:>4}  {:>4}", "TARGET GROUP", "WEIGHT", "SHARE"))?;
            for i in 0..rule.targets.len() {
                write_selectable(out, &weight_line(rule, i), i == state.cursor && state.step == TrafficStep::Editing)?;
            }
            writeln(out, "")?;
            writeln(out, &presets_legend())?;
        }
        TrafficStep::Confirm => {
            writeln(out, "  Review changes:")?;
            writeln(out, "")?;
            for line in diff_lines(rule, &state.original) {
                if line.starts_with("  *") {
                    write_colored(out, &line, Color::Yellow)?;
                } else {
                    writeln(out, &line)?;
                }
            }
            let prompt = format!("Apply these weights? Press {} to confirm, any other key to go back", CONFIRM_KEY);
            write_confirmation(out, size, &prompt)?;
        }
    }

    if let Some(err) = &state.error {
        writeln(out, "")?;
        write_colored(out, &format!("  Error: {}", err), Color::Red)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetGroupWeight;

    fn rule(weights: &[(&str, u32)]) -> TrafficRule {
        TrafficRule {
            rule_arn: String::new(),
            listener_arn: "arn:l".into(),
            is_default: true,
            service_key: "web-stable".into(),
            label: "Default".into(),
            targets: weights
                .iter()
                .map(|(n, w)| TargetGroupWeight { arn: format!("arn:{}", n), name: n.to_string(), weight: *w })
                .collect(),
        }
    }

    #[test]
    fn diff_marks_changed_targets() {
        let r = rule(&[("web-stable-tg", 50), ("web-stable-2-tg", 50)]);
        let lines = diff_lines(&r, &[100, 50]);
        assert!(lines[0].starts_with("  * web-stable-tg"));
        assert!(lines[0].contains(" 100 → 50"));
        assert!(lines[1].starts_with("    web-stable-2-tg"));
    }

    #[test]
    fn weight_line_shows_share() {
        let r = rule(&[("web-stable-tg", 75), ("web-stable-2-tg", 25)]);
        assert!(weight_line(&r, 0).contains("  75%"));
        assert!(weight_line(&r, 1).contains("  25%"));
    }

    #[test]
    fn legend_lists_all_presets() {
        assert_eq!(
            presets_legend(),
            "  Presets  1: all primary   2: all secondary   3: even split   4: maintenance"
        );
    }
}
