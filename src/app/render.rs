use std::io::{self, Write};

use chrono::{Local, Utc};

use crate::model::AppView;
use crate::view::{status_line, Presenter};

use super::App;

const DASHBOARD_HELP: &str =
    "q: Quit | ↑/↓: Navigate | Enter: Detail | d/D: Deploy | l: Logs | t: Traffic | s: Shell | /: Filter | r: Refresh | ?: Help";
const DETAIL_HELP: &str = "Esc: Back | ↑/↓: Task | s: Shell | d: Deploy | l: Logs | t: Traffic | r: Refresh | ?: Help";

fn dashboard_footer(app: &App) -> String {
    let count = app.services.visible_count();
    if app.filter_active {
        format!("Filter: {}_ ({} services) | Enter: Accept | Esc: Clear", app.services.filter, count)
    } else if !app.services.filter.is_empty() {
        format!("Filter: \"{}\" ({} services) | Esc: Clear | {}", app.services.filter, count, DASHBOARD_HELP)
    } else {
        DASHBOARD_HELP.to_string()
    }
}

fn right_label(app: &App) -> String {
    let state = if app.loading {
        "refreshing".to_string()
    } else if app.enriching {
        "resolving images".to_string()
    } else {
        app.last_refresh
            .map(|t| format!("updated {}", t.with_timezone(&Local).format("%H:%M:%S")))
            .unwrap_or_else(|| "not loaded".to_string())
    };
    format!("fleetdash - {} - {}", app.config.cluster, state)
}

pub fn render(app: &App) -> io::Result<()> {
    let mut out = io::stdout();
    let size = app.size;
    let now = Utc::now();
    Presenter::clear(&mut out)?;
    let right = right_label(app);

    let footer: String = match app.view {
        AppView::Dashboard => {
            Presenter::render_title_bar(&mut out, size, "Services", &right)?;
            Presenter::render_dashboard(&mut out, &app.services, app.dashboard_viewport(), app.loading, now)?;
            dashboard_footer(app)
        }
        AppView::Detail => match &app.detail {
            Some(detail) => {
                let crumb = format!("Services › {}", detail.service.short_name());
                Presenter::render_title_bar(&mut out, size, &crumb, &right)?;
                Presenter::render_detail(&mut out, detail, now)?;
                DETAIL_HELP.to_string()
            }
            None => String::new(),
        },
        AppView::Deploy => match &app.deploy {
            Some(deploy) => {
                let crumb = format!("Deploy › {}", deploy.service.short_name());
                Presenter::render_title_bar(&mut out, size, &crumb, &right)?;
                Presenter::render_deploy(&mut out, deploy, size, now)?;
                Presenter::deploy_footer(deploy).to_string()
            }
            None => String::new(),
        },
        AppView::Logs => match &app.logs {
            Some(logs) => {
                Presenter::render_title_bar(&mut out, size, &Presenter::logs_header(logs), &right)?;
                Presenter::render_logs(&mut out, logs, app.log_viewport())?;
                Presenter::logs_footer(logs).to_string()
            }
            None => String::new(),
        },
        AppView::Traffic => match &app.traffic {
            Some(traffic) => {
                let crumb = format!("Traffic › {}", traffic.service.short_name());
                Presenter::render_title_bar(&mut out, size, &crumb, &right)?;
                Presenter::render_traffic(&mut out, traffic, size)?;
                Presenter::traffic_footer(traffic).to_string()
            }
            None => String::new(),
        },
    };

    let error = if app.view == AppView::Dashboard { app.error.as_deref() } else { None };
    let line = status_line(error, app.status.as_deref(), app.warning.as_deref());
    Presenter::render_status(&mut out, size, line)?;
    Presenter::render_footer(&mut out, size, &footer)?;

    if app.show_help {
        Presenter::render_help(&mut out, app.view, size)?;
    }
    out.flush()
}
