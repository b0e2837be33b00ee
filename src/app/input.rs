use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::detail::DetailAction;
use crate::logs::LogsAction;
use crate::model::AppView;

use super::message::Effect;
use super::App;

/// Route a key to the help overlay, the filter prompt or the active screen.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    if key.kind == KeyEventKind::Release {
        return Vec::new();
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return vec![Effect::Quit];
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Vec::new();
    }
    if app.filter_active {
        handle_filter(app, key.code);
        return Vec::new();
    }
    if key.code == KeyCode::Char('?') && !text_entry_active(app) {
        app.show_help = true;
        return Vec::new();
    }

    match app.view {
        AppView::Dashboard => handle_dashboard(app, key.code),
        AppView::Detail => handle_detail(app, &key),
        AppView::Deploy => handle_deploy(app, &key),
        AppView::Logs => handle_logs(app, &key),
        AppView::Traffic => handle_traffic(app, &key),
    }
}

/// True while a screen is reading free text, so '?' is typed rather than
/// opening help.
fn text_entry_active(app: &App) -> bool {
    app.view == AppView::Logs && app.logs.as_ref().is_some_and(|l| l.search_active)
}

fn handle_filter(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Enter => app.filter_active = false,
        KeyCode::Esc => {
            app.filter_active = false;
            app.services.set_filter("");
        }
        KeyCode::Backspace => {
            let mut filter = app.services.filter.clone();
            filter.pop();
            app.services.set_filter(&filter);
        }
        KeyCode::Char(c) => {
            let mut filter = app.services.filter.clone();
            filter.push(c);
            app.services.set_filter(&filter);
        }
        _ => {}
    }
}

fn handle_dashboard(app: &mut App, code: KeyCode) -> Vec<Effect> {
    let viewport = app.dashboard_viewport();
    app.status = None;
    match code {
        KeyCode::Char('q') => return vec![Effect::Quit],
        KeyCode::Up | KeyCode::Char('k') => app.services.move_cursor(-1, viewport),
        KeyCode::Down | KeyCode::Char('j') => app.services.move_cursor(1, viewport),
        KeyCode::PageUp => app.services.page(-1, viewport),
        KeyCode::PageDown => app.services.page(1, viewport),
        KeyCode::Char('/') => app.filter_active = true,
        KeyCode::Esc => {
            if !app.services.filter.is_empty() {
                app.services.set_filter("");
            }
        }
        KeyCode::Char('r') => {
            if app.is_busy() {
                app.status = Some("Refresh already in progress".to_string());
            } else {
                return app.start_refresh();
            }
        }
        KeyCode::Char('D') => return app.open_all_workers_deploy(),
        KeyCode::Enter | KeyCode::Char('d') | KeyCode::Char('l') | KeyCode::Char('t') | KeyCode::Char('s') => {
            let Some(service) = app.selected_service().cloned() else {
                return Vec::new();
            };
            return match code {
                KeyCode::Enter => app.open_detail(service),
                KeyCode::Char('d') => app.open_deploy(service, false),
                KeyCode::Char('l') => app.open_logs(service),
                KeyCode::Char('t') => app.open_traffic(service),
                _ => app.open_shell(&service),
            };
        }
        _ => {}
    }
    Vec::new()
}

fn handle_detail(app: &mut App, key: &KeyEvent) -> Vec<Effect> {
    let Some(detail) = app.detail.as_mut() else {
        app.view = AppView::Dashboard;
        return Vec::new();
    };
    app.status = None;
    let service = detail.service.clone();
    match detail.handle_key(key) {
        DetailAction::None => Vec::new(),
        DetailAction::Back => {
            app.detail = None;
            app.view = AppView::Dashboard;
            Vec::new()
        }
        DetailAction::Refresh => app.refresh_detail(),
        DetailAction::Shell(task) => vec![Effect::LaunchShell(app.shell_target(&task))],
        DetailAction::Deploy => app.open_deploy(service, false),
        DetailAction::Logs => app.open_logs(service),
        DetailAction::Traffic => app.open_traffic(service),
    }
}

fn handle_deploy(app: &mut App, key: &KeyEvent) -> Vec<Effect> {
    let Some(deploy) = app.deploy.as_mut() else {
        app.view = app.deploy_return;
        return Vec::new();
    };
    let requests = deploy.handle_key(key, Utc::now());
    app.deploy_requests(requests)
}

fn handle_logs(app: &mut App, key: &KeyEvent) -> Vec<Effect> {
    let viewport = app.log_viewport();
    let Some(logs) = app.logs.as_mut() else {
        app.view = AppView::Dashboard;
        return Vec::new();
    };
    match logs.handle_key(key, viewport) {
        LogsAction::None => Vec::new(),
        LogsAction::Exit => {
            app.close_logs();
            Vec::new()
        }
        LogsAction::ScheduleTail(generation) => match logs.tail_request(generation) {
            Some(after_ms) => vec![Effect::FetchLogsSince {
                session: logs.session,
                generation,
                log_group: logs.log_group.clone(),
                after_ms,
            }],
            None => Vec::new(),
        },
    }
}

fn handle_traffic(app: &mut App, key: &KeyEvent) -> Vec<Effect> {
    let Some(traffic) = app.traffic.as_mut() else {
        app.view = AppView::Dashboard;
        return Vec::new();
    };
    let action = traffic.handle_key(key);
    app.traffic_action(action)
}
