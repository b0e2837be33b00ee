use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::deploy::DeployState;
use crate::detail::DetailState;
use crate::logs::{LogViewport, LogsState};
use crate::model::{AppView, Service};
use crate::naming::skeleton_services;
use crate::rows::ServiceList;
use crate::traffic::TrafficState;

use super::message::Effect;

/// Lines the dashboard spends on title, separator, column header, status
/// line and footer.
pub const DASHBOARD_CHROME: u16 = 6;
/// Lines the logs screen spends on title, separator, status line and footer.
pub const LOGS_CHROME: u16 = 4;

/// The whole UI state. Owned by the main loop and only mutated by
/// `App::update`.
pub struct App {
    pub config: Config,
    pub view: AppView,
    pub services: ServiceList,
    /// Phase one is in flight.
    pub loading: bool,
    /// Phase two is in flight.
    pub enriching: bool,
    /// Phase-one failure banner.
    pub error: Option<String>,
    /// Phase-two failure, shown without hiding data.
    pub warning: Option<String>,
    pub status: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub filter_active: bool,
    pub show_help: bool,
    pub detail: Option<DetailState>,
    pub deploy: Option<DeployState>,
    /// Screen to return to when the deploy workflow exits.
    pub deploy_return: AppView,
    pub logs: Option<LogsState>,
    pub traffic: Option<TrafficState>,
    pub size: (u16, u16),
    next_session: u64,
}

impl App {
    pub fn new(config: Config) -> Self {
        let services = ServiceList::new(skeleton_services(&config.workers));
        Self {
            config,
            view: AppView::Dashboard,
            services,
            loading: false,
            enriching: false,
            error: None,
            warning: None,
            status: None,
            last_refresh: None,
            filter_active: false,
            show_help: false,
            detail: None,
            deploy: None,
            deploy_return: AppView::Dashboard,
            logs: None,
            traffic: None,
            size: (80, 24),
            next_session: 0,
        }
    }

    /// First fetch plus the self-re-arming refresh timer.
    pub fn init(&mut self) -> Vec<Effect> {
        let mut effects = self.start_refresh();
        effects.push(self.schedule_refresh());
        effects
    }

    pub(crate) fn new_session(&mut self) -> u64 {
        self.next_session += 1;
        self.next_session
    }

    /// Start a listing unless either refresh phase is still running.
    pub(crate) fn start_refresh(&mut self) -> Vec<Effect> {
        if self.is_busy() {
            return Vec::new();
        }
        self.loading = true;
        vec![Effect::FetchServices]
    }

    pub(crate) fn schedule_refresh(&self) -> Effect {
        Effect::Schedule {
            after: self.config.refresh_interval,
            msg: super::Msg::RefreshTick,
        }
    }

    /// Service rows that fit on the dashboard.
    pub fn dashboard_viewport(&self) -> usize {
        self.size.1.saturating_sub(DASHBOARD_CHROME).max(1) as usize
    }

    pub fn log_viewport(&self) -> LogViewport {
        LogViewport::new(self.size.0 as usize, self.size.1.saturating_sub(LOGS_CHROME) as usize)
    }

    pub fn selected_service(&self) -> Option<&Service> {
        self.services.selected()
    }

    /// The service the current screen is about.
    pub fn focused_service(&self) -> Option<&Service> {
        match self.view {
            AppView::Detail => self.detail.as_ref().map(|d| &d.service),
            _ => self.selected_service(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.enriching
    }
}
