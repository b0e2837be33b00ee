//! The reducer: one message in, state transitions and effects out.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::LOG_TAIL_INTERVAL;
use crate::deploy::{DeployRequest, DeployState};
use crate::detail::DetailState;
use crate::logs::LogsState;
use crate::model::{AppView, Service, ServiceGroup, Task};
use crate::naming::{all_workers_service, log_group_for_service};
use crate::refresh::{carry_forward_digests, merge_digests};
use crate::rows::ensure_visible;
use crate::shell::ShellTarget;
use crate::traffic::{TrafficAction, TrafficState};

use super::message::{Effect, Msg};
use super::App;

impl App {
    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Key(key) => super::input::handle_key(self, key),
            Msg::Resize(cols, rows) => {
                self.size = (cols, rows);
                let viewport = self.dashboard_viewport();
                let list = &mut self.services;
                list.scroll = ensure_visible(&list.rows, list.cursor, list.scroll, viewport);
                let log_viewport = self.log_viewport();
                if let Some(logs) = self.logs.as_mut() {
                    logs.clamp_scroll(log_viewport);
                }
                Vec::new()
            }
            Msg::RefreshTick => {
                let mut effects = Vec::new();
                if self.view == AppView::Dashboard {
                    effects = self.start_refresh();
                }
                effects.push(self.schedule_refresh());
                effects
            }
            Msg::ServicesListed(result) => self.services_listed(result),
            Msg::DigestsResolved(result) => {
                self.digests_resolved(result);
                Vec::new()
            }
            Msg::TasksLoaded { session, result } => {
                if let Some(detail) = self.detail.as_mut().filter(|d| d.session == session) {
                    detail.tasks_loaded(result);
                }
                Vec::new()
            }
            Msg::DetailRefreshed { session, result } => {
                if let Some(detail) = self.detail.as_mut().filter(|d| d.session == session) {
                    let result = result.map(|(mut service, tasks)| {
                        if let Some(svc) = service.as_mut() {
                            carry_forward_digests(std::slice::from_mut(svc), std::slice::from_ref(&detail.service));
                        }
                        (service, tasks)
                    });
                    detail.refreshed(result);
                }
                Vec::new()
            }
            Msg::ShellTaskResolved(result) => match result {
                Ok(task) => vec![Effect::LaunchShell(self.shell_target(&task))],
                Err(e) => {
                    self.status = Some(e.to_string());
                    Vec::new()
                }
            },
            Msg::ShellExited(result) => {
                self.status = Some(match result {
                    Ok(()) => "Shell session ended".to_string(),
                    Err(e) => format!("Shell failed: {}", e),
                });
                Vec::new()
            }
            Msg::ImagesLoaded { session, image_base, result } => match self.deploy_session(session) {
                Some(deploy) => {
                    let requests = deploy.images_loaded(&image_base, result);
                    self.deploy_requests(requests)
                }
                None => Vec::new(),
            },
            Msg::CommitsResolved { session, result } => {
                if let Some(deploy) = self.deploy_session(session) {
                    match result {
                        Ok(summaries) => deploy.commits_resolved(summaries),
                        Err(e) => debug!(error = %e, "commit summaries unavailable"),
                    }
                }
                Vec::new()
            }
            Msg::WorkflowTriggered { session, result } => match self.deploy_session(session) {
                Some(deploy) => {
                    if result.is_ok() {
                        info!(service = %deploy.service.name, "deploy workflow triggered");
                    }
                    let requests = deploy.triggered(result);
                    self.deploy_requests(requests)
                }
                None => Vec::new(),
            },
            Msg::DeployTick { session } => match self.deploy_session(session) {
                Some(deploy) => {
                    let requests = deploy.poll_tick();
                    self.deploy_requests(requests)
                }
                None => Vec::new(),
            },
            Msg::RunFound { session, result } => match self.deploy_session(session) {
                Some(deploy) => {
                    let requests = deploy.run_found(result);
                    self.deploy_requests(requests)
                }
                None => Vec::new(),
            },
            Msg::RunPolled { session, run_id, result } => {
                let chain = self.config.rollout_chain.clone();
                match self.deploy_session(session) {
                    Some(deploy) => {
                        let requests = deploy.run_polled(run_id, result, &chain);
                        self.deploy_requests(requests)
                    }
                    None => Vec::new(),
                }
            }
            Msg::LogsLoaded { session, window_start_ms, result } => {
                let viewport = self.log_viewport();
                let Some(logs) = self.logs.as_mut().filter(|l| l.session == session) else {
                    return Vec::new();
                };
                match logs.loaded(result, window_start_ms, viewport) {
                    Some(generation) => vec![tail_tick(session, generation)],
                    None => Vec::new(),
                }
            }
            Msg::LogTailTick { session, generation } => {
                let Some(logs) = self.logs.as_ref().filter(|l| l.session == session) else {
                    return Vec::new();
                };
                match logs.tail_request(generation) {
                    Some(after_ms) => vec![Effect::FetchLogsSince {
                        session,
                        generation,
                        log_group: logs.log_group.clone(),
                        after_ms,
                    }],
                    None => Vec::new(),
                }
            }
            Msg::LogsTailed { session, generation, result } => {
                let viewport = self.log_viewport();
                let Some(logs) = self.logs.as_mut().filter(|l| l.session == session) else {
                    return Vec::new();
                };
                if logs.tailed(generation, result, viewport) {
                    vec![tail_tick(session, generation)]
                } else {
                    Vec::new()
                }
            }
            Msg::TrafficFetched { session, result } => {
                if let Some(traffic) = self.traffic.as_mut().filter(|t| t.session == session) {
                    traffic.fetched(result);
                }
                Vec::new()
            }
            Msg::TrafficApplied { session, result } => {
                let Some(traffic) = self.traffic.as_mut().filter(|t| t.session == session) else {
                    return Vec::new();
                };
                let action = traffic.applied(result);
                self.traffic_action(action)
            }
        }
    }

    fn services_listed(&mut self, result: crate::error::Result<Vec<Service>>) -> Vec<Effect> {
        self.loading = false;
        match result {
            Err(e) => {
                warn!(error = %e, "service refresh failed");
                self.error = Some(e.to_string());
                Vec::new()
            }
            Ok(mut fresh) => {
                carry_forward_digests(&mut fresh, &self.services.services);
                let viewport = self.dashboard_viewport();
                self.services.replace_services(fresh, viewport);
                self.error = None;
                self.last_refresh = Some(Utc::now());
                self.sync_detail_service();
                self.enriching = true;
                vec![Effect::EnrichDigests(self.services.services.clone())]
            }
        }
    }

    fn digests_resolved(&mut self, result: crate::error::Result<Vec<Service>>) {
        self.enriching = false;
        match result {
            Err(e) => {
                warn!(error = %e, "image digest enrichment failed");
                self.warning = Some(format!("Image digests unavailable: {}", e));
            }
            Ok(enriched) => {
                let mut services = std::mem::take(&mut self.services.services);
                let changed = merge_digests(&mut services, &enriched);
                debug!(changed, "merged image digests");
                let viewport = self.dashboard_viewport();
                self.services.replace_services(services, viewport);
                self.warning = None;
                self.sync_detail_service();
            }
        }
    }

    /// Carry a dashboard merge into the open detail screen.
    fn sync_detail_service(&mut self) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        if let Some(fresh) = self.services.find(&detail.service.name) {
            let mut fresh = fresh.clone();
            carry_forward_digests(std::slice::from_mut(&mut fresh), std::slice::from_ref(&detail.service));
            detail.service = fresh;
        }
    }

    fn deploy_session(&mut self, session: u64) -> Option<&mut DeployState> {
        self.deploy.as_mut().filter(|d| d.session == session)
    }

    pub(crate) fn shell_target(&self, task: &Task) -> ShellTarget {
        ShellTarget::for_task(&self.config.cluster, &self.config.region, task)
    }

    pub(crate) fn open_detail(&mut self, service: Service) -> Vec<Effect> {
        let session = self.new_session();
        let name = service.name.clone();
        self.detail = Some(DetailState::new(session, service));
        self.view = AppView::Detail;
        vec![Effect::FetchTasks { session, service: name }]
    }

    pub(crate) fn refresh_detail(&self) -> Vec<Effect> {
        match &self.detail {
            Some(detail) => vec![Effect::RefreshDetail {
                session: detail.session,
                service: detail.service.name.clone(),
            }],
            None => Vec::new(),
        }
    }

    pub(crate) fn open_deploy(&mut self, service: Service, all_workers: bool) -> Vec<Effect> {
        if !service.is_deployable() {
            self.status = Some(format!("{} has no deploy target", service.short_name()));
            return Vec::new();
        }
        let session = self.new_session();
        let (state, requests) = DeployState::start(session, service, all_workers);
        self.deploy = Some(state);
        self.deploy_return = self.view;
        self.view = AppView::Deploy;
        self.deploy_requests(requests)
    }

    pub(crate) fn open_all_workers_deploy(&mut self) -> Vec<Effect> {
        self.open_deploy(all_workers_service(), true)
    }

    pub(crate) fn open_logs(&mut self, service: Service) -> Vec<Effect> {
        let Some(log_group) = log_group_for_service(&service) else {
            self.status = Some(format!("No log group for {}", service.short_name()));
            return Vec::new();
        };
        let session = self.new_session();
        debug!(group = %log_group, "opening logs");
        self.logs = Some(LogsState::new(session, service, log_group.clone(), self.view));
        self.view = AppView::Logs;
        vec![Effect::FetchLogWindow { session, log_group }]
    }

    pub(crate) fn close_logs(&mut self) {
        if let Some(logs) = self.logs.take() {
            self.view = logs.prev_view;
        }
    }

    pub(crate) fn open_traffic(&mut self, service: Service) -> Vec<Effect> {
        if service.group != ServiceGroup::Web {
            self.status = Some("Traffic editing is only available for web services".to_string());
            return Vec::new();
        }
        let session = self.new_session();
        let service_key = service.short_name().to_string();
        self.traffic = Some(TrafficState::new(session, service, self.view));
        self.view = AppView::Traffic;
        vec![Effect::FetchTraffic { session, service_key }]
    }

    pub(crate) fn traffic_action(&mut self, action: TrafficAction) -> Vec<Effect> {
        match action {
            TrafficAction::None => Vec::new(),
            TrafficAction::Apply(rule) => match &self.traffic {
                Some(traffic) => vec![Effect::ApplyTraffic { session: traffic.session, rule }],
                None => Vec::new(),
            },
            TrafficAction::Exit(message) => {
                if let Some(traffic) = self.traffic.take() {
                    self.view = traffic.prev_view;
                }
                if message.is_some() {
                    self.status = message;
                }
                Vec::new()
            }
        }
    }

    pub(crate) fn open_shell(&mut self, service: &Service) -> Vec<Effect> {
        self.status = Some(format!("Finding a task for {}...", service.short_name()));
        vec![Effect::ResolveShellTask { service: service.name.clone() }]
    }

    /// Turn deploy workflow requests into effects.
    pub(crate) fn deploy_requests(&mut self, requests: Vec<DeployRequest>) -> Vec<Effect> {
        let Some(session) = self.deploy.as_ref().map(|d| d.session) else {
            return Vec::new();
        };
        let mut effects = Vec::new();
        for request in requests {
            match request {
                DeployRequest::FetchImages { image_base } => {
                    effects.push(Effect::FetchImages { session, image_base });
                }
                DeployRequest::ResolveCommits(images) => {
                    effects.push(Effect::ResolveCommits { session, images });
                }
                DeployRequest::Trigger { workflow, inputs } => {
                    effects.push(Effect::TriggerWorkflow { session, workflow, inputs });
                }
                DeployRequest::FindRun { workflow, since } => {
                    effects.push(Effect::FindRun { session, workflow, since });
                }
                DeployRequest::PollRun { run_id } => effects.push(Effect::PollRun { session, run_id }),
                DeployRequest::Tick(after) => effects.push(Effect::Schedule {
                    after,
                    msg: Msg::DeployTick { session },
                }),
                DeployRequest::Notice(text) => self.status = Some(text),
                DeployRequest::Exit { message, refresh } => {
                    let hint = self.deploy.take().and_then(|d| d.next_hint);
                    self.view = self.deploy_return;
                    self.status = message.or(hint);
                    if refresh {
                        effects.extend(self.start_refresh());
                        if self.view == AppView::Detail {
                            effects.extend(self.refresh_detail());
                        }
                    }
                }
            }
        }
        effects
    }
}

fn tail_tick(session: u64, generation: u64) -> Effect {
    Effect::Schedule {
        after: LOG_TAIL_INTERVAL,
        msg: Msg::LogTailTick { session, generation },
    }
}
