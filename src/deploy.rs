//! Deploy workflow: pick a target, pick an image, confirm, then follow the
//! CI run until it completes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, info};

use crate::config::{RUN_DISCOVERY_DELAY, RUN_DISCOVERY_RETRY, RUN_POLL_INTERVAL};
use crate::error::FleetError;
use crate::model::{DeployTarget, Image, RunStatus, Service};

/// Key that confirms a production deploy. Distinct from Enter on purpose.
pub const CONFIRM_KEY: char = 'Y';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployStep {
    SelectTarget,
    SelectImage,
    Confirm,
    Progress,
}

/// Side effects the deploy workflow asks its owner to perform.
#[derive(Clone, Debug, PartialEq)]
pub enum DeployRequest {
    FetchImages { image_base: String },
    ResolveCommits(Vec<Image>),
    Trigger { workflow: String, inputs: Vec<(String, String)> },
    FindRun { workflow: String, since: DateTime<Utc> },
    PollRun { run_id: u64 },
    /// Deliver a poll tick after the delay.
    Tick(Duration),
    /// Status-line notice; the workflow stays open.
    Notice(String),
    /// Leave the deploy screen.
    Exit { message: Option<String>, refresh: bool },
}

#[derive(Clone, Debug)]
pub struct DeployState {
    pub session: u64,
    pub service: Service,
    pub all_workers: bool,
    pub step: DeployStep,
    pub target_cursor: usize,
    pub images: Vec<Image>,
    pub image_cursor: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub run_id: Option<u64>,
    pub run: Option<RunStatus>,
    pub next_hint: Option<String>,
}

/// Hint naming the service after `current` in the rollout chain.
pub fn next_in_chain(chain: &[String], current: &str) -> Option<String> {
    let idx = chain.iter().position(|s| s == current)?;
    chain
        .get(idx + 1)
        .map(|next| format!("Next: deploy {} (select it and press d)", next))
}

impl DeployState {
    /// Open the workflow for `service`. Services with a single target skip
    /// target selection and start loading images right away.
    pub fn start(session: u64, service: Service, all_workers: bool) -> (Self, Vec<DeployRequest>) {
        let mut state = Self {
            session,
            service,
            all_workers,
            step: DeployStep::SelectTarget,
            target_cursor: 0,
            images: Vec::new(),
            image_cursor: 0,
            loading: false,
            error: None,
            triggered_at: None,
            run_id: None,
            run: None,
            next_hint: None,
        };
        if state.service.targets.len() > 1 {
            return (state, Vec::new());
        }
        let requests = state.enter_image_select();
        (state, requests)
    }

    pub fn targets(&self) -> &[DeployTarget] {
        &self.service.targets
    }

    /// Selected target, falling back to the service's primary workflow.
    pub fn selected_target(&self) -> DeployTarget {
        self.service
            .targets
            .get(self.target_cursor)
            .cloned()
            .unwrap_or_else(|| DeployTarget {
                label: String::new(),
                workflow: self.service.workflow.clone(),
                workflow_input: self.service.workflow_input.clone(),
                image_base: self.service.image_base.clone(),
            })
    }

    pub fn selected_image(&self) -> Option<&Image> {
        self.images.get(self.image_cursor)
    }

    /// True when `image` is what the service currently runs.
    pub fn is_running(&self, image: &Image) -> bool {
        !self.service.image_digest.is_empty()
            && image.digest.trim_start_matches("sha256:").starts_with(&self.service.image_digest)
    }

    pub fn is_completed(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.is_completed())
    }

    fn enter_image_select(&mut self) -> Vec<DeployRequest> {
        self.step = DeployStep::SelectImage;
        self.images.clear();
        self.image_cursor = 0;
        self.error = None;
        self.loading = true;
        vec![DeployRequest::FetchImages { image_base: self.selected_target().image_base }]
    }

    pub fn handle_key(&mut self, key: &KeyEvent, now: DateTime<Utc>) -> Vec<DeployRequest> {
        match self.step {
            DeployStep::SelectTarget => self.target_key(key),
            DeployStep::SelectImage => self.image_key(key),
            DeployStep::Confirm => self.confirm_key(key, now),
            DeployStep::Progress => match key.code {
                KeyCode::Esc => {
                    let message = if self.is_completed() {
                        None
                    } else {
                        Some("Deploy continues on GitHub".to_string())
                    };
                    vec![DeployRequest::Exit { message, refresh: true }]
                }
                _ => Vec::new(),
            },
        }
    }

    fn target_key(&mut self, key: &KeyEvent) -> Vec<DeployRequest> {
        match key.code {
            KeyCode::Esc => vec![DeployRequest::Exit { message: None, refresh: false }],
            KeyCode::Up | KeyCode::Char('k') => {
                self.target_cursor = self.target_cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.target_cursor + 1 < self.service.targets.len() {
                    self.target_cursor += 1;
                }
                Vec::new()
            }
            KeyCode::Enter => self.enter_image_select(),
            _ => Vec::new(),
        }
    }

    fn image_key(&mut self, key: &KeyEvent) -> Vec<DeployRequest> {
        match key.code {
            KeyCode::Esc => {
                if self.service.targets.len() > 1 {
                    self.step = DeployStep::SelectTarget;
                    self.images.clear();
                    self.image_cursor = 0;
                    self.error = None;
                    self.loading = false;
                    Vec::new()
                } else {
                    vec![DeployRequest::Exit { message: None, refresh: false }]
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.image_cursor = self.image_cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.image_cursor + 1 < self.images.len() {
                    self.image_cursor += 1;
                }
                Vec::new()
            }
            KeyCode::Enter => {
                if !self.loading && self.error.is_none() && !self.images.is_empty() {
                    self.step = DeployStep::Confirm;
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn confirm_key(&mut self, key: &KeyEvent, now: DateTime<Utc>) -> Vec<DeployRequest> {
        let Some(image) = self.selected_image().cloned() else {
            self.step = DeployStep::SelectImage;
            return Vec::new();
        };
        if key.code != KeyCode::Char(CONFIRM_KEY) {
            self.step = DeployStep::SelectImage;
            return vec![DeployRequest::Notice("Deploy cancelled".to_string())];
        }
        let target = self.selected_target();
        self.step = DeployStep::Progress;
        self.triggered_at = Some(now);
        self.run_id = None;
        self.run = None;
        self.error = None;
        info!(
            service = %self.service.name,
            workflow = %target.workflow,
            digest = %image.digest,
            "deploy confirmed"
        );
        vec![DeployRequest::Trigger {
            workflow: target.workflow,
            inputs: vec![
                ("service".to_string(), target.workflow_input),
                ("tag".to_string(), image.digest),
            ],
        }]
    }

    /// Apply an image listing. Listings for any image source other than the
    /// selected target's are dropped.
    pub fn images_loaded(
        &mut self,
        image_base: &str,
        result: Result<Vec<Image>, FleetError>,
    ) -> Vec<DeployRequest> {
        if self.step != DeployStep::SelectImage {
            return Vec::new();
        }
        if self.selected_target().image_base != image_base {
            debug!(requested = image_base, "dropping image list for another target");
            return Vec::new();
        }
        self.loading = false;
        match result {
            Err(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }
            Ok(images) => {
                self.image_cursor = 0;
                let with_commits: Vec<Image> =
                    images.iter().filter(|i| i.commit_sha().is_some()).cloned().collect();
                self.images = images;
                if with_commits.is_empty() {
                    Vec::new()
                } else {
                    vec![DeployRequest::ResolveCommits(with_commits)]
                }
            }
        }
    }

    /// Attach commit summaries, keyed by image digest.
    pub fn commits_resolved(&mut self, summaries: Vec<(String, String)>) {
        for (digest, summary) in summaries {
            if let Some(image) = self.images.iter_mut().find(|i| i.digest == digest) {
                image.commit_summary = Some(summary);
            }
        }
    }

    pub fn triggered(&mut self, result: Result<(), FleetError>) -> Vec<DeployRequest> {
        if self.step != DeployStep::Progress {
            return Vec::new();
        }
        match result {
            Err(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }
            Ok(()) => vec![DeployRequest::Tick(RUN_DISCOVERY_DELAY)],
        }
    }

    pub fn poll_tick(&self) -> Vec<DeployRequest> {
        if self.step != DeployStep::Progress || self.error.is_some() || self.is_completed() {
            return Vec::new();
        }
        match (self.run_id, self.triggered_at) {
            (Some(run_id), _) => vec![DeployRequest::PollRun { run_id }],
            (None, Some(since)) => vec![DeployRequest::FindRun {
                workflow: self.selected_target().workflow,
                since,
            }],
            (None, None) => Vec::new(),
        }
    }

    pub fn run_found(&mut self, result: Result<Option<u64>, FleetError>) -> Vec<DeployRequest> {
        if self.step != DeployStep::Progress || self.run_id.is_some() {
            return Vec::new();
        }
        match result {
            Err(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }
            Ok(None) => vec![DeployRequest::Tick(RUN_DISCOVERY_RETRY)],
            Ok(Some(run_id)) => {
                info!(service = %self.service.name, run_id, "deploy run found");
                self.run_id = Some(run_id);
                vec![DeployRequest::PollRun { run_id }]
            }
        }
    }

    pub fn run_polled(
        &mut self,
        run_id: u64,
        result: Result<RunStatus, FleetError>,
        chain: &[String],
    ) -> Vec<DeployRequest> {
        if self.step != DeployStep::Progress || self.run_id != Some(run_id) {
            return Vec::new();
        }
        match result {
            Err(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }
            Ok(status) => {
                let done = status.is_completed();
                self.run = Some(status);
                if !done {
                    return vec![DeployRequest::Tick(RUN_POLL_INTERVAL)];
                }
                info!(service = %self.service.name, run_id, "deploy run completed");
                if !self.all_workers {
                    self.next_hint = next_in_chain(chain, &self.service.workflow_input);
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_rollout_chain, WorkerCatalog, IMAGE_BASE_WEB, IMAGE_BASE_WEB22, IMAGE_BASE_WORKER, IMAGE_BASE_WORKER22};
    use crate::naming::{all_workers_service, classified};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn image(digest: &str) -> Image {
        Image { digest: digest.to_string(), ..Default::default() }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn at_confirm() -> DeployState {
        let (mut ds, _) = DeployState::start(1, classified("web-stable-service", &WorkerCatalog::default()), false);
        ds.images_loaded(IMAGE_BASE_WEB, Ok(vec![image("sha256:aaa"), image("sha256:bbb")]));
        ds.handle_key(&key(KeyCode::Down), now());
        ds.handle_key(&key(KeyCode::Enter), now());
        assert_eq!(ds.step, DeployStep::Confirm);
        ds
    }

    #[test]
    fn single_target_skips_target_selection() {
        let (ds, reqs) = DeployState::start(1, classified("web-stable-service", &WorkerCatalog::default()), false);
        assert_eq!(ds.step, DeployStep::SelectImage);
        assert!(ds.loading);
        assert_eq!(reqs, vec![DeployRequest::FetchImages { image_base: "ghcr.io/dreamwidth/web".into() }]);
    }

    #[test]
    fn two_targets_fetch_images_for_chosen_target_only() {
        let (mut ds, reqs) = DeployState::start(1, classified("web-canary-service", &WorkerCatalog::default()), false);
        assert_eq!(ds.step, DeployStep::SelectTarget);
        assert!(reqs.is_empty());
        assert_eq!(ds.targets().len(), 2);

        ds.handle_key(&key(KeyCode::Down), now());
        let reqs = ds.handle_key(&key(KeyCode::Enter), now());
        assert_eq!(reqs, vec![DeployRequest::FetchImages { image_base: IMAGE_BASE_WEB22.into() }]);
        assert_eq!(ds.step, DeployStep::SelectImage);
    }

    #[test]
    fn enter_on_confirm_does_not_trigger() {
        let mut ds = at_confirm();
        let reqs = ds.handle_key(&key(KeyCode::Enter), now());
        assert_eq!(ds.step, DeployStep::SelectImage);
        assert_eq!(reqs, vec![DeployRequest::Notice("Deploy cancelled".into())]);
    }

    #[test]
    fn confirm_key_triggers_with_selected_image() {
        let mut ds = at_confirm();
        let reqs = ds.handle_key(&key(KeyCode::Char('Y')), now());
        assert_eq!(ds.step, DeployStep::Progress);
        assert_eq!(
            reqs,
            vec![DeployRequest::Trigger {
                workflow: "web-deploy.yml".into(),
                inputs: vec![("service".into(), "web-stable".into()), ("tag".into(), "sha256:bbb".into())],
            }]
        );
    }

    #[test]
    fn trigger_is_unreachable_without_confirm_step() {
        let (mut ds, _) = DeployState::start(1, classified("web-stable-service", &WorkerCatalog::default()), false);
        ds.images_loaded(IMAGE_BASE_WEB, Ok(vec![image("sha256:aaa")]));
        // 'Y' while selecting an image does nothing.
        assert!(ds.handle_key(&key(KeyCode::Char('Y')), now()).is_empty());
        assert_eq!(ds.step, DeployStep::SelectImage);
    }

    #[test]
    fn run_discovery_retries_then_polls_until_completed() {
        let mut ds = at_confirm();
        ds.handle_key(&key(KeyCode::Char('Y')), now());
        assert_eq!(ds.triggered(Ok(())), vec![DeployRequest::Tick(RUN_DISCOVERY_DELAY)]);
        assert!(matches!(ds.poll_tick().as_slice(), [DeployRequest::FindRun { .. }]));
        assert_eq!(ds.run_found(Ok(None)), vec![DeployRequest::Tick(RUN_DISCOVERY_RETRY)]);
        assert_eq!(ds.run_found(Ok(Some(42))), vec![DeployRequest::PollRun { run_id: 42 }]);

        let chain = default_rollout_chain();
        let running = RunStatus { status: "in_progress".into(), conclusion: String::new() };
        assert_eq!(ds.run_polled(42, Ok(running), &chain), vec![DeployRequest::Tick(RUN_POLL_INTERVAL)]);
        assert_eq!(ds.poll_tick(), vec![DeployRequest::PollRun { run_id: 42 }]);

        // A stale run id is ignored.
        let done = RunStatus { status: "completed".into(), conclusion: "success".into() };
        assert!(ds.run_polled(7, Ok(done.clone()), &chain).is_empty());
        assert!(!ds.is_completed());

        assert!(ds.run_polled(42, Ok(done), &chain).is_empty());
        assert!(ds.is_completed());
        // web-stable is last in the chain.
        assert_eq!(ds.next_hint, None);
        assert!(ds.poll_tick().is_empty());
    }

    #[test]
    fn completed_canary_suggests_next_service() {
        assert_eq!(
            next_in_chain(&default_rollout_chain(), "web-canary").as_deref(),
            Some("Next: deploy web-shop (select it and press d)")
        );
        assert_eq!(next_in_chain(&default_rollout_chain(), "worker-x"), None);
    }

    #[test]
    fn poll_error_stops_progression() {
        let mut ds = at_confirm();
        ds.handle_key(&key(KeyCode::Char('Y')), now());
        ds.triggered(Ok(()));
        ds.run_found(Err(FleetError::not_found("boom")));
        assert_eq!(ds.error.as_deref(), Some("boom"));
        assert!(ds.poll_tick().is_empty());
        let reqs = ds.handle_key(&key(KeyCode::Esc), now());
        assert_eq!(
            reqs,
            vec![DeployRequest::Exit { message: Some("Deploy continues on GitHub".into()), refresh: true }]
        );
    }

    #[test]
    fn image_select_escape_returns_to_targets_when_several() {
        let (mut ds, _) = DeployState::start(1, all_workers_service(), true);
        ds.handle_key(&key(KeyCode::Enter), now());
        ds.images_loaded(IMAGE_BASE_WORKER, Err(FleetError::not_found("registry down")));
        assert!(ds.error.is_some());
        assert!(ds.handle_key(&key(KeyCode::Esc), now()).is_empty());
        assert_eq!(ds.step, DeployStep::SelectTarget);
        assert!(ds.error.is_none());
    }

    #[test]
    fn late_image_list_for_previous_target_is_dropped() {
        let (mut ds, _) = DeployState::start(1, all_workers_service(), true);
        // worker, back out, then worker22 while the worker listing is in flight.
        ds.handle_key(&key(KeyCode::Enter), now());
        ds.handle_key(&key(KeyCode::Esc), now());
        ds.handle_key(&key(KeyCode::Down), now());
        let reqs = ds.handle_key(&key(KeyCode::Enter), now());
        assert_eq!(reqs, vec![DeployRequest::FetchImages { image_base: IMAGE_BASE_WORKER22.into() }]);

        assert!(ds.images_loaded(IMAGE_BASE_WORKER, Ok(vec![image("sha256:fromworker")])).is_empty());
        assert!(ds.images.is_empty());
        assert!(ds.loading);
        // Nothing to confirm until the right listing arrives.
        ds.handle_key(&key(KeyCode::Enter), now());
        assert_eq!(ds.step, DeployStep::SelectImage);

        ds.images_loaded(IMAGE_BASE_WORKER22, Ok(vec![image("sha256:fromworker22")]));
        ds.handle_key(&key(KeyCode::Enter), now());
        let reqs = ds.handle_key(&key(KeyCode::Char('Y')), now());
        assert_eq!(
            reqs,
            vec![DeployRequest::Trigger {
                workflow: "worker22-deploy.yml".into(),
                inputs: vec![
                    ("service".into(), "ALL WORKERS (*)".into()),
                    ("tag".into(), "sha256:fromworker22".into()),
                ],
            }]
        );
    }

    #[test]
    fn images_with_commit_tags_are_resolved() {
        let (mut ds, _) = DeployState::start(1, classified("web-stable-service", &WorkerCatalog::default()), false);
        let tagged = Image { digest: "sha256:ccc".into(), tags: vec!["sha-abcdef1".into()], ..Default::default() };
        let reqs = ds.images_loaded(IMAGE_BASE_WEB, Ok(vec![image("sha256:aaa"), tagged.clone()]));
        assert_eq!(reqs, vec![DeployRequest::ResolveCommits(vec![tagged])]);
        ds.commits_resolved(vec![("sha256:ccc".into(), "Fix login".into())]);
        assert_eq!(ds.images[1].commit_summary.as_deref(), Some("Fix login"));
    }

    #[test]
    fn running_image_is_marked() {
        let (mut ds, _) = DeployState::start(1, classified("web-stable-service", &WorkerCatalog::default()), false);
        ds.service.image_digest = "abcdef012345".into();
        assert!(ds.is_running(&image("sha256:abcdef0123456789")));
        assert!(!ds.is_running(&image("sha256:ffff")));
    }
}
