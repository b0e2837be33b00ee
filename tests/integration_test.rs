//! End-to-end tests for the reducer and the effect executor, driven through
//! fake fleet and CI collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use fleetdash::app::{App, Effect, Executor, Msg};
use fleetdash::ci::CiClient;
use fleetdash::config::{
    Config, WorkerCatalog, IMAGE_BASE_WEB22, IMAGE_BASE_WORKER, IMAGE_BASE_WORKER22, LOG_TAIL_INTERVAL,
    RUN_DISCOVERY_DELAY, RUN_DISCOVERY_RETRY,
};
use fleetdash::deploy::DeployStep;
use fleetdash::error::{FleetError, Result};
use fleetdash::fleet::FleetClient;
use fleetdash::model::{
    AppView, Image, LogBatch, LogEvent, RunStatus, Service, TargetGroupWeight, Task, TrafficRule,
};
use fleetdash::naming::classified;
use fleetdash::traffic::TrafficStep;

fn key(code: KeyCode) -> Msg {
    Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn ch(c: char) -> Msg {
    key(KeyCode::Char(c))
}

fn service(name: &str, running: u32, desired: u32) -> Service {
    let mut svc = classified(name, &WorkerCatalog::default());
    svc.status = "ACTIVE".to_string();
    svc.running_count = running;
    svc.desired_count = desired;
    svc
}

fn fleet_snapshot() -> Vec<Service> {
    vec![
        service("web-canary-service", 1, 1),
        service("web-stable-service", 4, 4),
        service("proxy-service", 2, 2),
    ]
}

fn event(ms: i64, message: &str) -> LogEvent {
    LogEvent {
        timestamp: DateTime::from_timestamp_millis(ms).unwrap(),
        stream: "web/abc".to_string(),
        message: message.to_string(),
    }
}

fn canary_rule() -> TrafficRule {
    let target = |name: &str, weight: u32| TargetGroupWeight {
        arn: format!("arn:aws:elasticloadbalancing:tg/{}/1", name),
        name: name.to_string(),
        weight,
    };
    TrafficRule {
        rule_arn: "arn:rule/10".to_string(),
        listener_arn: "arn:listener/443".to_string(),
        is_default: false,
        service_key: "web-canary".to_string(),
        label: "Rule 10".to_string(),
        targets: vec![target("web-canary-tg", 100), target("web-canary-2-tg", 0), target("dw-maint", 0)],
    }
}

/// App with one successful phase-one refresh applied.
fn loaded_app() -> App {
    let mut app = App::new(Config::default());
    app.update(Msg::ServicesListed(Ok(fleet_snapshot())));
    app.update(Msg::DigestsResolved(Err(FleetError::not_found("skip"))));
    app
}

fn select(app: &mut App, name: &str) {
    for _ in 0..app.services.rows.len() {
        if app.selected_service().is_some_and(|s| s.name == name) {
            return;
        }
        app.update(ch('j'));
    }
    panic!("{} not on the dashboard", name);
}

#[test]
fn init_fetches_and_arms_refresh_timer() {
    let mut app = App::new(Config::default());
    let effects = app.init();
    assert!(matches!(effects[0], Effect::FetchServices));
    assert!(matches!(
        &effects[1],
        Effect::Schedule { after, msg: Msg::RefreshTick } if *after == Duration::from_secs(30)
    ));
    assert!(app.loading);

    // A second manual refresh is refused while the first is in flight.
    assert!(app.update(ch('r')).is_empty());
    assert_eq!(app.status.as_deref(), Some("Refresh already in progress"));
}

#[test]
fn refresh_tick_always_rearms_but_only_fetches_on_dashboard() {
    let mut app = loaded_app();
    let effects = app.update(Msg::RefreshTick);
    assert!(matches!(effects.as_slice(), [Effect::FetchServices, Effect::Schedule { .. }]));

    app.update(Msg::ServicesListed(Ok(fleet_snapshot())));
    app.update(key(KeyCode::Enter));
    assert_eq!(app.view, AppView::Detail);
    let effects = app.update(Msg::RefreshTick);
    assert!(matches!(effects.as_slice(), [Effect::Schedule { .. }]));
}

#[test]
fn two_phase_refresh_keeps_cursor_and_digests() {
    let mut app = loaded_app();
    select(&mut app, "web-stable-service");

    let effects = app.update(Msg::ServicesListed(Ok(fleet_snapshot())));
    assert!(matches!(effects.as_slice(), [Effect::EnrichDigests(s)] if s.len() == 3));
    assert!(app.enriching);

    let mut enriched = fleet_snapshot();
    enriched[1].image_digest = "abcdef012345".to_string();
    assert!(app.update(Msg::DigestsResolved(Ok(enriched))).is_empty());
    assert!(!app.is_busy());
    assert_eq!(app.warning, None);

    // Phase one alone never blanks the known digest.
    app.update(Msg::ServicesListed(Ok(fleet_snapshot())));
    let selected = app.selected_service().unwrap();
    assert_eq!(selected.name, "web-stable-service");
    assert_eq!(selected.image_digest, "abcdef012345");

    // A failed enrichment keeps the data and only warns.
    app.update(Msg::DigestsResolved(Err(FleetError::not_found("registry down"))));
    assert_eq!(app.warning.as_deref(), Some("Image digests unavailable: registry down"));
    assert_eq!(app.selected_service().unwrap().image_digest, "abcdef012345");
}

#[test]
fn no_new_refresh_while_digests_are_still_resolving() {
    let mut app = loaded_app();
    let first = fleet_snapshot();
    let effects = app.update(Msg::ServicesListed(Ok(first)));
    assert!(matches!(effects.as_slice(), [Effect::EnrichDigests(_)]));
    assert!(!app.loading);
    assert!(app.enriching);

    // Neither the timer nor the key starts a second overlapping refresh.
    let effects = app.update(Msg::RefreshTick);
    assert!(matches!(effects.as_slice(), [Effect::Schedule { msg: Msg::RefreshTick, .. }]));
    assert!(app.update(ch('r')).is_empty());
    assert_eq!(app.status.as_deref(), Some("Refresh already in progress"));

    let mut enriched = fleet_snapshot();
    enriched[0].image_digest = "0123456789ab".to_string();
    app.update(Msg::DigestsResolved(Ok(enriched)));
    assert!(!app.is_busy());
    assert!(matches!(app.update(ch('r')).as_slice(), [Effect::FetchServices]));
}

#[test]
fn failed_listing_shows_error_and_keeps_services() {
    let mut app = loaded_app();
    let before = app.services.services.len();
    let effects = app.update(Msg::ServicesListed(Err(FleetError::not_found("AccessDenied"))));
    assert!(effects.is_empty());
    assert_eq!(app.error.as_deref(), Some("AccessDenied"));
    assert_eq!(app.services.services.len(), before);
    assert!(!app.loading);
}

#[test]
fn stale_task_results_are_dropped() {
    let mut app = loaded_app();
    select(&mut app, "web-stable-service");
    let effects = app.update(key(KeyCode::Enter));
    let session = match effects.as_slice() {
        [Effect::FetchTasks { session, service }] => {
            assert_eq!(service, "web-stable-service");
            *session
        }
        other => panic!("unexpected effects {:?}", other),
    };

    let task = Task { id: "abc123".to_string(), service: "web-stable-service".to_string(), ..Default::default() };
    app.update(Msg::TasksLoaded { session: session + 1, result: Ok(vec![task.clone()]) });
    assert!(app.detail.as_ref().unwrap().tasks.is_empty());

    app.update(Msg::TasksLoaded { session, result: Ok(vec![task]) });
    assert_eq!(app.detail.as_ref().unwrap().tasks.len(), 1);

    app.update(key(KeyCode::Esc));
    assert_eq!(app.view, AppView::Dashboard);
    assert!(app.detail.is_none());
    assert!(app.update(Msg::TasksLoaded { session, result: Ok(Vec::new()) }).is_empty());
}

#[test]
fn canary_deploy_runs_through_target_image_confirm_and_progress() {
    let mut app = loaded_app();
    select(&mut app, "web-canary-service");

    assert!(app.update(ch('d')).is_empty());
    assert_eq!(app.view, AppView::Deploy);
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::SelectTarget);

    app.update(ch('j'));
    let effects = app.update(key(KeyCode::Enter));
    let session = match effects.as_slice() {
        [Effect::FetchImages { session, image_base }] => {
            assert_eq!(image_base, IMAGE_BASE_WEB22);
            *session
        }
        other => panic!("unexpected effects {:?}", other),
    };

    let images = vec![
        Image { digest: "sha256:1111".to_string(), tags: vec!["sha-abcdef1".to_string()], ..Default::default() },
        Image { digest: "sha256:2222".to_string(), ..Default::default() },
    ];
    let effects = app.update(Msg::ImagesLoaded { session, image_base: IMAGE_BASE_WEB22.to_string(), result: Ok(images) });
    assert!(matches!(effects.as_slice(), [Effect::ResolveCommits { images, .. }] if images.len() == 1));
    app.update(Msg::CommitsResolved { session, result: Ok(vec![("sha256:1111".to_string(), "Fix login".to_string())]) });
    assert_eq!(app.deploy.as_ref().unwrap().images[0].commit_summary.as_deref(), Some("Fix login"));

    // Enter on the confirmation cancels; only the confirm key triggers.
    app.update(key(KeyCode::Enter));
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::Confirm);
    assert!(app.update(key(KeyCode::Enter)).is_empty());
    assert_eq!(app.status.as_deref(), Some("Deploy cancelled"));
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::SelectImage);

    app.update(key(KeyCode::Enter));
    let effects = app.update(ch('Y'));
    match effects.as_slice() {
        [Effect::TriggerWorkflow { workflow, inputs, .. }] => {
            assert_eq!(workflow, "web22-deploy.yml");
            assert_eq!(
                inputs,
                &vec![
                    ("service".to_string(), "web-canary".to_string()),
                    ("tag".to_string(), "sha256:1111".to_string()),
                ]
            );
        }
        other => panic!("unexpected effects {:?}", other),
    }

    let effects = app.update(Msg::WorkflowTriggered { session, result: Ok(()) });
    assert!(matches!(
        &effects[..],
        [Effect::Schedule { after, msg: Msg::DeployTick { .. } }] if *after == RUN_DISCOVERY_DELAY
    ));
    let effects = app.update(Msg::DeployTick { session });
    assert!(matches!(&effects[..], [Effect::FindRun { workflow, .. }] if workflow == "web22-deploy.yml"));
    let effects = app.update(Msg::RunFound { session, result: Ok(None) });
    assert!(matches!(&effects[..], [Effect::Schedule { after, .. }] if *after == RUN_DISCOVERY_RETRY));
    let effects = app.update(Msg::RunFound { session, result: Ok(Some(77)) });
    assert!(matches!(&effects[..], [Effect::PollRun { run_id: 77, .. }]));

    // Results for another session are ignored.
    let done = RunStatus { status: "completed".to_string(), conclusion: "success".to_string() };
    assert!(app.update(Msg::RunPolled { session: session + 5, run_id: 77, result: Ok(done.clone()) }).is_empty());
    assert!(!app.deploy.as_ref().unwrap().is_completed());

    assert!(app.update(Msg::RunPolled { session, run_id: 77, result: Ok(done) }).is_empty());
    assert!(app.deploy.as_ref().unwrap().is_completed());

    let effects = app.update(key(KeyCode::Esc));
    assert_eq!(app.view, AppView::Dashboard);
    assert!(app.deploy.is_none());
    assert_eq!(app.status.as_deref(), Some("Next: deploy web-shop (select it and press d)"));
    assert!(matches!(effects.as_slice(), [Effect::FetchServices]));
}

#[test]
fn single_target_service_goes_straight_to_images() {
    let mut app = loaded_app();
    select(&mut app, "web-stable-service");
    let effects = app.update(ch('d'));
    assert!(matches!(
        effects.as_slice(),
        [Effect::FetchImages { image_base, .. }] if image_base == "ghcr.io/dreamwidth/web"
    ));
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::SelectImage);

    // Escape from the only step returns without refreshing.
    assert!(app.update(key(KeyCode::Esc)).is_empty());
    assert_eq!(app.view, AppView::Dashboard);
}

#[test]
fn all_workers_deploy_offers_both_worker_tracks() {
    let mut app = loaded_app();
    assert!(app.update(ch('D')).is_empty());
    let deploy = app.deploy.as_ref().unwrap();
    assert_eq!(deploy.step, DeployStep::SelectTarget);
    assert_eq!(deploy.targets().len(), 2);
    assert!(deploy.all_workers);
}

#[test]
fn late_images_for_an_abandoned_target_are_ignored() {
    let mut app = loaded_app();
    app.update(ch('D'));
    let effects = app.update(key(KeyCode::Enter));
    let session = match effects.as_slice() {
        [Effect::FetchImages { session, image_base }] => {
            assert_eq!(image_base, IMAGE_BASE_WORKER);
            *session
        }
        other => panic!("unexpected effects {:?}", other),
    };
    app.update(key(KeyCode::Esc));
    app.update(key(KeyCode::Down));
    let effects = app.update(key(KeyCode::Enter));
    assert!(matches!(
        effects.as_slice(),
        [Effect::FetchImages { image_base, .. }] if image_base == IMAGE_BASE_WORKER22
    ));

    // The worker listing lands after the switch.
    let stale = vec![Image { digest: "sha256:worker".to_string(), ..Default::default() }];
    let effects = app.update(Msg::ImagesLoaded { session, image_base: IMAGE_BASE_WORKER.to_string(), result: Ok(stale) });
    assert!(effects.is_empty());
    let deploy = app.deploy.as_ref().unwrap();
    assert!(deploy.images.is_empty());
    assert!(deploy.loading);
    app.update(key(KeyCode::Enter));
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::SelectImage);

    let fresh = vec![Image { digest: "sha256:worker22".to_string(), ..Default::default() }];
    app.update(Msg::ImagesLoaded { session, image_base: IMAGE_BASE_WORKER22.to_string(), result: Ok(fresh) });
    app.update(key(KeyCode::Enter));
    assert_eq!(app.deploy.as_ref().unwrap().step, DeployStep::Confirm);
    match app.update(ch('Y')).as_slice() {
        [Effect::TriggerWorkflow { workflow, inputs, .. }] => {
            assert_eq!(workflow, "worker22-deploy.yml");
            assert_eq!(inputs[1], ("tag".to_string(), "sha256:worker22".to_string()));
        }
        other => panic!("unexpected effects {:?}", other),
    }
}

#[test]
fn services_without_capabilities_explain_themselves() {
    let mut app = loaded_app();
    select(&mut app, "proxy-service");

    assert!(app.update(ch('l')).is_empty());
    assert_eq!(app.status.as_deref(), Some("No log group for proxy"));
    assert!(app.update(ch('t')).is_empty());
    assert_eq!(app.status.as_deref(), Some("Traffic editing is only available for web services"));
    assert!(app.update(ch('d')).is_empty());
    assert_eq!(app.status.as_deref(), Some("proxy has no deploy target"));
    assert_eq!(app.view, AppView::Dashboard);
}

#[test]
fn log_viewer_loads_window_then_tails_without_duplicates() {
    let mut app = loaded_app();
    select(&mut app, "web-canary-service");
    let effects = app.update(ch('l'));
    let session = match effects.as_slice() {
        [Effect::FetchLogWindow { session, log_group }] => {
            assert_eq!(log_group, "/dreamwidth/web/canary");
            *session
        }
        other => panic!("unexpected effects {:?}", other),
    };
    assert_eq!(app.view, AppView::Logs);

    let effects = app.update(Msg::LogsLoaded {
        session,
        window_start_ms: 0,
        result: Ok(vec![event(2_000, "second"), event(1_000, "first")]),
    });
    assert!(matches!(
        &effects[..],
        [Effect::Schedule { after, msg: Msg::LogTailTick { generation: 0, .. } }] if *after == LOG_TAIL_INTERVAL
    ));

    let effects = app.update(Msg::LogTailTick { session, generation: 0 });
    assert!(matches!(&effects[..], [Effect::FetchLogsSince { after_ms: 2_001, .. }]));

    let batch = LogBatch { events: vec![event(2_000, "second"), event(3_000, "third")], watermark_ms: 3_000 };
    let effects = app.update(Msg::LogsTailed { session, generation: 0, result: Ok(batch) });
    assert_eq!(effects.len(), 1);
    let logs = app.logs.as_ref().unwrap();
    let messages: Vec<&str> = logs.events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
    assert_eq!(logs.watermark_ms, 3_000);

    // Pausing follow ends the tail loop: the next tick is stale.
    app.update(ch('f'));
    assert!(!app.logs.as_ref().unwrap().follow);
    assert!(app.update(Msg::LogTailTick { session, generation: 0 }).is_empty());

    // Resuming starts a new generation and fetches right away.
    let effects = app.update(ch('f'));
    assert!(matches!(&effects[..], [Effect::FetchLogsSince { generation: 1, after_ms: 3_001, .. }]));

    app.update(key(KeyCode::Esc));
    assert_eq!(app.view, AppView::Dashboard);
    assert!(app.update(Msg::LogTailTick { session, generation: 1 }).is_empty());
}

#[test]
fn follow_toggled_during_initial_load_arms_a_single_tail_loop() {
    let mut app = loaded_app();
    select(&mut app, "web-canary-service");
    let session = match app.update(ch('l')).as_slice() {
        [Effect::FetchLogWindow { session, .. }] => *session,
        other => panic!("unexpected effects {:?}", other),
    };

    assert!(app.update(ch('f')).is_empty());
    assert!(app.update(ch('f')).is_empty());
    assert!(app.logs.as_ref().unwrap().follow);

    let effects = app.update(Msg::LogsLoaded { session, window_start_ms: 0, result: Ok(vec![event(1_000, "first")]) });
    assert!(matches!(&effects[..], [Effect::Schedule { msg: Msg::LogTailTick { generation: 0, .. }, .. }]));
    let effects = app.update(Msg::LogTailTick { session, generation: 0 });
    assert!(matches!(&effects[..], [Effect::FetchLogsSince { after_ms: 1_001, .. }]));
}

#[test]
fn resize_keeps_log_scroll_in_range() {
    let mut app = loaded_app();
    select(&mut app, "web-canary-service");
    let session = match app.update(ch('l')).as_slice() {
        [Effect::FetchLogWindow { session, .. }] => *session,
        other => panic!("unexpected effects {:?}", other),
    };
    let events: Vec<LogEvent> = (0..30).map(|i| event(i * 1_000, "line")).collect();
    app.update(Msg::LogsLoaded { session, window_start_ms: 0, result: Ok(events) });
    // 24 rows leave 20 for events.
    assert_eq!(app.logs.as_ref().unwrap().scroll, 10);

    // Following stays pinned to the bottom.
    app.update(Msg::Resize(80, 14));
    assert_eq!(app.logs.as_ref().unwrap().scroll, 20);

    app.update(ch('k'));
    assert_eq!(app.logs.as_ref().unwrap().scroll, 19);
    app.update(Msg::Resize(80, 29));
    assert_eq!(app.logs.as_ref().unwrap().scroll, 5);
}

#[test]
fn traffic_preset_is_confirmed_before_apply() {
    let mut app = loaded_app();
    select(&mut app, "web-canary-service");
    let effects = app.update(ch('t'));
    let session = match effects.as_slice() {
        [Effect::FetchTraffic { session, service_key }] => {
            assert_eq!(service_key, "web-canary");
            *session
        }
        other => panic!("unexpected effects {:?}", other),
    };
    app.update(Msg::TrafficFetched { session, result: Ok(canary_rule()) });

    // Unchanged weights never reach the load balancer.
    assert!(app.update(key(KeyCode::Enter)).is_empty());
    assert_eq!(app.view, AppView::Dashboard);
    assert_eq!(app.status.as_deref(), Some("No changes to apply"));

    let effects = app.update(ch('t'));
    let session = match effects.as_slice() {
        [Effect::FetchTraffic { session, .. }] => *session,
        other => panic!("unexpected effects {:?}", other),
    };
    app.update(Msg::TrafficFetched { session, result: Ok(canary_rule()) });
    app.update(ch('3'));
    assert!(app.update(key(KeyCode::Enter)).is_empty());
    assert_eq!(app.traffic.as_ref().unwrap().step, TrafficStep::Confirm);

    let effects = app.update(ch('Y'));
    match effects.as_slice() {
        [Effect::ApplyTraffic { rule, .. }] => assert_eq!(rule.weights(), vec![50, 50, 0]),
        other => panic!("unexpected effects {:?}", other),
    }
    assert_eq!(app.traffic.as_ref().unwrap().step, TrafficStep::Saving);

    app.update(Msg::TrafficApplied { session, result: Ok(()) });
    assert_eq!(app.view, AppView::Dashboard);
    assert!(app.traffic.is_none());
    assert_eq!(app.status.as_deref(), Some("Traffic weights updated"));
}

#[test]
fn ctrl_c_quits_from_any_screen() {
    let mut app = loaded_app();
    app.update(key(KeyCode::Enter));
    let effects = app.update(Msg::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    assert!(matches!(effects.as_slice(), [Effect::Quit]));
}

// Fakes for the executor.

struct FakeFleet {
    names: Vec<String>,
    applied: Mutex<Vec<TrafficRule>>,
}

#[async_trait]
impl FleetClient for FakeFleet {
    async fn list_service_names(&self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }

    async fn describe_services(&self, names: &[String], _batch_limit: usize) -> Result<Vec<Service>> {
        Ok(names.iter().map(|n| service(n, 1, 1)).collect())
    }

    async fn list_tasks(&self, service: &str) -> Result<Vec<Task>> {
        Ok(vec![Task {
            id: "task1".to_string(),
            status: "RUNNING".to_string(),
            container: "web".to_string(),
            service: service.to_string(),
            ..Default::default()
        }])
    }

    async fn enrich_with_image_digests(&self, services: Vec<Service>) -> Result<Vec<Service>> {
        Ok(services)
    }

    async fn fetch_traffic_rule(&self, service_key: &str) -> Result<TrafficRule> {
        if service_key == "web-canary" {
            Ok(canary_rule())
        } else {
            Err(FleetError::not_found(format!("no ALB rule found for {}", service_key)))
        }
    }

    async fn apply_traffic_weights(&self, rule: &TrafficRule) -> Result<()> {
        self.applied.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn fetch_log_window(&self, _log_group: &str, _lookback: Duration, _limit: usize) -> Result<Vec<LogEvent>> {
        Ok(vec![event(1_000, "hello")])
    }

    async fn fetch_logs_since(&self, _log_group: &str, after_ms: i64) -> Result<LogBatch> {
        Ok(LogBatch { events: Vec::new(), watermark_ms: after_ms })
    }
}

struct FakeCi;

#[async_trait]
impl CiClient for FakeCi {
    async fn list_recent_images(&self, _repo: &str, _image_base: &str, _limit: usize) -> Result<Vec<Image>> {
        Ok(vec![Image { digest: "sha256:1111".to_string(), ..Default::default() }])
    }

    async fn resolve_commit_summaries(&self, _images: Vec<Image>) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }

    async fn trigger_workflow(&self, _repo: &str, _workflow: &str, _inputs: &[(String, String)]) -> Result<()> {
        Ok(())
    }

    async fn find_run_created_after(&self, _repo: &str, _workflow: &str, _since: DateTime<Utc>) -> Result<Option<u64>> {
        Ok(Some(42))
    }

    async fn get_run_status(&self, _repo: &str, _run_id: u64) -> Result<RunStatus> {
        Ok(RunStatus { status: "in_progress".to_string(), conclusion: String::new() })
    }
}

fn executor() -> (Executor, mpsc::UnboundedReceiver<Msg>, Arc<FakeFleet>) {
    let fleet = Arc::new(FakeFleet {
        names: vec!["web-canary-service".to_string(), "worker-esn-service".to_string()],
        applied: Mutex::new(Vec::new()),
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let exec = Executor::new(Handle::current(), fleet.clone(), Arc::new(FakeCi), &Config::default(), tx);
    (exec, rx, fleet)
}

#[tokio::test]
async fn executor_lists_then_describes_services() {
    let (exec, _rx, _) = executor();
    match exec.perform(Effect::FetchServices).await {
        Some(Msg::ServicesListed(Ok(services))) => {
            let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["web-canary-service", "worker-esn-service"]);
        }
        other => panic!("unexpected message {:?}", other),
    }
}

#[tokio::test]
async fn executor_tags_completions_with_their_session() {
    let (exec, _rx, _) = executor();
    match exec.perform(Effect::FindRun { session: 9, workflow: "web-deploy.yml".to_string(), since: Utc::now() }).await {
        Some(Msg::RunFound { session: 9, result: Ok(Some(42)) }) => {}
        other => panic!("unexpected message {:?}", other),
    }
    match exec.perform(Effect::FetchTraffic { session: 3, service_key: "web-stable".to_string() }).await {
        Some(Msg::TrafficFetched { session: 3, result: Err(e) }) => {
            assert_eq!(e.to_string(), "no ALB rule found for web-stable");
        }
        other => panic!("unexpected message {:?}", other),
    }
    match exec.perform(Effect::ResolveShellTask { service: "web-canary-service".to_string() }).await {
        Some(Msg::ShellTaskResolved(Ok(task))) => assert_eq!(task.id, "task1"),
        other => panic!("unexpected message {:?}", other),
    }
}

#[tokio::test]
async fn executor_schedule_delivers_message_and_inline_effects_are_skipped() {
    let (exec, _rx, _) = executor();
    let msg = exec
        .perform(Effect::Schedule { after: Duration::from_millis(1), msg: Msg::RefreshTick })
        .await;
    assert!(matches!(msg, Some(Msg::RefreshTick)));
    assert!(exec.perform(Effect::Quit).await.is_none());
}

#[tokio::test]
async fn dispatched_effects_report_on_the_channel() {
    let (exec, mut rx, fleet) = executor();
    exec.dispatch(Effect::ApplyTraffic { session: 4, rule: canary_rule() });
    match rx.recv().await {
        Some(Msg::TrafficApplied { session: 4, result: Ok(()) }) => {}
        other => panic!("unexpected message {:?}", other),
    }
    assert_eq!(fleet.applied.lock().unwrap().len(), 1);
}
