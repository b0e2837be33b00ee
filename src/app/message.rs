use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;

use crate::error::Result;
use crate::model::{Image, LogBatch, LogEvent, RunStatus, Service, Task, TrafficRule};
use crate::shell::ShellTarget;

/// Everything the reducer reacts to: input, timers and completions of
/// background work. Completions carry the session id of the screen state that
/// asked for them.
#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    Resize(u16, u16),
    RefreshTick,
    /// Phase one: list plus describe.
    ServicesListed(Result<Vec<Service>>),
    /// Phase two: image digests.
    DigestsResolved(Result<Vec<Service>>),
    TasksLoaded { session: u64, result: Result<Vec<Task>> },
    DetailRefreshed { session: u64, result: Result<(Option<Service>, Vec<Task>)> },
    ShellTaskResolved(Result<Task>),
    ShellExited(Result<()>),
    ImagesLoaded { session: u64, image_base: String, result: Result<Vec<Image>> },
    CommitsResolved { session: u64, result: Result<Vec<(String, String)>> },
    WorkflowTriggered { session: u64, result: Result<()> },
    DeployTick { session: u64 },
    RunFound { session: u64, result: Result<Option<u64>> },
    RunPolled { session: u64, run_id: u64, result: Result<RunStatus> },
    LogsLoaded { session: u64, window_start_ms: i64, result: Result<Vec<LogEvent>> },
    LogTailTick { session: u64, generation: u64 },
    LogsTailed { session: u64, generation: u64, result: Result<LogBatch> },
    TrafficFetched { session: u64, result: Result<TrafficRule> },
    TrafficApplied { session: u64, result: Result<()> },
}

/// Work the reducer asks for. Everything except `LaunchShell` and `Quit` runs
/// as a background task that posts a `Msg` back.
#[derive(Debug)]
pub enum Effect {
    FetchServices,
    EnrichDigests(Vec<Service>),
    FetchTasks { session: u64, service: String },
    RefreshDetail { session: u64, service: String },
    ResolveShellTask { service: String },
    LaunchShell(ShellTarget),
    FetchImages { session: u64, image_base: String },
    ResolveCommits { session: u64, images: Vec<Image> },
    TriggerWorkflow { session: u64, workflow: String, inputs: Vec<(String, String)> },
    FindRun { session: u64, workflow: String, since: DateTime<Utc> },
    PollRun { session: u64, run_id: u64 },
    FetchLogWindow { session: u64, log_group: String },
    FetchLogsSince { session: u64, generation: u64, log_group: String, after_ms: i64 },
    FetchTraffic { session: u64, service_key: String },
    ApplyTraffic { session: u64, rule: TrafficRule },
    Schedule { after: Duration, msg: Msg },
    Quit,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::FetchServices => "fetch_services",
            Effect::EnrichDigests(_) => "enrich_digests",
            Effect::FetchTasks { .. } => "fetch_tasks",
            Effect::RefreshDetail { .. } => "refresh_detail",
            Effect::ResolveShellTask { .. } => "resolve_shell_task",
            Effect::LaunchShell(_) => "launch_shell",
            Effect::FetchImages { .. } => "fetch_images",
            Effect::ResolveCommits { .. } => "resolve_commits",
            Effect::TriggerWorkflow { .. } => "trigger_workflow",
            Effect::FindRun { .. } => "find_run",
            Effect::PollRun { .. } => "poll_run",
            Effect::FetchLogWindow { .. } => "fetch_log_window",
            Effect::FetchLogsSince { .. } => "fetch_logs_since",
            Effect::FetchTraffic { .. } => "fetch_traffic",
            Effect::ApplyTraffic { .. } => "apply_traffic",
            Effect::Schedule { .. } => "schedule",
            Effect::Quit => "quit",
        }
    }
}
