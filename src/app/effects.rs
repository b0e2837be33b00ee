//! Runs effects as tokio tasks and posts their completions back to the loop.

use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::ci::CiClient;
use crate::config::{Config, DESCRIBE_BATCH_LIMIT, LOG_EVENT_LIMIT, LOG_LOOKBACK, RECENT_IMAGE_LIMIT};
use crate::error::Result;
use crate::fleet::FleetClient;
use crate::model::{Service, Task};
use crate::shell::pick_task;

use super::message::{Effect, Msg};

#[derive(Clone)]
pub struct Executor {
    handle: Handle,
    fleet: Arc<dyn FleetClient>,
    ci: Arc<dyn CiClient>,
    repo: String,
    tx: UnboundedSender<Msg>,
}

impl Executor {
    pub fn new(
        handle: Handle,
        fleet: Arc<dyn FleetClient>,
        ci: Arc<dyn CiClient>,
        config: &Config,
        tx: UnboundedSender<Msg>,
    ) -> Self {
        Self {
            handle,
            fleet,
            ci,
            repo: config.repo.clone(),
            tx,
        }
    }

    /// Spawn `effect`. Its completion, if any, arrives on the message channel.
    pub fn dispatch(&self, effect: Effect) {
        debug!(effect = effect.name(), "dispatching effect");
        let this = self.clone();
        self.handle.spawn(async move {
            if let Some(msg) = this.perform(effect).await {
                // The receiver is gone only when the loop has exited.
                let _ = this.tx.send(msg);
            }
        });
    }

    /// Run one effect to completion and build the message it reports.
    pub async fn perform(&self, effect: Effect) -> Option<Msg> {
        let fleet = self.fleet.as_ref();
        let ci = self.ci.as_ref();
        let repo = self.repo.as_str();
        let msg = match effect {
            Effect::FetchServices => Msg::ServicesListed(fetch_services(fleet).await),
            Effect::EnrichDigests(services) => Msg::DigestsResolved(fleet.enrich_with_image_digests(services).await),
            Effect::FetchTasks { session, service } => Msg::TasksLoaded {
                session,
                result: fleet.list_tasks(&service).await,
            },
            Effect::RefreshDetail { session, service } => Msg::DetailRefreshed {
                session,
                result: describe_one(fleet, &service).await,
            },
            Effect::ResolveShellTask { service } => Msg::ShellTaskResolved(shell_task(fleet, &service).await),
            Effect::FetchImages { session, image_base } => {
                let result = ci.list_recent_images(repo, &image_base, RECENT_IMAGE_LIMIT).await;
                Msg::ImagesLoaded { session, image_base, result }
            }
            Effect::ResolveCommits { session, images } => Msg::CommitsResolved {
                session,
                result: ci.resolve_commit_summaries(images).await,
            },
            Effect::TriggerWorkflow { session, workflow, inputs } => Msg::WorkflowTriggered {
                session,
                result: ci.trigger_workflow(repo, &workflow, &inputs).await,
            },
            Effect::FindRun { session, workflow, since } => Msg::RunFound {
                session,
                result: ci.find_run_created_after(repo, &workflow, since).await,
            },
            Effect::PollRun { session, run_id } => Msg::RunPolled {
                session,
                run_id,
                result: ci.get_run_status(repo, run_id).await,
            },
            Effect::FetchLogWindow { session, log_group } => {
                let lookback = chrono::Duration::from_std(LOG_LOOKBACK).unwrap_or_else(|_| chrono::Duration::minutes(30));
                let window_start_ms = (Utc::now() - lookback).timestamp_millis();
                Msg::LogsLoaded {
                    session,
                    window_start_ms,
                    result: fleet.fetch_log_window(&log_group, LOG_LOOKBACK, LOG_EVENT_LIMIT).await,
                }
            }
            Effect::FetchLogsSince { session, generation, log_group, after_ms } => Msg::LogsTailed {
                session,
                generation,
                result: fleet.fetch_logs_since(&log_group, after_ms).await,
            },
            Effect::FetchTraffic { session, service_key } => Msg::TrafficFetched {
                session,
                result: fleet.fetch_traffic_rule(&service_key).await,
            },
            Effect::ApplyTraffic { session, rule } => Msg::TrafficApplied {
                session,
                result: fleet.apply_traffic_weights(&rule).await,
            },
            Effect::Schedule { after, msg } => {
                tokio::time::sleep(after).await;
                msg
            }
            Effect::LaunchShell(_) | Effect::Quit => return None,
        };
        Some(msg)
    }
}

/// Phase one: every service name, then batched descriptions.
async fn fetch_services(fleet: &dyn FleetClient) -> Result<Vec<Service>> {
    let names = fleet.list_service_names().await?;
    fleet.describe_services(&names, DESCRIBE_BATCH_LIMIT).await
}

/// Re-describe one service and list its tasks for the detail screen.
async fn describe_one(fleet: &dyn FleetClient, name: &str) -> Result<(Option<Service>, Vec<Task>)> {
    let services = fleet.describe_services(&[name.to_string()], DESCRIBE_BATCH_LIMIT).await?;
    let tasks = fleet.list_tasks(name).await?;
    Ok((services.into_iter().find(|s| s.name == name), tasks))
}

async fn shell_task(fleet: &dyn FleetClient, service: &str) -> Result<Task> {
    let tasks = fleet.list_tasks(service).await?;
    pick_task(service, &tasks).cloned()
}
