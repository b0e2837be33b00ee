use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::{debug, warn};

use crate::command::{args, run_checked, run_json, CommandRunner, ProcessRunner};
use crate::config::{Config, WorkerCatalog, SECURE_LISTENER_PORT, TARGET_GROUP_SUFFIX};
use crate::error::{FleetError, Result};
use crate::model::{Deployment, LogBatch, LogEvent, Service, Task, TargetGroupWeight, TrafficRule};
use crate::naming::{abbreviate_stream, arn_tail, classify, digest_from_container, pick_app_container};

use super::FleetClient;

/// AWS timestamps arrive as RFC 3339 strings (CLI v2) or epoch seconds (v1).
fn aws_time<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc)),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0) as i64)),
        _ => None,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceArns {
    #[serde(default)]
    service_arns: Vec<String>,
}

#[derive(Deserialize)]
struct DescribedServices {
    #[serde(default)]
    services: Vec<EcsService>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EcsService {
    service_name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    running_count: u32,
    #[serde(default)]
    desired_count: u32,
    #[serde(default)]
    pending_count: u32,
    #[serde(default)]
    deployments: Vec<EcsDeployment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EcsDeployment {
    #[serde(default)]
    status: String,
    #[serde(default)]
    running_count: u32,
    #[serde(default)]
    desired_count: u32,
    #[serde(default)]
    pending_count: u32,
    #[serde(default)]
    rollout_state: String,
    #[serde(default, deserialize_with = "aws_time")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    task_definition: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskArns {
    #[serde(default)]
    task_arns: Vec<String>,
}

#[derive(Deserialize)]
struct DescribedTasks {
    #[serde(default)]
    tasks: Vec<EcsTask>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EcsTask {
    task_arn: String,
    #[serde(default)]
    last_status: String,
    #[serde(default, deserialize_with = "aws_time")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    containers: Vec<EcsContainer>,
    #[serde(default)]
    attachments: Vec<EcsAttachment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EcsContainer {
    #[serde(default)]
    name: String,
    image: Option<String>,
    image_digest: Option<String>,
}

#[derive(Deserialize)]
struct EcsAttachment {
    #[serde(default)]
    details: Vec<NameValue>,
}

#[derive(Deserialize)]
struct NameValue {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct LogEvents {
    #[serde(default)]
    events: Vec<CwEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CwEvent {
    #[serde(default)]
    log_stream_name: String,
    timestamp: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancers {
    #[serde(default)]
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancer {
    load_balancer_arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Listeners {
    #[serde(default)]
    listeners: Vec<Listener>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Listener {
    listener_arn: String,
    port: Option<u16>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Rules {
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Rule {
    #[serde(default)]
    rule_arn: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    actions: Vec<Action>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Action {
    #[serde(rename = "Type")]
    kind: String,
    forward_config: Option<ForwardConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ForwardConfig {
    #[serde(default)]
    target_groups: Vec<TargetGroupTuple>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetGroupTuple {
    target_group_arn: String,
    #[serde(default)]
    weight: u32,
}

fn deployment_to_model(d: EcsDeployment) -> Deployment {
    Deployment {
        status: d.status,
        running_count: d.running_count,
        desired_count: d.desired_count,
        pending_count: d.pending_count,
        rollout_state: d.rollout_state,
        created_at: d.created_at,
        task_definition: arn_tail(&d.task_definition).to_string(),
    }
}

fn service_to_model(svc: EcsService, catalog: &WorkerCatalog) -> Service {
    let mut service = Service::named(&svc.service_name, crate::model::ServiceGroup::Other);
    service.status = svc.status;
    service.running_count = svc.running_count;
    service.desired_count = svc.desired_count;
    service.pending_count = svc.pending_count;
    service.rolling_out = svc.deployments.len() > 1;
    service.deployments = svc.deployments.into_iter().map(deployment_to_model).collect();
    service.last_deployed = service.deployments.first().and_then(|d| d.created_at);
    classify(&mut service, catalog);
    service
}

fn task_to_model(task: &EcsTask, service: &str) -> Task {
    let names: Vec<&str> = task.containers.iter().map(|c| c.name.as_str()).collect();
    let container = pick_app_container(&names)
        .map(|i| names[i].to_string())
        .unwrap_or_default();
    let private_ip = task
        .attachments
        .iter()
        .flat_map(|a| a.details.iter())
        .find(|d| d.name == "privateIPv4Address")
        .map(|d| d.value.clone())
        .unwrap_or_default();
    Task {
        id: arn_tail(&task.task_arn).to_string(),
        arn: task.task_arn.clone(),
        status: task.last_status.clone(),
        started_at: task.started_at,
        container,
        private_ip,
        service: service.to_string(),
    }
}

fn task_digest(task: &EcsTask) -> Option<String> {
    let names: Vec<&str> = task.containers.iter().map(|c| c.name.as_str()).collect();
    let container = &task.containers[pick_app_container(&names)?];
    digest_from_container(container.image.as_deref(), container.image_digest.as_deref())
}

fn event_to_model(event: CwEvent) -> Option<LogEvent> {
    Some(LogEvent {
        timestamp: DateTime::from_timestamp_millis(event.timestamp)?,
        stream: abbreviate_stream(&event.log_stream_name),
        message: event.message.trim_end_matches('\n').to_string(),
    })
}

fn extract_targets(actions: &[Action]) -> Vec<TargetGroupWeight> {
    actions
        .iter()
        .find(|a| a.kind == "forward" && a.forward_config.is_some())
        .and_then(|a| a.forward_config.as_ref())
        .map(|fc| {
            fc.target_groups
                .iter()
                .map(|tg| TargetGroupWeight {
                    arn: tg.target_group_arn.clone(),
                    name: target_group_name(&tg.target_group_arn).to_string(),
                    weight: tg.weight,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// "arn:...:targetgroup/web-canary-tg/abc123" -> "web-canary-tg".
pub fn target_group_name(arn: &str) -> &str {
    arn.split('/').nth(1).unwrap_or(arn)
}

/// JSON for a weighted forward action, as `--actions`/`--default-actions` take it.
fn forward_action(rule: &TrafficRule) -> String {
    let groups: Vec<serde_json::Value> = rule
        .targets
        .iter()
        .map(|t| json!({ "TargetGroupArn": t.arn, "Weight": t.weight }))
        .collect();
    json!([{ "Type": "forward", "ForwardConfig": { "TargetGroups": groups } }]).to_string()
}

/// `FleetClient` backed by the `aws` CLI.
pub struct AwsCli<R: CommandRunner = ProcessRunner> {
    runner: R,
    cluster: String,
    region: String,
    alb_name: String,
    catalog: WorkerCatalog,
}

impl AwsCli<ProcessRunner> {
    pub fn new(config: &Config) -> Self {
        Self::with_runner(ProcessRunner, config)
    }
}

impl<R: CommandRunner> AwsCli<R> {
    pub fn with_runner(runner: R, config: &Config) -> Self {
        Self {
            runner,
            cluster: config.cluster.clone(),
            region: config.region.clone(),
            alb_name: config.alb_name.clone(),
            catalog: config.workers.clone(),
        }
    }

    fn aws_args(&self, parts: &[&str]) -> Vec<String> {
        let mut out = args(parts.iter().copied());
        out.extend(args(["--region", self.region.as_str(), "--output", "json"]));
        out
    }

    async fn describe_tasks(&self, arns: &[String]) -> Result<Vec<EcsTask>> {
        if arns.is_empty() {
            return Ok(Vec::new());
        }
        let mut a = self.aws_args(&["ecs", "describe-tasks", "--cluster", self.cluster.as_str(), "--tasks"]);
        a.extend(arns.iter().cloned());
        let out: DescribedTasks = run_json(&self.runner, "aws", "ecs describe-tasks", &a).await?;
        Ok(out.tasks)
    }

    async fn list_task_arns(&self, service: &str, running_only: bool) -> Result<Vec<String>> {
        let mut parts = vec!["ecs", "list-tasks", "--cluster", self.cluster.as_str(), "--service-name", service];
        if running_only {
            parts.extend(["--desired-status", "RUNNING", "--max-items", "1"]);
        }
        let out: TaskArns = run_json(&self.runner, "aws", "ecs list-tasks", &self.aws_args(&parts)).await?;
        Ok(out.task_arns)
    }

    async fn service_digest(&self, service: &str) -> Result<Option<String>> {
        let arns = self.list_task_arns(service, true).await?;
        let tasks = self.describe_tasks(&arns).await?;
        Ok(tasks.first().and_then(task_digest))
    }

    async fn filter_log_events(&self, log_group: &str, start_ms: i64, limit: Option<usize>) -> Result<Vec<LogEvent>> {
        let start = start_ms.to_string();
        let limit_s = limit.map(|l| l.to_string());
        let mut parts = vec!["logs", "filter-log-events", "--log-group-name", log_group, "--start-time", start.as_str()];
        if let Some(l) = limit_s.as_deref() {
            parts.extend(["--max-items", l]);
        }
        let out: LogEvents = run_json(&self.runner, "aws", "logs filter-log-events", &self.aws_args(&parts)).await?;
        let mut events: Vec<LogEvent> = out.events.into_iter().filter_map(event_to_model).collect();
        if let Some(l) = limit {
            events.truncate(l);
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[async_trait]
impl<R: CommandRunner> FleetClient for AwsCli<R> {
    async fn list_service_names(&self) -> Result<Vec<String>> {
        let a = self.aws_args(&["ecs", "list-services", "--cluster", self.cluster.as_str()]);
        let out: ServiceArns = run_json(&self.runner, "aws", "ecs list-services", &a).await?;
        let mut names: Vec<String> = out.service_arns.iter().map(|arn| arn_tail(arn).to_string()).collect();
        names.sort();
        Ok(names)
    }

    async fn describe_services(&self, names: &[String], batch_limit: usize) -> Result<Vec<Service>> {
        let mut services = Vec::with_capacity(names.len());
        for batch in names.chunks(batch_limit.max(1)) {
            let mut a = self.aws_args(&["ecs", "describe-services", "--cluster", self.cluster.as_str(), "--services"]);
            a.extend(batch.iter().cloned());
            let out: DescribedServices = run_json(&self.runner, "aws", "ecs describe-services", &a).await?;
            services.extend(out.services.into_iter().map(|s| service_to_model(s, &self.catalog)));
        }
        debug!(count = services.len(), "described services");
        Ok(services)
    }

    async fn list_tasks(&self, service: &str) -> Result<Vec<Task>> {
        let arns = self.list_task_arns(service, false).await?;
        let tasks = self.describe_tasks(&arns).await?;
        Ok(tasks.iter().map(|t| task_to_model(t, service)).collect())
    }

    async fn enrich_with_image_digests(&self, mut services: Vec<Service>) -> Result<Vec<Service>> {
        let lookups = services.iter().map(|s| self.service_digest(&s.name));
        let results = join_all(lookups).await;

        let mut first_error = None;
        let mut resolved = 0;
        for (svc, result) in services.iter_mut().zip(results) {
            match result {
                Ok(Some(digest)) => {
                    svc.image_digest = digest;
                    resolved += 1;
                }
                Ok(None) => resolved += 1,
                Err(e) => {
                    warn!(service = %svc.name, error = %e, "image digest lookup failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) if resolved == 0 => Err(e),
            _ => Ok(services),
        }
    }

    async fn fetch_traffic_rule(&self, service_key: &str) -> Result<TrafficRule> {
        let a = self.aws_args(&["elbv2", "describe-load-balancers", "--names", self.alb_name.as_str()]);
        let lbs: LoadBalancers = run_json(&self.runner, "aws", "elbv2 describe-load-balancers", &a).await?;
        let alb = lbs
            .load_balancers
            .first()
            .ok_or_else(|| FleetError::not_found(format!("ALB {:?} not found", self.alb_name)))?;

        let a = self.aws_args(&["elbv2", "describe-listeners", "--load-balancer-arn", alb.load_balancer_arn.as_str()]);
        let listeners: Listeners = run_json(&self.runner, "aws", "elbv2 describe-listeners", &a).await?;
        let listener_arn = listeners
            .listeners
            .into_iter()
            .find(|l| l.port == Some(SECURE_LISTENER_PORT))
            .map(|l| l.listener_arn)
            .ok_or_else(|| FleetError::not_found(format!("no HTTPS listener found on {}", self.alb_name)))?;

        let a = self.aws_args(&["elbv2", "describe-rules", "--listener-arn", listener_arn.as_str()]);
        let rules: Rules = run_json(&self.runner, "aws", "elbv2 describe-rules", &a).await?;

        let wanted = format!("{}{}", service_key, TARGET_GROUP_SUFFIX);
        for rule in rules.rules {
            let targets = extract_targets(&rule.actions);
            if !targets.iter().any(|t| t.name == wanted) {
                continue;
            }
            let label = if rule.is_default {
                "Default".to_string()
            } else {
                format!("Rule {}", rule.priority)
            };
            return Ok(TrafficRule {
                rule_arn: if rule.is_default { String::new() } else { rule.rule_arn },
                listener_arn,
                is_default: rule.is_default,
                service_key: service_key.to_string(),
                label,
                targets,
            });
        }
        Err(FleetError::not_found(format!("no ALB rule found for {}", service_key)))
    }

    async fn apply_traffic_weights(&self, rule: &TrafficRule) -> Result<()> {
        let actions = forward_action(rule);
        let a = if rule.is_default {
            self.aws_args(&["elbv2", "modify-listener", "--listener-arn", rule.listener_arn.as_str(), "--default-actions", actions.as_str()])
        } else {
            self.aws_args(&["elbv2", "modify-rule", "--rule-arn", rule.rule_arn.as_str(), "--actions", actions.as_str()])
        };
        run_checked(&self.runner, "aws", &a).await?;
        Ok(())
    }

    async fn fetch_log_window(&self, log_group: &str, lookback: Duration, limit: usize) -> Result<Vec<LogEvent>> {
        let lookback = chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::minutes(30));
        let start_ms = (Utc::now() - lookback).timestamp_millis();
        self.filter_log_events(log_group, start_ms, Some(limit)).await
    }

    async fn fetch_logs_since(&self, log_group: &str, after_ms: i64) -> Result<LogBatch> {
        let events = self.filter_log_events(log_group, after_ms, None).await?;
        let watermark_ms = events.iter().map(|e| e.timestamp_ms()).max().unwrap_or(after_ms).max(after_ms);
        Ok(LogBatch { events, watermark_ms })
    }
}
