//! Fleet control-plane collaborator: services, tasks, logs and load-balancer
//! weights.

mod aws_cli;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{LogBatch, LogEvent, Service, Task, TrafficRule};

pub use aws_cli::AwsCli;

#[async_trait]
pub trait FleetClient: Send + Sync {
    /// Names of every service in the cluster, sorted.
    async fn list_service_names(&self) -> Result<Vec<String>>;

    /// Describe and classify services, `batch_limit` names per call.
    async fn describe_services(&self, names: &[String], batch_limit: usize) -> Result<Vec<Service>>;

    async fn list_tasks(&self, service: &str) -> Result<Vec<Task>>;

    /// Fill in image digests from one running task per service. Services
    /// that could not be resolved come back unchanged.
    async fn enrich_with_image_digests(&self, services: Vec<Service>) -> Result<Vec<Service>>;

    async fn fetch_traffic_rule(&self, service_key: &str) -> Result<TrafficRule>;

    async fn apply_traffic_weights(&self, rule: &TrafficRule) -> Result<()>;

    /// Events from the last `lookback`, oldest first, at most `limit`.
    async fn fetch_log_window(&self, log_group: &str, lookback: Duration, limit: usize) -> Result<Vec<LogEvent>>;

    /// Events at or after `after_ms`, with the newest timestamp seen.
    async fn fetch_logs_since(&self, log_group: &str, after_ms: i64) -> Result<LogBatch>;
}
