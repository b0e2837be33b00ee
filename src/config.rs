use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{FleetError, Result};

pub const DEFAULT_CLUSTER: &str = "dreamwidth";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_REPO: &str = "dreamwidth/dreamwidth";
pub const DEFAULT_ALB: &str = "dw-prod";

pub const IMAGE_BASE_WEB: &str = "ghcr.io/dreamwidth/web";
pub const IMAGE_BASE_WEB22: &str = "ghcr.io/dreamwidth/web22";
pub const IMAGE_BASE_WORKER: &str = "ghcr.io/dreamwidth/worker";
pub const IMAGE_BASE_WORKER22: &str = "ghcr.io/dreamwidth/worker22";

pub const WORKFLOW_WEB: &str = "web-deploy.yml";
pub const WORKFLOW_WEB22: &str = "web22-deploy.yml";
pub const WORKFLOW_WORKER: &str = "worker-deploy.yml";
pub const WORKFLOW_WORKER22: &str = "worker22-deploy.yml";

/// Suffix every ECS service name carries.
pub const SERVICE_SUFFIX: &str = "-service";
/// Prefix identifying worker-role services (after the suffix is stripped).
pub const WORKER_PREFIX: &str = "worker-";
/// Literal name of the proxy service (after the suffix is stripped).
pub const PROXY_SERVICE: &str = "proxy";

/// Telemetry sidecar that is never the application container.
pub const SIDECAR_CONTAINER: &str = "cloudwatch-agent";
/// Container names that identify the application role.
pub const APP_CONTAINERS: [&str; 2] = ["web", "worker"];
/// Container used for shells when a task does not report one.
pub const FALLBACK_CONTAINER: &str = "web";

/// Maintenance target group used by the maintenance traffic preset.
pub const MAINTENANCE_TARGET: &str = "dw-maint";
/// Suffix of the secondary ("-2") target group of a service.
pub const SECONDARY_TARGET_SUFFIX: &str = "-2-tg";
/// Suffix of a service's primary target group.
pub const TARGET_GROUP_SUFFIX: &str = "-tg";
/// Listener port carrying production traffic.
pub const SECURE_LISTENER_PORT: u16 = 443;

pub const DESCRIBE_BATCH_LIMIT: usize = 10;
pub const RECENT_IMAGE_LIMIT: usize = 20;
pub const RUN_LOOKBACK: usize = 5;

pub const LOG_LOOKBACK: Duration = Duration::from_secs(30 * 60);
pub const LOG_EVENT_LIMIT: usize = 500;
pub const LOG_TAIL_INTERVAL: Duration = Duration::from_secs(5);

pub const RUN_DISCOVERY_DELAY: Duration = Duration::from_secs(2);
pub const RUN_DISCOVERY_RETRY: Duration = Duration::from_secs(3);
pub const RUN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Display order for worker categories; unknown categories follow alphabetically.
pub const CATEGORY_ORDER: [&str; 8] = [
    "email",
    "esn",
    "importer",
    "misc",
    "scheduled",
    "search",
    "sqs",
    "syndication",
];

pub const UNCATEGORIZED: &str = "uncategorized";

/// A web service known ahead of time, in rollout order.
pub struct WebServiceDef {
    pub name: &'static str,
    pub workflow: &'static str,
    pub image_base: &'static str,
}

pub const WEB_SERVICES: [WebServiceDef; 4] = [
    WebServiceDef { name: "web-canary", workflow: WORKFLOW_WEB, image_base: IMAGE_BASE_WEB },
    WebServiceDef { name: "web-shop", workflow: WORKFLOW_WEB22, image_base: IMAGE_BASE_WEB22 },
    WebServiceDef { name: "web-unauthenticated", workflow: WORKFLOW_WEB, image_base: IMAGE_BASE_WEB },
    WebServiceDef { name: "web-stable", workflow: WORKFLOW_WEB, image_base: IMAGE_BASE_WEB },
];

/// Runtime configuration, built once at startup and never mutated.
#[derive(Clone, Debug)]
pub struct Config {
    pub cluster: String,
    pub region: String,
    pub repo: String,
    pub alb_name: String,
    pub refresh_interval: Duration,
    /// Ordered rollout chain used for the "deploy next" hint.
    pub rollout_chain: Vec<String>,
    pub workers: WorkerCatalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: DEFAULT_CLUSTER.to_string(),
            region: DEFAULT_REGION.to_string(),
            repo: DEFAULT_REPO.to_string(),
            alb_name: DEFAULT_ALB.to_string(),
            refresh_interval: Duration::from_secs(30),
            rollout_chain: default_rollout_chain(),
            workers: WorkerCatalog::default(),
        }
    }
}

pub fn default_rollout_chain() -> Vec<String> {
    WEB_SERVICES.iter().map(|w| w.name.to_string()).collect()
}

/// One worker entry from workers.json. Only the category matters here.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkerDef {
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize)]
struct WorkersFile {
    #[serde(default)]
    workers: HashMap<String, WorkerDef>,
    #[serde(default)]
    rollout_chain: Option<Vec<String>>,
}

/// Worker name -> category lookup loaded from workers.json.
#[derive(Clone, Debug, Default)]
pub struct WorkerCatalog {
    pub workers: HashMap<String, WorkerDef>,
}

impl WorkerCatalog {
    pub fn category_of(&self, worker: &str) -> &str {
        self.workers
            .get(worker)
            .map(|w| w.category.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
    }

    /// Worker names, sorted, for deterministic skeleton rows.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Resolve the workers.json path: explicit flag first, then `$LJHOME/config/workers.json`.
pub fn workers_json_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    std::env::var_os("LJHOME").map(|home| PathBuf::from(home).join("config").join("workers.json"))
}

/// Parse workers.json contents into a catalog and an optional rollout chain override.
pub fn parse_workers(text: &str) -> Result<(WorkerCatalog, Option<Vec<String>>)> {
    let file: WorkersFile = serde_json::from_str(text).map_err(|source| FleetError::Parse {
        context: "workers.json",
        source,
    })?;
    Ok((WorkerCatalog { workers: file.workers }, file.rollout_chain))
}

/// Load workers.json from disk.
pub fn load_workers(path: &Path) -> Result<(WorkerCatalog, Option<Vec<String>>)> {
    let text = std::fs::read_to_string(path).map_err(|source| FleetError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_workers(&text)
}
