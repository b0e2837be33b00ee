use chrono::{DateTime, Utc};

/// Dashboard grouping a service falls under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceGroup {
    Web,
    Worker,
    Proxy,
    Other,
}

impl ServiceGroup {
    pub fn label(self) -> &'static str {
        match self {
            ServiceGroup::Web => "Web",
            ServiceGroup::Worker => "Workers",
            ServiceGroup::Proxy => "Proxy",
            ServiceGroup::Other => "Other",
        }
    }
}

/// One (workflow, image source) pair a service can be deployed through.
#[derive(Clone, Debug, PartialEq)]
pub struct DeployTarget {
    /// Short label shown in target selection ("web", "web22", ...).
    pub label: String,
    pub workflow: String,
    pub workflow_input: String,
    pub image_base: String,
}

/// A deployment record of a service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Deployment {
    pub status: String,         // "PRIMARY", "ACTIVE"
    pub running_count: u32,
    pub desired_count: u32,
    pub pending_count: u32,
    pub rollout_state: String,  // "COMPLETED", "IN_PROGRESS", "FAILED"
    pub created_at: Option<DateTime<Utc>>,
    /// Task definition family and revision, e.g. "web-canary:42".
    pub task_definition: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Service {
    pub name: String,
    pub status: String,
    pub running_count: u32,
    pub desired_count: u32,
    pub pending_count: u32,
    /// More than one deployment record exists.
    pub rolling_out: bool,
    /// Abbreviated image digest; empty until enrichment resolves it.
    pub image_digest: String,
    pub last_deployed: Option<DateTime<Utc>>,
    pub group: ServiceGroup,
    /// Worker category, empty for non-workers.
    pub category: String,
    pub workflow: String,
    pub workflow_input: String,
    pub image_base: String,
    pub targets: Vec<DeployTarget>,
    pub deployments: Vec<Deployment>,
}

impl Service {
    /// A service with only its name and classification filled in.
    pub fn named(name: &str, group: ServiceGroup) -> Self {
        Self {
            name: name.to_string(),
            status: String::new(),
            running_count: 0,
            desired_count: 0,
            pending_count: 0,
            rolling_out: false,
            image_digest: String::new(),
            last_deployed: None,
            group,
            category: String::new(),
            workflow: String::new(),
            workflow_input: String::new(),
            image_base: String::new(),
            targets: Vec::new(),
            deployments: Vec::new(),
        }
    }

    /// Name without the fleet-wide "-service" suffix.
    pub fn short_name(&self) -> &str {
        crate::naming::service_key(&self.name)
    }

    pub fn is_deployable(&self) -> bool {
        !self.targets.is_empty()
    }

    /// True when running and desired counts agree and no rollout is underway.
    pub fn is_healthy(&self) -> bool {
        self.running_count == self.desired_count && !self.rolling_out
    }
}

/// A running (or recently stopped) task of a service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Task {
    /// Short task id (last segment of the task ARN).
    pub id: String,
    pub arn: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub container: String,
    pub private_ip: String,
    pub service: String,
}
