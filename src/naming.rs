//! Naming conventions shared by the fleet, the registry and the dashboard.
//!
//! Everything here is a pure function of names: service classification,
//! log group lookup, container selection, digest and commit-sha extraction.

use chrono::{DateTime, Utc};

use crate::config::{
    self, WorkerCatalog, APP_CONTAINERS, IMAGE_BASE_WEB, IMAGE_BASE_WEB22, IMAGE_BASE_WORKER,
    IMAGE_BASE_WORKER22, PROXY_SERVICE, SERVICE_SUFFIX, SIDECAR_CONTAINER, WORKER_PREFIX,
    WORKFLOW_WEB, WORKFLOW_WEB22, WORKFLOW_WORKER, WORKFLOW_WORKER22,
};
use crate::model::{DeployTarget, Service, ServiceGroup};

/// Name of the synthetic service used to deploy every worker at once.
pub const ALL_WORKERS: &str = "ALL WORKERS";
/// Workflow input that selects every worker.
pub const ALL_WORKERS_INPUT: &str = "ALL WORKERS (*)";

/// Name without the "-service" suffix, used as the key for target groups.
pub fn service_key(name: &str) -> &str {
    name.strip_suffix(SERVICE_SUFFIX).unwrap_or(name)
}

fn target(label: &str, workflow: &str, input: &str, image_base: &str) -> DeployTarget {
    DeployTarget {
        label: label.to_string(),
        workflow: workflow.to_string(),
        workflow_input: input.to_string(),
        image_base: image_base.to_string(),
    }
}

fn worker_targets(input: &str) -> Vec<DeployTarget> {
    vec![
        target("worker", WORKFLOW_WORKER, input, IMAGE_BASE_WORKER),
        target("worker22", WORKFLOW_WORKER22, input, IMAGE_BASE_WORKER22),
    ]
}

/// Fill in group, category, workflow and deploy targets from the service name.
pub fn classify(service: &mut Service, catalog: &WorkerCatalog) {
    let key = service_key(&service.name).to_string();
    let web = |label: &str, workflow: &str, base: &str| target(label, workflow, &key, base);

    let (group, targets) = match key.as_str() {
        "web-canary" | "web-unauthenticated" => (
            ServiceGroup::Web,
            vec![web("web", WORKFLOW_WEB, IMAGE_BASE_WEB), web("web22", WORKFLOW_WEB22, IMAGE_BASE_WEB22)],
        ),
        "web-stable" => (ServiceGroup::Web, vec![web("web", WORKFLOW_WEB, IMAGE_BASE_WEB)]),
        "web-shop" => (ServiceGroup::Web, vec![web("web22", WORKFLOW_WEB22, IMAGE_BASE_WEB22)]),
        PROXY_SERVICE => (ServiceGroup::Proxy, Vec::new()),
        other => match other.strip_prefix(WORKER_PREFIX) {
            Some(worker) => {
                service.category = catalog.category_of(worker).to_string();
                (ServiceGroup::Worker, worker_targets(worker))
            }
            None => (ServiceGroup::Other, Vec::new()),
        },
    };

    service.group = group;
    match targets.first() {
        Some(primary) => {
            service.workflow = primary.workflow.clone();
            service.workflow_input = primary.workflow_input.clone();
            service.image_base = primary.image_base.clone();
        }
        None => {
            service.workflow.clear();
            service.workflow_input.clear();
            service.image_base.clear();
        }
    }
    service.targets = targets;
}

/// Build a classified placeholder service from a name alone.
pub fn classified(name: &str, catalog: &WorkerCatalog) -> Service {
    let mut service = Service::named(name, ServiceGroup::Other);
    classify(&mut service, catalog);
    service
}

/// The pseudo-service that deploys every worker through either worker track.
pub fn all_workers_service() -> Service {
    let mut service = Service::named(ALL_WORKERS, ServiceGroup::Worker);
    service.targets = worker_targets(ALL_WORKERS_INPUT);
    service.workflow = WORKFLOW_WORKER.to_string();
    service.workflow_input = ALL_WORKERS_INPUT.to_string();
    service.image_base = IMAGE_BASE_WORKER.to_string();
    service
}

/// Services shown before the first fetch completes: the web services, the
/// proxy, then every catalog worker.
pub fn skeleton_services(catalog: &WorkerCatalog) -> Vec<Service> {
    let mut names: Vec<String> = config::WEB_SERVICES
        .iter()
        .map(|w| format!("{}{}", w.name, SERVICE_SUFFIX))
        .collect();
    names.push(format!("{}{}", PROXY_SERVICE, SERVICE_SUFFIX));
    names.extend(catalog.names().into_iter().map(|w| format!("{}{}{}", WORKER_PREFIX, w, SERVICE_SUFFIX)));
    names.iter().map(|n| classified(n, catalog)).collect()
}

/// Log group holding a service's output, if it has one.
pub fn log_group_for_service(service: &Service) -> Option<String> {
    match service.group {
        ServiceGroup::Web => {
            let key = service.workflow_input.strip_prefix("web-").unwrap_or(&service.workflow_input);
            Some(format!("/dreamwidth/web/{}", key))
        }
        ServiceGroup::Worker if !service.workflow_input.is_empty() => {
            Some(format!("/dreamwidth/worker/{}", service.workflow_input))
        }
        _ => None,
    }
}

/// Index of the application container among `names`: an app-role name first,
/// then the first non-sidecar, then the first container.
pub fn pick_app_container<S: AsRef<str>>(names: &[S]) -> Option<usize> {
    names
        .iter()
        .position(|n| APP_CONTAINERS.contains(&n.as_ref()))
        .or_else(|| names.iter().position(|n| n.as_ref() != SIDECAR_CONTAINER))
        .or(if names.is_empty() { None } else { Some(0) })
}

/// Strip everything through "sha256:" and keep the first 12 characters.
pub fn abbreviate_digest(digest: &str) -> &str {
    let hex = match digest.find("sha256:") {
        Some(idx) => &digest[idx + "sha256:".len()..],
        None => digest,
    };
    match hex.char_indices().nth(12) {
        Some((end, _)) => &hex[..end],
        None => hex,
    }
}

/// Abbreviated digest from a container's image reference, falling back to its
/// runtime digest.
pub fn digest_from_container(image: Option<&str>, image_digest: Option<&str>) -> Option<String> {
    if let Some(image) = image {
        if image.contains("sha256:") {
            return Some(abbreviate_digest(image).to_string());
        }
    }
    image_digest
        .filter(|d| !d.is_empty())
        .map(|d| abbreviate_digest(d).to_string())
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Commit sha from image tags: a "sha-<hex>" tag wins, otherwise a bare hex
/// tag of commit-sha length.
pub fn extract_commit_sha(tags: &[String]) -> Option<&str> {
    tags.iter()
        .filter_map(|t| t.strip_prefix("sha-"))
        .find(|hex| hex.len() >= 7 && is_lower_hex(hex))
        .or_else(|| {
            tags.iter()
                .map(|t| t.as_str())
                .find(|t| (7..=40).contains(&t.len()) && is_lower_hex(t))
        })
}

/// Last path segment of a log stream name, at most 12 characters.
pub fn abbreviate_stream(stream: &str) -> String {
    let last = stream.rsplit('/').next().unwrap_or(stream);
    last.chars().take(12).collect()
}

/// Last segment of an ARN path ("arn:...:task/cluster/abc" -> "abc").
pub fn arn_tail(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

pub fn relative_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "-".to_string();
    };
    let d = now.signed_duration_since(at);
    let plural = |n: i64, unit: &str| format!("{}{} ago", n, unit);
    if d.num_minutes() < 1 {
        "just now".to_string()
    } else if d.num_hours() < 1 {
        plural(d.num_minutes(), "m")
    } else if d.num_days() < 1 {
        plural(d.num_hours(), "h")
    } else {
        plural(d.num_days(), "d")
    }
}
