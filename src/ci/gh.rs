use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::command::{args, run_checked, run_json, CommandRunner, ProcessRunner};
use crate::config::RUN_LOOKBACK;
use crate::error::{FleetError, Result};
use crate::model::{Image, RunStatus};

use super::CiClient;

#[derive(Deserialize)]
struct PackageVersion {
    name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<PackageMetadata>,
}

#[derive(Deserialize)]
struct PackageMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    database_id: u64,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RunView {
    #[serde(default)]
    status: String,
    #[serde(default)]
    conclusion: Option<String>,
}

/// Split "ghcr.io/org/pkg" into the packages API path for its versions.
pub fn package_versions_path(image_base: &str, limit: usize) -> Result<String> {
    let path = image_base.split_once('/').map(|(_, rest)| rest).unwrap_or(image_base);
    let (org, package) = path
        .split_once('/')
        .filter(|(org, pkg)| !org.is_empty() && !pkg.is_empty())
        .ok_or_else(|| FleetError::invalid("image base", image_base))?;
    Ok(format!(
        "/orgs/{}/packages/container/{}/versions?per_page={}",
        org,
        package.replace('/', "%2F"),
        limit
    ))
}

/// `CiClient` backed by the `gh` and `git` CLIs.
pub struct GhCli<R: CommandRunner = ProcessRunner> {
    runner: R,
    /// Local checkout used to resolve commit summaries.
    checkout: Option<PathBuf>,
}

impl GhCli<ProcessRunner> {
    pub fn new(checkout: Option<PathBuf>) -> Self {
        Self::with_runner(ProcessRunner, checkout)
    }
}

impl<R: CommandRunner> GhCli<R> {
    pub fn with_runner(runner: R, checkout: Option<PathBuf>) -> Self {
        Self { runner, checkout }
    }

    async fn commit_summary(&self, sha: &str) -> Result<String> {
        let mut a = Vec::new();
        if let Some(dir) = &self.checkout {
            a.extend(args(["-C".to_string(), dir.display().to_string()]));
        }
        a.extend(args(["log", "-1", "--format=%s", sha]));
        let stdout = run_checked(&self.runner, "git", &a).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

#[async_trait]
impl<R: CommandRunner> CiClient for GhCli<R> {
    async fn list_recent_images(&self, _repo: &str, image_base: &str, limit: usize) -> Result<Vec<Image>> {
        let path = package_versions_path(image_base, limit)?;
        let versions: Vec<PackageVersion> =
            run_json(&self.runner, "gh", "package versions", &args(["api", path.as_str()])).await?;
        let mut images: Vec<Image> = versions
            .into_iter()
            .map(|v| Image {
                digest: v.name,
                tags: v
                    .metadata
                    .and_then(|m| m.container)
                    .map(|c| c.tags)
                    .unwrap_or_default(),
                created_at: v.created_at,
                commit_summary: None,
            })
            .collect();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        images.truncate(limit);
        debug!(image_base, count = images.len(), "listed images");
        Ok(images)
    }

    async fn resolve_commit_summaries(&self, images: Vec<Image>) -> Result<Vec<(String, String)>> {
        let wanted: Vec<(String, String)> = images
            .iter()
            .filter_map(|img| img.commit_sha().map(|sha| (img.digest.clone(), sha.to_string())))
            .collect();
        let lookups = wanted.iter().map(|(_, sha)| self.commit_summary(sha));
        let results = join_all(lookups).await;

        let mut summaries = Vec::new();
        for ((digest, sha), result) in wanted.into_iter().zip(results) {
            match result {
                Ok(summary) if !summary.is_empty() => summaries.push((digest, summary)),
                Ok(_) => {}
                Err(e) => debug!(sha = %sha, error = %e, "commit summary unavailable"),
            }
        }
        Ok(summaries)
    }

    async fn trigger_workflow(&self, repo: &str, workflow: &str, inputs: &[(String, String)]) -> Result<()> {
        let mut a = args(["workflow", "run", workflow, "-R", repo]);
        for (key, value) in inputs {
            a.push("-f".to_string());
            a.push(format!("{}={}", key, value));
        }
        run_checked(&self.runner, "gh", &a).await?;
        Ok(())
    }

    async fn find_run_created_after(&self, repo: &str, workflow: &str, since: DateTime<Utc>) -> Result<Option<u64>> {
        let limit = RUN_LOOKBACK.to_string();
        let workflow_flag = format!("--workflow={}", workflow);
        let a = args([
            "run",
            "list",
            workflow_flag.as_str(),
            "-R",
            repo,
            "--json",
            "databaseId,createdAt",
            "--limit",
            limit.as_str(),
        ]);
        let runs: Vec<RunSummary> = run_json(&self.runner, "gh", "run list", &a).await?;
        Ok(runs
            .into_iter()
            .filter(|r| r.created_at > since)
            .max_by_key(|r| r.created_at)
            .map(|r| r.database_id))
    }

    async fn get_run_status(&self, repo: &str, run_id: u64) -> Result<RunStatus> {
        let id = run_id.to_string();
        let a = args(["run", "view", id.as_str(), "-R", repo, "--json", "status,conclusion"]);
        let view: RunView = run_json(&self.runner, "gh", "run view", &a).await.inspect_err(|e| {
            warn!(run_id, error = %e, "run status lookup failed");
        })?;
        Ok(RunStatus {
            status: view.status,
            conclusion: view.conclusion.unwrap_or_default(),
        })
    }
}
