//! CI and container-registry collaborator: images, workflow dispatch and run
//! status.

mod gh;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Image, RunStatus};

pub use gh::GhCli;

#[async_trait]
pub trait CiClient: Send + Sync {
    /// Most recent images for `image_base`, newest first.
    async fn list_recent_images(&self, repo: &str, image_base: &str, limit: usize) -> Result<Vec<Image>>;

    /// Commit summaries for the images whose tags carry a commit sha, as
    /// (digest, summary) pairs. Unresolvable images are skipped.
    async fn resolve_commit_summaries(&self, images: Vec<Image>) -> Result<Vec<(String, String)>>;

    async fn trigger_workflow(&self, repo: &str, workflow: &str, inputs: &[(String, String)]) -> Result<()>;

    /// Id of the newest run of `workflow` created strictly after `since`.
    async fn find_run_created_after(&self, repo: &str, workflow: &str, since: DateTime<Utc>) -> Result<Option<u64>>;

    async fn get_run_status(&self, repo: &str, run_id: u64) -> Result<RunStatus>;
}
