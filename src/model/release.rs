use chrono::{DateTime, Utc};

/// A container image version from the registry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Image {
    /// Full content digest ("sha256:...").
    pub digest: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// First line of the commit the image was built from, once resolved.
    pub commit_summary: Option<String>,
}

impl Image {
    /// Digest without the algorithm prefix, cut to 12 characters.
    pub fn short_digest(&self) -> &str {
        crate::naming::abbreviate_digest(&self.digest)
    }

    /// Commit sha encoded in the image tags, if any.
    pub fn commit_sha(&self) -> Option<&str> {
        crate::naming::extract_commit_sha(&self.tags)
    }
}

/// Status of a CI workflow run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStatus {
    pub status: String,       // "queued", "in_progress", "completed"
    pub conclusion: String,   // "success", "failure", "" while running
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn succeeded(&self) -> bool {
        self.is_completed() && self.conclusion == "success"
    }
}
