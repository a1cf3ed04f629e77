pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ProjectRef;

#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("GitLab request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub path_with_namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub iid: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub time_stats: Option<TimeStats>,
}

/// Seconds, as reported by GitLab.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeStats {
    #[serde(default)]
    pub time_estimate: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub title: String,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Note {
    pub id: u64,
}

/// The slice of the GitLab API the sync needs.
#[async_trait]
pub trait GitLab: Send + Sync {
    async fn project(&self, project: &ProjectRef) -> Result<Project, GitLabError>;
    async fn issue(&self, project_id: u64, iid: u64) -> Result<Issue, GitLabError>;
    async fn merge_request(&self, project_id: u64, iid: u64)
        -> Result<MergeRequest, GitLabError>;
    /// Issues that merging `mr_iid` will close.
    async fn closes_issues(&self, project_id: u64, mr_iid: u64) -> Result<Vec<Issue>, GitLabError>;
    async fn create_issue_note(
        &self,
        project_id: u64,
        issue_iid: u64,
        body: &str,
    ) -> Result<Note, GitLabError>;
}
