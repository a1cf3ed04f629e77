use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{GitLab, GitLabError, Issue, MergeRequest, Note, Project};
use crate::config::{GitLabConfig, ProjectRef};

pub struct GitLabClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

impl GitLabClient {
    pub fn new(cfg: &GitLabConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_url: format!("{}/api/v4", cfg.url.trim_end_matches('/')),
            token: cfg.private_token.clone(),
            client,
        })
    }

    fn project_url(&self, project: &ProjectRef) -> String {
        match project {
            ProjectRef::Id(id) => format!("{}/projects/{id}", self.api_url),
            ProjectRef::Path(path) => {
                format!("{}/projects/{}", self.api_url, urlencoding::encode(path))
            }
        }
    }

    fn project_id_url(&self, project_id: u64) -> String {
        self.project_url(&ProjectRef::Id(project_id))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &'static str,
        id: String,
    ) -> Result<T, GitLabError> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        decode(resp, what, id).await
    }
}

async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &'static str,
    id: String,
) -> Result<T, GitLabError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GitLabError::NotFound { what, id });
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(GitLabError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}

#[async_trait]
impl GitLab for GitLabClient {
    async fn project(&self, project: &ProjectRef) -> Result<Project, GitLabError> {
        self.get(&self.project_url(project), "Project", project.to_string())
            .await
    }

    async fn issue(&self, project_id: u64, iid: u64) -> Result<Issue, GitLabError> {
        let url = format!("{}/issues/{iid}", self.project_id_url(project_id));
        self.get(&url, "Issue", iid.to_string()).await
    }

    async fn merge_request(
        &self,
        project_id: u64,
        iid: u64,
    ) -> Result<MergeRequest, GitLabError> {
        let url = format!("{}/merge_requests/{iid}", self.project_id_url(project_id));
        self.get(&url, "Merge request", iid.to_string()).await
    }

    async fn closes_issues(&self, project_id: u64, mr_iid: u64) -> Result<Vec<Issue>, GitLabError> {
        let url = format!(
            "{}/merge_requests/{mr_iid}/closes_issues",
            self.project_id_url(project_id)
        );
        self.get(&url, "Merge request", mr_iid.to_string()).await
    }

    async fn create_issue_note(
        &self,
        project_id: u64,
        issue_iid: u64,
        body: &str,
    ) -> Result<Note, GitLabError> {
        let url = format!("{}/issues/{issue_iid}/notes", self.project_id_url(project_id));
        tracing::debug!(%url, body, "POST");
        let resp = self
            .client
            .post(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        decode(resp, "Issue", issue_iid.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> GitLabClient {
        GitLabClient::new(&GitLabConfig {
            url: url.into(),
            private_token: "t".into(),
            timeout_secs: Some(5),
        })
        .unwrap()
    }

    #[test]
    fn api_url_ignores_trailing_slash() {
        let c = client("https://gitlab.example.com/");
        assert_eq!(c.api_url, "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn project_paths_are_url_encoded() {
        let c = client("https://gitlab.example.com");
        assert_eq!(
            c.project_url(&ProjectRef::Path("acme/backend".into())),
            "https://gitlab.example.com/api/v4/projects/acme%2Fbackend"
        );
        assert_eq!(
            c.project_url(&ProjectRef::Id(42)),
            "https://gitlab.example.com/api/v4/projects/42"
        );
    }

    #[test]
    fn issue_payload_deserializes() {
        let json = r#"{
            "id": 901, "iid": 10, "title": "Fix bug", "state": "opened",
            "time_stats": {"time_estimate": 3600, "total_time_spent": 0,
                           "human_time_estimate": "1h", "human_total_time_spent": null}
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.iid, 10);
        assert_eq!(issue.time_stats.unwrap().time_estimate, 3600);
    }
}
