use anyhow::{anyhow, Context, Result};
use ini::Ini;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::gitlab::client::GitLabClient;
use crate::gitlab::{GitLab, GitLabError, Project};

pub const DEFAULT_PROFILE: &str = "dit";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub base_path: Option<PathBuf>,
    /// Credentials file, `~/.dit/.gitlab.conf` unless set.
    pub gitlab_config: Option<PathBuf>,
    /// group -> subgroup -> project
    #[serde(default)]
    pub projects: HashMap<String, HashMap<String, ProjectRef>>,
    #[serde(default)]
    pub estimates: EstimatesConfig,
}

/// Connection settings read from one section of the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabConfig {
    pub url: String,
    pub private_token: String,
    pub timeout_secs: Option<u64>,
}

/// A GitLab project given either by numeric id or by `namespace/path`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Id(u64),
    Path(String),
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{id}"),
            ProjectRef::Path(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct EstimatesConfig {
    #[serde(default)]
    pub source: EstimateSourceKind,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EstimateSourceKind {
    #[default]
    None,
    TimeStats,
}

pub fn dit_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dit")
}

pub fn default_config_path() -> PathBuf {
    dit_dir().join("gitlab.toml")
}

pub fn default_gitlab_config_path() -> PathBuf {
    dit_dir().join(".gitlab.conf")
}

/// Loads the TOML settings. A missing file means defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reads `url` and `private_token` (and an optional `timeout` in seconds)
/// from `[section]` of an ini credentials file.
pub fn load_gitlab_config(path: &Path, section: &str) -> Result<GitLabConfig> {
    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to read GitLab credentials from {}", path.display()))?;
    let props = ini
        .section(Some(section))
        .ok_or_else(|| anyhow!("No [{section}] section in {}", path.display()))?;
    let required = |key: &str| {
        props
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Missing `{key}` in [{section}] of {}", path.display()))
    };

    let timeout_secs = props
        .get("timeout")
        .map(|t| {
            t.trim()
                .parse::<u64>()
                .with_context(|| format!("Bad timeout {t:?} in [{section}]"))
        })
        .transpose()?;

    Ok(GitLabConfig {
        url: required("url")?,
        private_token: required("private_token")?,
        timeout_secs,
    })
}

impl AppConfig {
    pub fn base_path(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(dit_dir)
    }

    pub fn resolve_project(&self, group: &str, subgroup: &str) -> Option<&ProjectRef> {
        self.projects.get(group)?.get(subgroup)
    }

    pub fn gitlab_config_path(&self) -> PathBuf {
        self.gitlab_config
            .clone()
            .unwrap_or_else(default_gitlab_config_path)
    }

    pub fn open_client(&self, profile: &str) -> Result<GitLabClient> {
        let cfg = load_gitlab_config(&self.gitlab_config_path(), profile)?;
        GitLabClient::new(&cfg)
    }
}

/// Look up the GitLab project mapped to `group/subgroup`.
///
/// `Ok(None)` when nothing is mapped or GitLab does not know the project.
pub async fn get_project(
    config: &AppConfig,
    gitlab: &dyn GitLab,
    group: &str,
    subgroup: &str,
) -> Result<Option<Project>> {
    let Some(project) = config.resolve_project(group, subgroup) else {
        tracing::info!(group, subgroup, "no project mapped");
        return Ok(None);
    };

    match gitlab.project(project).await {
        Ok(p) => {
            tracing::debug!(project = %p.path_with_namespace, id = p.id, "project resolved");
            Ok(Some(p))
        }
        Err(GitLabError::NotFound { .. }) => {
            tracing::warn!(%project, "mapped project not found on GitLab");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to look up project {project}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
base_path = "/srv/dit"

[projects.acme]
backend = "acme/backend"
frontend = 1234

[estimates]
source = "time-stats"
"#;

    #[test]
    fn parses_full_config() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.base_path(), PathBuf::from("/srv/dit"));
        assert_eq!(config.gitlab_config_path(), default_gitlab_config_path());
        assert_eq!(config.estimates.source, EstimateSourceKind::TimeStats);
    }

    #[test]
    fn resolves_mapped_projects() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(
            config.resolve_project("acme", "backend"),
            Some(&ProjectRef::Path("acme/backend".into()))
        );
        assert_eq!(
            config.resolve_project("acme", "frontend"),
            Some(&ProjectRef::Id(1234))
        );
        assert_eq!(config.resolve_project("acme", "docs"), None);
        assert_eq!(config.resolve_project("other", "backend"), None);
    }

    #[test]
    fn empty_config_has_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.projects.is_empty());
        assert_eq!(config.estimates.source, EstimateSourceKind::None);
        assert_eq!(config.base_path(), dit_dir());
    }

    const CREDENTIALS: &str = "[global]\ndefault = dit\n\n[dit]\nurl = https://gitlab.example.com\nprivate_token = secret\n\n[work]\nurl = https://git.work.example\nprivate_token = other\ntimeout = 30\n";

    fn write_credentials(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(".gitlab.conf");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_credentials_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credentials(dir.path(), CREDENTIALS);

        let dit = load_gitlab_config(&path, "dit").unwrap();
        assert_eq!(
            dit,
            GitLabConfig {
                url: "https://gitlab.example.com".into(),
                private_token: "secret".into(),
                timeout_secs: None,
            }
        );
        let work = load_gitlab_config(&path, "work").unwrap();
        assert_eq!(work.timeout_secs, Some(30));
    }

    #[test]
    fn credentials_errors_name_the_problem() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_gitlab_config(&dir.path().join(".gitlab.conf"), "dit").unwrap_err();
        assert!(missing.to_string().contains("Failed to read GitLab credentials"));

        let path = write_credentials(dir.path(), CREDENTIALS);
        let err = load_gitlab_config(&path, "home").unwrap_err();
        assert!(err.to_string().contains("No [home] section"));

        let path = write_credentials(dir.path(), "[dit]\nurl = https://gitlab.example.com\n");
        let err = load_gitlab_config(&path, "dit").unwrap_err();
        assert!(err.to_string().contains("Missing `private_token`"));
    }

    #[test]
    fn open_client_reads_configured_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credentials(dir.path(), CREDENTIALS);
        let config = AppConfig {
            gitlab_config: Some(path),
            ..Default::default()
        };
        assert!(config.open_client("dit").is_ok());
        let Err(err) = config.open_client("home") else {
            panic!("expected a missing section error");
        };
        assert!(err.to_string().contains("[home]"));
    }

    #[test]
    fn load_config_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("gitlab.toml")).unwrap();
        assert!(config.projects.is_empty());
        assert_eq!(config.gitlab_config, None);
    }

    #[test]
    fn load_config_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitlab.toml");
        std::fs::write(&path, "[projects.acme]\nbackend = acme/backend\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
