use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::task::TaskRecord;
use crate::model::task_path::TaskPath;
use crate::model::timestamp;

/// Maps task references onto files under the tracker's base directory.
pub struct TaskStore {
    base_path: PathBuf,
}

impl TaskStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// `{base}/{group}/{subgroup}/{task}`, the file the tracker keeps.
    pub fn task_file(&self, path: &TaskPath) -> PathBuf {
        self.base_path
            .join(&path.group)
            .join(&path.subgroup)
            .join(&path.task)
    }

    /// `{base}/{group}/{subgroup}/{task}.json`, the file a fetch writes.
    pub fn fetch_target(&self, path: &TaskPath) -> PathBuf {
        self.base_path
            .join(&path.group)
            .join(&path.subgroup)
            .join(format!("{}.json", path.task))
    }

    /// The existing file backing a task, preferring the tracker's own.
    pub fn locate(&self, path: &TaskPath) -> Option<PathBuf> {
        [self.task_file(path), self.fetch_target(path)]
            .into_iter()
            .find(|p| p.is_file())
    }
}

pub fn load_task(path: &Path) -> Result<TaskRecord> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse task {}", path.display()))
}

pub fn save_task(path: &Path, record: &TaskRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(record)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write task {}", path.display()))?;
    Ok(())
}

/// How far a task's logbook has already been reported to GitLab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMarker {
    /// Start of the newest logbook entry known to be posted.
    #[serde(with = "timestamp")]
    pub synced_until: NaiveDateTime,
}

pub fn marker_path(task_file: &Path) -> PathBuf {
    let mut name = task_file.as_os_str().to_owned();
    name.push(".synced");
    PathBuf::from(name)
}

pub fn load_marker(task_file: &Path) -> Result<Option<SyncMarker>> {
    let path = marker_path(task_file);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let marker = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(marker))
}

pub fn save_marker(task_file: &Path, marker: &SyncMarker) -> Result<()> {
    let path = marker_path(task_file);
    let json = serde_json::to_string_pretty(marker)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
