use std::io::Write;

use anyhow::{anyhow, Context, Result};
use chrono::TimeDelta;

use super::{Outcome, SyncContext};
use crate::config;
use crate::gitlab::{GitLabError, Issue};
use crate::model::task::{Properties, PropertyValue, TaskRecord};
use crate::model::task_path::TaskPath;
use crate::model::task_ref::TaskRef;
use crate::store;
use crate::util::time::{format_hh_mm, parse_duration};

/// Write `{task}.json` from the GitLab issue or merge request the task is named after.
///
/// The file is rewritten from scratch; anything stored there before is lost.
pub async fn fetch(ctx: &SyncContext<'_>, task: &TaskPath, out: &mut dyn Write) -> Result<Outcome> {
    let Some(project) =
        config::get_project(ctx.config, ctx.gitlab, &task.group, &task.subgroup).await?
    else {
        writeln!(out, "Could not choose a project to use.")?;
        return Ok(Outcome::Aborted);
    };

    let Some(task_ref) = TaskRef::parse(&task.task) else {
        writeln!(out, "Unrecognized task name pattern.")?;
        return Ok(Outcome::Aborted);
    };

    let record = match task_ref {
        TaskRef::Issue(iid) => issue_to_task(ctx, project.id, iid, out).await?,
        TaskRef::MergeRequest(iid) => merge_request_to_task(ctx, project.id, iid, out).await?,
    };
    let Some(record) = record else {
        writeln!(out, "Could not fetch any data.")?;
        return Ok(Outcome::Aborted);
    };

    let target = ctx.store.fetch_target(task);
    if target.exists() {
        match store::load_task(&target) {
            Ok(existing) if existing.has_logbook() => {
                tracing::warn!(path = %target.display(), "overwriting a task file that holds a logbook");
            }
            _ => {}
        }
    }
    store::save_task(&target, &record)?;
    tracing::info!(%task, path = %target.display(), "task fetched");

    Ok(Outcome::Done)
}

async fn issue_to_task(
    ctx: &SyncContext<'_>,
    project_id: u64,
    iid: u64,
    out: &mut dyn Write,
) -> Result<Option<TaskRecord>> {
    let issue = match ctx.gitlab.issue(project_id, iid).await {
        Ok(issue) => issue,
        Err(GitLabError::NotFound { .. }) => {
            writeln!(out, "No issue found with id: {iid}")?;
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to fetch issue"),
    };

    let estimate = total_estimate(ctx, std::slice::from_ref(&issue))?;

    Ok(Some(TaskRecord {
        title: issue.title,
        properties: Properties {
            issues: Some(PropertyValue::One(iid.to_string())),
            status: Some(issue.state),
            estimate,
            ..Default::default()
        },
        ..Default::default()
    }))
}

async fn merge_request_to_task(
    ctx: &SyncContext<'_>,
    project_id: u64,
    iid: u64,
    out: &mut dyn Write,
) -> Result<Option<TaskRecord>> {
    let mr = match ctx.gitlab.merge_request(project_id, iid).await {
        Ok(mr) => mr,
        Err(GitLabError::NotFound { .. }) => {
            writeln!(out, "No merge request found with id: {iid}")?;
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to fetch merge request"),
    };

    let closes = ctx
        .gitlab
        .closes_issues(project_id, iid)
        .await
        .context("Failed to list issues closed by merge request")?;

    let estimate = total_estimate(ctx, &closes)?;

    Ok(Some(TaskRecord {
        title: mr.title,
        properties: Properties {
            merge_request: Some(iid.to_string()),
            issues: Some(PropertyValue::Many(
                closes.iter().map(|issue| issue.iid.to_string()).collect(),
            )),
            estimate,
            ..Default::default()
        },
        ..Default::default()
    }))
}

/// Sum of the `HH:MM` estimates known for `issues`, rendered back as `HH:MM`.
/// `None` unless the sum is positive.
fn total_estimate(ctx: &SyncContext<'_>, issues: &[Issue]) -> Result<Option<String>> {
    let mut total = TimeDelta::zero();
    for issue in issues {
        let estimate = ctx.estimates.estimate(issue);
        let duration = parse_duration(estimate.as_deref())
            .with_context(|| format!("Bad estimate for issue {}", issue.iid))?;
        total = total
            .checked_add(&duration)
            .ok_or_else(|| anyhow!("Estimates overflow at issue {}", issue.iid))?;
    }
    Ok((total > TimeDelta::zero()).then(|| format_hh_mm(total)))
}
