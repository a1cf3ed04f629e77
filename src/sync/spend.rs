use std::io::Write;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;

use super::{Outcome, SyncContext};
use crate::config;
use crate::gitlab::{GitLabError, Issue};
use crate::logbook::{filter_logbook, DateRange};
use crate::model::task::TaskRecord;
use crate::model::task_path::TaskPath;
use crate::model::task_ref::TaskRef;
use crate::store::{self, SyncMarker};
use crate::util::time::duration_to_spend_string;

#[derive(Debug, Default, Clone, Copy)]
pub struct SpendOptions {
    pub range: DateRange,
    /// Print the notes instead of posting them.
    pub dry_run: bool,
    /// Ignore the sync marker and consider every entry in range.
    pub resync: bool,
}

/// Post one `/spend` note per closed logbook interval, oldest first.
///
/// A failed post is reported and the remaining intervals are still tried.
pub async fn spend(
    ctx: &SyncContext<'_>,
    task: &TaskPath,
    opts: &SpendOptions,
    out: &mut dyn Write,
) -> Result<Outcome> {
    if ctx.config.resolve_project(&task.group, &task.subgroup).is_none() {
        writeln!(out, "Could not choose a project to use.")?;
        return Ok(Outcome::Aborted);
    }

    let Some(task_ref) = TaskRef::parse(&task.task) else {
        writeln!(out, "Unrecognized task name pattern.")?;
        return Ok(Outcome::Aborted);
    };

    let file = ctx
        .store
        .locate(task)
        .ok_or_else(|| anyhow!("No task file found for {task}"))?;
    let record = store::load_task(&file)?;

    let mut intervals = filter_logbook(&record, &opts.range);
    let marker = store::load_marker(&file)?;
    if let (Some(marker), false) = (marker, opts.resync) {
        let before = intervals.len();
        intervals.retain(|i| i.start > marker.synced_until);
        tracing::info!(
            skipped = before - intervals.len(),
            synced_until = %marker.synced_until,
            "skipping entries already posted"
        );
    }

    if intervals.is_empty() {
        writeln!(out, "Nothing to spend.")?;
        return Ok(Outcome::Done);
    }

    let Some(project) =
        config::get_project(ctx.config, ctx.gitlab, &task.group, &task.subgroup).await?
    else {
        writeln!(out, "Could not choose a project to use.")?;
        return Ok(Outcome::Aborted);
    };

    let Some(issue) = spend_target(ctx, project.id, task_ref, out).await? else {
        return Ok(Outcome::Aborted);
    };

    let mut synced_until = marker.map(|m| m.synced_until);
    let pending = unsynced_starts(&record, synced_until);
    let mut posted_starts = Vec::new();
    let mut posted = 0;

    for interval in &intervals {
        let body = duration_to_spend_string(interval.duration, interval.start.date());

        if opts.dry_run {
            writeln!(out, "[dry-run] {body}")?;
            continue;
        }

        writeln!(out, "{body}")?;
        match ctx.gitlab.create_issue_note(project.id, issue.iid, &body).await {
            Ok(note) => {
                posted += 1;
                posted_starts.push(interval.start);
                tracing::info!(issue = issue.iid, note = note.id, "spend note posted");
            }
            Err(e) => {
                writeln!(out, "Failed to post {body:?}: {e}")?;
                tracing::warn!(issue = issue.iid, error = %e, "spend note failed");
                continue;
            }
        }

        let next = advance_marker(&pending, &posted_starts, synced_until);
        if next == synced_until {
            continue;
        }
        if let Some(synced) = next {
            match store::save_marker(&file, &SyncMarker { synced_until: synced }) {
                Ok(()) => synced_until = next,
                Err(e) => tracing::warn!(error = %e, "could not record sync marker"),
            }
        }
    }

    if !opts.dry_run {
        writeln!(out, "Posted {posted} of {} spend notes.", intervals.len())?;
    }

    Ok(Outcome::Done)
}

/// Starts of every entry after `synced_until` that still has to reach GitLab,
/// oldest first. Open entries count: they will be posted once closed.
/// Entries ending before they start can never be posted and are left out.
fn unsynced_starts(record: &TaskRecord, synced_until: Option<NaiveDateTime>) -> Vec<NaiveDateTime> {
    let mut starts: Vec<NaiveDateTime> = record
        .logbook()
        .iter()
        .filter(|e| synced_until.map_or(true, |t| e.start > t))
        .filter(|e| e.end.is_none() || e.duration().is_some())
        .map(|e| e.start)
        .collect();
    starts.sort();
    starts
}

/// The marker may only cover an unbroken prefix of `pending` posted in this
/// run, so nothing skipped by a date filter or a failed post is hidden.
fn advance_marker(
    pending: &[NaiveDateTime],
    posted: &[NaiveDateTime],
    current: Option<NaiveDateTime>,
) -> Option<NaiveDateTime> {
    pending
        .iter()
        .take_while(|start| posted.contains(start))
        .last()
        .copied()
        .or(current)
}

/// The issue time is booked on: the task's own issue, or the single issue a
/// merge request closes.
async fn spend_target(
    ctx: &SyncContext<'_>,
    project_id: u64,
    task_ref: TaskRef,
    out: &mut dyn Write,
) -> Result<Option<Issue>> {
    match task_ref {
        TaskRef::Issue(iid) => match ctx.gitlab.issue(project_id, iid).await {
            Ok(issue) => Ok(Some(issue)),
            Err(GitLabError::NotFound { .. }) => {
                writeln!(out, "No issue found with id: {iid}")?;
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to fetch issue"),
        },
        TaskRef::MergeRequest(iid) => {
            match ctx.gitlab.merge_request(project_id, iid).await {
                Ok(_) => {}
                Err(GitLabError::NotFound { .. }) => {
                    writeln!(out, "No merge request found with id: {iid}")?;
                    return Ok(None);
                }
                Err(e) => return Err(e).context("Failed to fetch merge request"),
            }
            let mut closes = ctx
                .gitlab
                .closes_issues(project_id, iid)
                .await
                .context("Failed to list issues closed by merge request")?;
            if closes.len() != 1 {
                writeln!(
                    out,
                    "Merge request !{iid} closes {} issues, cannot choose one to spend on.",
                    closes.len()
                )?;
                return Ok(None);
            }
            Ok(closes.pop())
        }
    }
}
