//! The two workflows between the local task tree and GitLab.
//!
//! - [`fetch`] pulls issue or merge-request metadata into a task file.
//! - [`spend`] pushes closed logbook intervals back as `/spend` notes.
//!
//! Both print user-facing results to the supplied writer and report a
//! lookup that came back empty as [`Outcome::Aborted`] rather than an error.

pub mod fetch;
pub mod spend;

use crate::config::AppConfig;
use crate::estimate::EstimateSource;
use crate::gitlab::GitLab;
use crate::store::TaskStore;

pub struct SyncContext<'a> {
    pub config: &'a AppConfig,
    pub gitlab: &'a dyn GitLab,
    pub store: &'a TaskStore,
    pub estimates: &'a dyn EstimateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// A message explaining why was already printed.
    Aborted,
}
