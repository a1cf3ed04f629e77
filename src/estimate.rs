use crate::config::EstimateSourceKind;
use crate::gitlab::Issue;
use crate::util::time::format_hh_mm;

/// Supplies a time estimate for an issue, when one is known, as `HH:MM`.
pub trait EstimateSource {
    fn estimate(&self, issue: &Issue) -> Option<String>;
}

/// Never knows an estimate.
pub struct NoEstimates;

impl EstimateSource for NoEstimates {
    fn estimate(&self, _issue: &Issue) -> Option<String> {
        None
    }
}

/// Reads the estimate set with GitLab's `/estimate` quick action.
pub struct TimeStatsEstimates;

impl EstimateSource for TimeStatsEstimates {
    fn estimate(&self, issue: &Issue) -> Option<String> {
        let secs = issue.time_stats.as_ref()?.time_estimate;
        (secs > 0).then(|| format_hh_mm(chrono::TimeDelta::seconds(secs)))
    }
}

pub fn from_config(kind: EstimateSourceKind) -> Box<dyn EstimateSource> {
    match kind {
        EstimateSourceKind::None => Box::new(NoEstimates),
        EstimateSourceKind::TimeStats => Box::new(TimeStatsEstimates),
    }
}
