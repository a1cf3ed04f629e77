use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::model::task::TaskRecord;

/// Day bounds on logbook entries: `from` inclusive, `to` exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let day = ts.date();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day < to)
    }
}

/// A finished logbook interval ready to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub duration: TimeDelta,
}

/// Closed intervals starting inside `range`, in logbook order.
pub fn filter_logbook(record: &TaskRecord, range: &DateRange) -> Vec<Interval> {
    record
        .logbook()
        .iter()
        .filter(|entry| range.contains(entry.start))
        .filter_map(|entry| {
            let end = entry.end?;
            match entry.duration() {
                Some(duration) => Some(Interval {
                    start: entry.start,
                    duration,
                }),
                None => {
                    tracing::warn!(start = %entry.start, end = %end, "skipping interval that ends before it starts");
                    None
                }
            }
        })
        .collect()
}
