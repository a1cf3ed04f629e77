use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::timestamp;

/// A task file as shared with the time tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logbook: Option<Vec<LogEntry>>,
    /// Fields owned by the tracker that this tool does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(
        rename = "merge-request",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub merge_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Property values are either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    One(String),
    Many(Vec<String>),
}

/// One tracked interval. `end == None` means the clock is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "in", with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(rename = "out", with = "timestamp::option", default)]
    pub end: Option<NaiveDateTime>,
}

impl LogEntry {
    /// Length of a closed interval. `None` while open or when `end` precedes `start`.
    pub fn duration(&self) -> Option<TimeDelta> {
        let end = self.end?;
        let duration = end - self.start;
        (duration >= TimeDelta::zero()).then_some(duration)
    }
}

impl TaskRecord {
    pub fn logbook(&self) -> &[LogEntry] {
        self.logbook.as_deref().unwrap_or_default()
    }

    pub fn has_logbook(&self) -> bool {
        !self.logbook().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_record_serializes_compactly() {
        let record = TaskRecord {
            title: "Fix bug".into(),
            properties: Properties {
                issues: Some(PropertyValue::One("10".into())),
                status: Some("opened".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Fix bug","properties":{"issues":"10","status":"opened"}}"#
        );
    }

    #[test]
    fn merge_request_record_lists_issues() {
        let record = TaskRecord {
            title: "Refactor".into(),
            properties: Properties {
                merge_request: Some("7".into()),
                issues: Some(PropertyValue::Many(vec!["1".into(), "2".into()])),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Refactor","properties":{"merge-request":"7","issues":["1","2"]}}"#
        );
    }

    #[test]
    fn logbook_with_open_interval_deserializes() {
        let json = r#"{
            "title": "t",
            "properties": {"issues": "3", "priority": "high"},
            "logbook": [
                {"in": "2024-03-01T09:00:00", "out": "2024-03-01T11:05:00"},
                {"in": "2024-03-02T09:00:00", "out": null},
                {"in": "2024-03-03T09:00:00"}
            ],
            "notes": ["keep me"]
        }"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        let logbook = record.logbook();
        assert_eq!(logbook.len(), 3);
        assert!(logbook[0].end.is_some());
        assert!(logbook[1].end.is_none());
        assert!(logbook[2].end.is_none());
        assert_eq!(logbook[0].duration(), Some(TimeDelta::minutes(125)));
        assert_eq!(logbook[1].duration(), None);
        assert_eq!(record.properties.other["priority"], "high");
        assert!(record.extra.contains_key("notes"));
    }

    #[test]
    fn negative_interval_has_no_duration() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"in": "2024-03-01T11:00:00", "out": "2024-03-01T09:00:00"}"#,
        )
        .unwrap();
        assert_eq!(entry.duration(), None);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let result: Result<LogEntry, _> = serde_json::from_str(r#"{"in": "soon", "out": null}"#);
        assert!(result.unwrap_err().to_string().contains("invalid timestamp"));
    }
}
