use std::fmt;

/// The GitLab object a task is named after: `i123` or `m45`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRef {
    Issue(u64),
    MergeRequest(u64),
}

impl TaskRef {
    /// Parse a task name of the shape `^(i|m)(\d+)$`. Any other shape is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let kind = chars.next()?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = digits.parse().ok()?;
        match kind {
            'i' => Some(TaskRef::Issue(id)),
            'm' => Some(TaskRef::MergeRequest(id)),
            _ => None,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Issue(id) => write!(f, "i{id}"),
            TaskRef::MergeRequest(id) => write!(f, "m{id}"),
        }
    }
}
