use std::fmt;

use anyhow::{bail, Result};

/// Location of a task in the local tree: `{group}/{subgroup}/{task}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPath {
    pub group: String,
    pub subgroup: String,
    pub task: String,
}

impl TaskPath {
    /// Resolve the free-form task arguments of the CLI.
    ///
    /// Supported forms:
    ///   acme/backend/i42
    ///   acme backend i42
    pub fn from_args(args: &[String]) -> Result<Self> {
        let parts: Vec<&str> = match args {
            [single] => single.split('/').collect(),
            [group, subgroup, task] => vec![group.as_str(), subgroup.as_str(), task.as_str()],
            _ => bail!(
                "Invalid task reference {:?}, expected <group>/<subgroup>/<task> or <group> <subgroup> <task>",
                args.join(" ")
            ),
        };

        let [group, subgroup, task] = parts.as_slice() else {
            bail!("Invalid task reference {:?}, expected <group>/<subgroup>/<task>", args.join(" "));
        };

        for part in [group, subgroup, task] {
            if part.is_empty() || *part == "." || *part == ".." || part.contains(['/', '\\']) {
                bail!("Invalid task reference component {part:?}");
            }
        }

        Ok(Self {
            group: group.to_string(),
            subgroup: subgroup.to_string(),
            task: task.to_string(),
        })
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.subgroup, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_slash_separated() {
        let path = TaskPath::from_args(&args(&["acme/backend/i42"])).unwrap();
        assert_eq!(path.group, "acme");
        assert_eq!(path.subgroup, "backend");
        assert_eq!(path.task, "i42");
    }

    #[test]
    fn parse_three_positionals() {
        let path = TaskPath::from_args(&args(&["acme", "backend", "m7"])).unwrap();
        assert_eq!(path.to_string(), "acme/backend/m7");
    }

    #[test]
    fn wrong_arity_fails() {
        assert!(TaskPath::from_args(&args(&[])).is_err());
        assert!(TaskPath::from_args(&args(&["acme", "backend"])).is_err());
        assert!(TaskPath::from_args(&args(&["acme/backend"])).is_err());
        assert!(TaskPath::from_args(&args(&["a/b/c/d"])).is_err());
    }

    #[test]
    fn traversal_components_fail() {
        let result = TaskPath::from_args(&args(&["..", "backend", "i1"]));
        assert!(result.unwrap_err().to_string().contains("component"));
        assert!(TaskPath::from_args(&args(&["acme//i1"])).is_err());
    }
}
