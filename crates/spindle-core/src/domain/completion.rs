//! Completion - タスクの確定結果
//!
//! A completion is immutable once stored. On the wire (dependency snapshots,
//! fragment data) it always has the shape `{"error": .., "data": ..}`, with
//! exactly one side non-null.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use super::errors::TaskError;
use super::task::TaskName;

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Succeeded(Value),
    Failed(TaskError),
}

impl Completion {
    pub fn data(&self) -> Option<&Value> {
        match self {
            Completion::Succeeded(data) => Some(data),
            Completion::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Completion::Succeeded(_) => None,
            Completion::Failed(err) => Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Succeeded(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Completion::Succeeded(data) => json!({ "error": null, "data": data }),
            Completion::Failed(err) => json!({ "error": err.to_string(), "data": null }),
        }
    }
}

impl Serialize for Completion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Completion", 2)?;
        s.serialize_field("error", &self.error().map(ToString::to_string))?;
        s.serialize_field("data", &self.data())?;
        s.end()
    }
}

/// Snapshot of completions keyed by task name.
///
/// Built from the registry at the moment a dependent task starts, so later
/// completions never leak into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Completions(BTreeMap<TaskName, Completion>);

/// What a work function receives.
pub type Dependencies = Completions;

impl Completions {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: TaskName, completion: Completion) {
        self.0.insert(name, completion);
    }

    pub fn get(&self, name: &str) -> Option<&Completion> {
        self.0.get(name)
    }

    /// Successful data of `name`, if it succeeded.
    pub fn data(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Completion::data)
    }

    pub fn error(&self, name: &str) -> Option<&TaskError> {
        self.get(name).and_then(Completion::error)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskName, &Completion)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.0.values().any(|c| !c.is_success())
    }
}

impl FromIterator<(TaskName, Completion)> for Completions {
    fn from_iter<I: IntoIterator<Item = (TaskName, Completion)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_serializes_as_error_data_pair() {
        let ok = serde_json::to_value(Completion::Succeeded(json!({"id": 1}))).unwrap();
        assert_eq!(ok, json!({"error": null, "data": {"id": 1}}));

        let failed = serde_json::to_value(Completion::Failed(TaskError::new("boom"))).unwrap();
        assert_eq!(failed, json!({"error": "boom", "data": null}));
        assert_eq!(Completion::Failed(TaskError::new("boom")).to_json(), failed);
    }

    #[test]
    fn snapshot_lookups() {
        let snapshot: Completions = [
            (TaskName::from("user"), Completion::Succeeded(json!({"id": 1}))),
            (TaskName::from("feed"), Completion::Failed(TaskError::new("timeout"))),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.data("user"), Some(&json!({"id": 1})));
        assert!(snapshot.data("feed").is_none());
        assert_eq!(snapshot.error("feed").map(ToString::to_string).as_deref(), Some("timeout"));
        assert!(snapshot.has_failures());
        assert!(snapshot.get("missing").is_none());
    }
}
