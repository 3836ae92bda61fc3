use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{Completion, FragmentId, TaskName};
use crate::ports::Format;

/// Options of a `.pipe(view, options)` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeOptions {
    /// Client-side placeholder id. Defaults to the task name.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub format: Format,
}

impl PipeOptions {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// "Render `view` with the result of `task` once it completes."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub id: FragmentId,
    pub task: TaskName,
    pub view: String,
    pub format: Format,
}

impl Fragment {
    pub fn new(task: TaskName, view: impl Into<String>, options: PipeOptions) -> Self {
        let id = options
            .id
            .map(FragmentId::from)
            .unwrap_or_else(|| FragmentId::new(task.as_str()));
        Self {
            id,
            task,
            view: view.into(),
            format: options.format,
        }
    }

    /// Template data: the completion (`error` / `data`) plus the fragment id.
    pub fn data(&self, completion: &Completion) -> Value {
        let mut data = completion.to_json();
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), json!(self.id));
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskError;

    #[test]
    fn id_defaults_to_task_name() {
        let f = Fragment::new("feed".into(), "feed_view", PipeOptions::default());
        assert_eq!(f.id.as_str(), "feed");

        let f = Fragment::new("feed".into(), "feed_view", PipeOptions::with_id("sidebar"));
        assert_eq!(f.id.as_str(), "sidebar");
    }

    #[test]
    fn data_carries_error_for_failed_tasks() {
        let f = Fragment::new("feed".into(), "feed_view", PipeOptions::default());
        let data = f.data(&Completion::Failed(TaskError::new("upstream down")));
        assert_eq!(data, json!({"id": "feed", "error": "upstream down", "data": null}));
    }
}
