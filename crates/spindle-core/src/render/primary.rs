//! Primary render declarations.
//!
//! Explicit entry points instead of argument overloading:
//! `render_json`, `render_view`, `render_view_streaming`, `render_view_with`.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::{Completion, Completions};
use crate::ports::{Format, ViewOptions};

/// Builds the template data from the primary set's completions.
pub type Aggregator = Box<dyn FnOnce(&Completions) -> Value + Send>;

pub enum PrimaryData {
    /// User data merged with `{task: data}` of every primary-set task.
    Merge(Value),
    Aggregate(Aggregator),
}

impl PrimaryData {
    pub fn build(self, completions: &Completions) -> Value {
        match self {
            PrimaryData::Merge(base) => merge(base, completions),
            PrimaryData::Aggregate(aggregate) => aggregate(completions),
        }
    }
}

impl fmt::Debug for PrimaryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryData::Merge(v) => f.debug_tuple("Merge").field(v).finish(),
            PrimaryData::Aggregate(_) => f.write_str("Aggregate(..)"),
        }
    }
}

#[derive(Debug)]
pub enum PrimaryRender {
    Json {
        data: PrimaryData,
    },
    View {
        view: String,
        data: PrimaryData,
        options: ViewOptions,
        streaming: bool,
    },
}

impl PrimaryRender {
    pub fn format(&self) -> Format {
        match self {
            PrimaryRender::Json { .. } => Format::Json,
            PrimaryRender::View { options, .. } => options.format,
        }
    }

    pub fn is_explicitly_streaming(&self) -> bool {
        matches!(self, PrimaryRender::View { streaming: true, .. })
    }
}

/// Merge task results into the user's data object. Non-object user data is
/// kept under `"data"`. Failed tasks contribute `null`.
pub fn merge(base: Value, completions: &Completions) -> Value {
    let mut map = match base {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    for (name, completion) in completions.iter() {
        let value = match completion {
            Completion::Succeeded(data) => data.clone(),
            Completion::Failed(_) => Value::Null,
        };
        map.insert(name.to_string(), value);
    }
    Value::Object(map)
}
