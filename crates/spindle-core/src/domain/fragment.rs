use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the client uses to place a piped fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FragmentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FragmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
