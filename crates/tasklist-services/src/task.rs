//! Task types and the request bodies of the remote task store.

use serde::{Deserialize, Serialize};

/// A single task.
///
/// `id` is assigned by the remote store. A task without one was created
/// locally and is still waiting for the store to confirm it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    /// A task the remote store already knows about.
    pub fn new(id: impl Into<String>, name: impl Into<String>, done: bool) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            done,
        }
    }

    /// A freshly entered task with no id yet.
    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            done: false,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Body of `POST /create`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskCreateRequest {
    pub task: String,
    pub done: bool,
}

/// Body of `POST /update`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdateRequest {
    pub id: String,
    pub done: bool,
}

/// Body of `POST /delete`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDeleteRequest {
    pub id: String,
}
