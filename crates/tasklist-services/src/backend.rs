//! Unified task backend.
//!
//! `TaskBackend` wraps the HTTP store and the in-memory store behind one
//! async interface so the session does not care which one it talks to.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::TaskClient;
use crate::error::RemoteError;
use crate::memory::MemoryStore;
use crate::task::Task;

#[derive(Clone)]
pub enum TaskBackend {
    /// Remote HTTP task store.
    Http(Arc<TaskClient>),

    /// In-process store.
    Memory(Arc<Mutex<MemoryStore>>),
}

impl TaskBackend {
    pub fn http(client: TaskClient) -> Self {
        Self::Http(Arc::new(client))
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self::Memory(Arc::new(Mutex::new(store)))
    }

    /// Get the underlying in-memory store (if using the memory backend).
    pub fn memory_store(&self) -> Option<Arc<Mutex<MemoryStore>>> {
        match self {
            Self::Http(_) => None,
            Self::Memory(store) => Some(store.clone()),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Task>, RemoteError> {
        match self {
            Self::Http(client) => client.list_all().await,
            Self::Memory(store) => store.lock().list_all(),
        }
    }

    pub async fn create(&self, name: &str) -> Result<Task, RemoteError> {
        match self {
            Self::Http(client) => client.create(name).await,
            Self::Memory(store) => store.lock().create(name),
        }
    }

    pub async fn update(&self, id: &str, done: bool) -> Result<Task, RemoteError> {
        match self {
            Self::Http(client) => client.update(id, done).await,
            Self::Memory(store) => store.lock().update(id, done),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        match self {
            Self::Http(client) => client.delete(id).await,
            Self::Memory(store) => store.lock().delete(id),
        }
    }
}

impl std::fmt::Debug for TaskBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(client) => f.debug_tuple("TaskBackend::Http").field(client).finish(),
            Self::Memory(_) => f.debug_tuple("TaskBackend::Memory").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = TaskBackend::memory(MemoryStore::new());

        let created = backend.create("buy milk").await.unwrap();
        let id = created.id.clone().unwrap();

        let updated = backend.update(&id, true).await.unwrap();
        assert!(updated.done);

        let tasks = backend.list_all().await.unwrap();
        assert_eq!(tasks, vec![Task::new(id.clone(), "buy milk", true)]);

        backend.delete(&id).await.unwrap();
        assert!(backend.list_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_accessor() {
        let backend = TaskBackend::memory(MemoryStore::new());
        assert!(backend.memory_store().is_some());
    }
}
