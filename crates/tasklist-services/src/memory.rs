//! In-process task store with the same contract as the HTTP store.
//!
//! Used for offline runs and tests. Failures can be injected to exercise the
//! rollback paths of the reconciliation state.

use crate::error::RemoteError;
use crate::task::Task;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    fail_remaining: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with persisted tasks.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            fail_remaining: 0,
        }
    }

    /// Make the next `count` calls fail with `RemoteError::Unavailable`.
    pub fn fail_next(&mut self, count: usize) {
        self.fail_remaining = count;
    }

    fn check_available(&mut self) -> Result<(), RemoteError> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(RemoteError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    pub fn list_all(&mut self) -> Result<Vec<Task>, RemoteError> {
        self.check_available()?;
        Ok(self.tasks.clone())
    }

    pub fn create(&mut self, name: &str) -> Result<Task, RemoteError> {
        self.check_available()?;
        let task = Task::new(new_object_id(), name, false);
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update(&mut self, id: &str, done: bool) -> Result<Task, RemoteError> {
        self.check_available()?;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                body: format!("Task not found: {}", id),
            })?;
        task.done = done;
        Ok(task.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), RemoteError> {
        self.check_available()?;
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id.as_deref() != Some(id));
        if self.tasks.len() == before {
            return Err(RemoteError::Status {
                status: 404,
                body: format!("Task not found: {}", id),
            });
        }
        Ok(())
    }
}

/// 24 lowercase hex characters, the shape of the remote store's ids.
fn new_object_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(24);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_object_id() {
        let mut store = MemoryStore::new();
        let task = store.create("test").unwrap();

        let id = task.id.unwrap();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let mut store = MemoryStore::with_tasks(vec![Task::new("a", "buy milk", false)]);

        let updated = store.update("a", true).unwrap();
        assert!(updated.done);

        store.delete("a").unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.update("missing", true),
            Err(RemoteError::Status { status: 404, .. })
        ));
        assert!(store.delete("missing").is_err());
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let mut store = MemoryStore::new();
        store.fail_next(2);

        assert!(store.list_all().is_err());
        assert!(store.create("x").is_err());
        assert!(store.list_all().unwrap().is_empty());
    }
}
