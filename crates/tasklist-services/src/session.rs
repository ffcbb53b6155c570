//! Async driver for [`TaskList`].
//!
//! User actions are applied to the state right away; the remote calls they
//! produce run on the tokio runtime and report back over an mpsc channel.
//! Completions are applied one at a time, in arrival order.

use tokio::sync::mpsc;

use crate::backend::TaskBackend;
use crate::state::{Command, Event, Mutation, Outcome, TaskList, TaskListOptions, UserAction};

pub struct Session {
    state: TaskList,
    backend: TaskBackend,
    runtime: tokio::runtime::Handle,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    in_flight: usize,
}

impl Session {
    pub fn new(
        backend: TaskBackend,
        options: TaskListOptions,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: TaskList::new(options),
            backend,
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &TaskList {
        &self.state
    }

    pub fn backend(&self) -> &TaskBackend {
        &self.backend
    }

    /// Remote calls spawned but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Kick off the initial load.
    pub fn start(&mut self) {
        let command = self.state.start();
        self.spawn(command);
    }

    pub fn dispatch(&mut self, action: UserAction) {
        tracing::debug!("Dispatching {:?}", action);
        for command in self.state.dispatch(action) {
            self.spawn(command);
        }
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `false` if nothing is in flight.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Apply every completion that has already arrived, without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Wait until no remote call is in flight, including follow-up refreshes.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn handle(&mut self, event: Event) {
        self.in_flight = self.in_flight.saturating_sub(1);
        for command in self.state.apply(event) {
            self.spawn(command);
        }
    }

    fn spawn(&mut self, command: Command) {
        self.in_flight += 1;
        let backend = self.backend.clone();
        let tx = self.tx.clone();

        self.runtime.spawn(async move {
            let event = run(&backend, command).await;
            if tx.send(event).is_err() {
                tracing::debug!("Session dropped before a remote call finished");
            }
        });
    }
}

async fn run(backend: &TaskBackend, command: Command) -> Event {
    match command {
        Command::Load => Event::Loaded(backend.list_all().await),
        Command::Refresh => Event::Refreshed(backend.list_all().await),
        Command::Remote { action, mutation } => {
            let result = match mutation {
                Mutation::Create { name } => backend.create(&name).await.map(Outcome::Created),
                Mutation::Update { id, done } => {
                    backend.update(&id, done).await.map(Outcome::Updated)
                }
                Mutation::Delete { id } => backend.delete(&id).await.map(|_| Outcome::Deleted),
            };
            Event::Resolved { action, result }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::state::LoadState;
    use crate::task::Task;

    fn session_with(tasks: Vec<Task>) -> Session {
        Session::new(
            TaskBackend::memory(MemoryStore::with_tasks(tasks)),
            TaskListOptions::default(),
            tokio::runtime::Handle::current(),
        )
    }

    fn names(session: &Session) -> Vec<String> {
        session
            .state()
            .view_tasks()
            .map(|t| t.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_initial_load() {
        let mut session = session_with(vec![Task::new("a", "buy milk", false)]);
        session.start();
        assert_eq!(session.state().load_state(), &LoadState::Loading);

        session.settle().await;

        assert!(session.state().is_ready());
        assert_eq!(names(&session), vec!["buy milk"]);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_add_then_refresh() {
        let mut session = session_with(Vec::new());
        session.start();
        session.settle().await;
        assert!(!session.state().show_search());

        session.dispatch(UserAction::SetInput("test".into()));
        session.dispatch(UserAction::Submit);
        assert_eq!(names(&session), vec!["test"]);
        assert!(session.state().rows()[0].task().id.is_none());

        session.settle().await;

        assert_eq!(session.state().rows().len(), 1);
        let row = &session.state().rows()[0];
        assert!(row.task().is_persisted());
        assert_eq!(session.state().reference().len(), 1);
        assert_eq!(session.state().reference()[0].id, row.task().id);
        assert!(session.state().show_search());
    }

    #[tokio::test]
    async fn test_failed_toggle_is_rolled_back_and_retried() {
        let mut session = session_with(vec![
            Task::new("m1", "buy milk", false),
            Task::new("d1", "walk dog", true),
        ]);
        session.start();
        session.settle().await;

        let store = session.backend().memory_store().unwrap();
        store.lock().fail_next(1);

        session.dispatch(UserAction::Toggle(0));
        session.settle().await;

        assert_eq!(session.state().failures().len(), 1);
        assert!(!session.state().rows()[0].task().done);

        session.dispatch(UserAction::Retry(0));
        session.settle().await;

        assert!(session.state().failures().is_empty());
        assert!(session.state().reference().iter().all(|t| t.done));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_view_hidden() {
        let mut session = session_with(vec![Task::new("a", "a", false)]);
        session
            .backend()
            .memory_store()
            .unwrap()
            .lock()
            .fail_next(1);

        session.start();
        session.settle().await;
        assert!(session.state().visible_rows().is_none());

        session.dispatch(UserAction::Reload);
        session.settle().await;
        assert_eq!(session.state().visible_rows().map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_delete_reaches_store() {
        let mut session = session_with(vec![
            Task::new("a", "a", false),
            Task::new("b", "b", false),
        ]);
        session.start();
        session.settle().await;

        session.dispatch(UserAction::Delete(1));
        assert_eq!(names(&session), vec!["a"]);
        session.settle().await;

        let remaining = session.backend().list_all().await.unwrap();
        assert_eq!(remaining, vec![Task::new("a", "a", false)]);
        assert_eq!(session.state().reference(), remaining.as_slice());
    }

    #[tokio::test]
    async fn test_next_event_without_work() {
        let mut session = session_with(Vec::new());
        assert!(!session.next_event().await);
        assert_eq!(session.drain(), 0);
    }
}
