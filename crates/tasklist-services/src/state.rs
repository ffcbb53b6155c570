//! Client-side task list state.
//!
//! Two sequences are kept apart:
//! - the reference set, a mirror of whatever the remote store last returned
//! - the view, the rows actually shown and addressed by index
//!
//! User actions change the view immediately and hand back a [`Command`] for
//! the remote call. Completions come back as [`Event`]s. A finished mutation
//! always schedules a refresh of the reference set; refreshes never touch the
//! view and never reapply the active search.
//!
//! Nothing here performs I/O. [`crate::Session`] runs the commands.

use std::collections::{BTreeMap, VecDeque};

use tasklist_core::{Config, FailurePolicy, PatternError, SearchMode, ToggleOrdering};

use crate::error::RemoteError;
use crate::filter::{filter_tasks, Matcher};
use crate::task::Task;

/// Identity of a row in the view, stable across reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey(u64);

/// Identity of one optimistic action awaiting its remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    key: RowKey,
    task: Task,
}

impl Row {
    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn task(&self) -> &Task {
        &self.task
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// A remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { name: String },
    Update { id: String, done: bool },
    Delete { id: String },
}

/// Work for the I/O layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Initial fetch; fills both the reference set and the view.
    Load,
    /// Re-fetch into the reference set only.
    Refresh,
    Remote { action: ActionId, mutation: Mutation },
}

/// Successful result of a [`Mutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Task),
    Updated(Task),
    Deleted,
}

/// Completion of a [`Command`].
#[derive(Debug)]
pub enum Event {
    Loaded(Result<Vec<Task>, RemoteError>),
    Refreshed(Result<Vec<Task>, RemoteError>),
    Resolved {
        action: ActionId,
        result: Result<Outcome, RemoteError>,
    },
}

/// Everything a user can do to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SetInput(String),
    Submit,
    Toggle(usize),
    Delete(usize),
    Search(String),
    Retry(usize),
    Dismiss(usize),
    Reload,
}

/// A mutation the remote store did not confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub action: ActionId,
    pub mutation: Mutation,
    pub message: String,
    row: Option<RowKey>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskListOptions {
    pub toggle_ordering: ToggleOrdering,
    pub failure_policy: FailurePolicy,
    pub search_mode: SearchMode,
}

impl From<&Config> for TaskListOptions {
    fn from(config: &Config) -> Self {
        Self {
            toggle_ordering: config.sync.toggle_ordering,
            failure_policy: config.sync.failure_policy,
            search_mode: config.search.mode,
        }
    }
}

#[derive(Debug, Clone)]
enum Undo {
    Add { row: RowKey },
    Toggle { row: RowKey, previous: bool },
    Delete { row: Row, index: usize },
    Nothing,
}

#[derive(Debug, Clone)]
struct Pending {
    mutation: Mutation,
    undo: Undo,
}

/// Walk `items` in order, appending done items and prepending open ones.
///
/// Done items keep their relative order; open items come out reversed.
pub fn partition_replay<T>(items: Vec<T>, is_done: impl Fn(&T) -> bool) -> Vec<T> {
    let mut out = VecDeque::with_capacity(items.len());
    for item in items {
        if is_done(&item) {
            out.push_back(item);
        } else {
            out.push_front(item);
        }
    }
    out.into()
}

/// Open items first, then done items, each keeping their relative order.
pub fn partition_stable<T>(items: Vec<T>, is_done: impl Fn(&T) -> bool) -> Vec<T> {
    let (open, done): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| !is_done(item));
    open.into_iter().chain(done).collect()
}

#[derive(Debug)]
pub struct TaskList {
    options: TaskListOptions,
    load_state: LoadState,
    reference: Vec<Task>,
    view: Vec<Row>,
    input: String,
    pattern: String,
    pattern_error: Option<PatternError>,
    pending: BTreeMap<ActionId, Pending>,
    failures: Vec<SyncFailure>,
    next_row: u64,
    next_action: u64,
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new(TaskListOptions::default())
    }
}

impl TaskList {
    pub fn new(options: TaskListOptions) -> Self {
        Self {
            options,
            load_state: LoadState::Loading,
            reference: Vec::new(),
            view: Vec::new(),
            input: String::new(),
            pattern: String::new(),
            pattern_error: None,
            pending: BTreeMap::new(),
            failures: Vec::new(),
            next_row: 0,
            next_action: 0,
        }
    }

    pub fn options(&self) -> TaskListOptions {
        self.options
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready
    }

    /// The reference set, in remote store order.
    pub fn reference(&self) -> &[Task] {
        &self.reference
    }

    /// The view, regardless of load state.
    pub fn rows(&self) -> &[Row] {
        &self.view
    }

    /// The view as it may be rendered. `None` until the initial load succeeds.
    pub fn visible_rows(&self) -> Option<&[Row]> {
        self.is_ready().then_some(self.view.as_slice())
    }

    pub fn view_tasks(&self) -> impl Iterator<Item = &Task> {
        self.view.iter().map(Row::task)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Set when the active pattern failed to compile.
    pub fn pattern_error(&self) -> Option<&PatternError> {
        self.pattern_error.as_ref()
    }

    pub fn failures(&self) -> &[SyncFailure] {
        &self.failures
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The search box is only offered once there is something to search.
    pub fn show_search(&self) -> bool {
        !self.reference.is_empty()
    }

    /// Begin the initial load.
    pub fn start(&mut self) -> Command {
        self.load_state = LoadState::Loading;
        Command::Load
    }

    /// Same as [`TaskList::start`]; used after a failed load.
    pub fn reload(&mut self) -> Command {
        tracing::info!("Reloading task list");
        self.start()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Add the drafted task to the end of the view and clear the draft.
    pub fn submit(&mut self) -> Option<Command> {
        if !self.is_ready() {
            tracing::warn!("Ignoring submit before the task list is loaded");
            return None;
        }
        if self.input.trim().is_empty() {
            tracing::debug!("Ignoring empty task name");
            return None;
        }

        let name = std::mem::take(&mut self.input);
        let row = self.new_row(Task::transient(name.clone()));
        let key = row.key;
        self.view.push(row);

        tracing::debug!("Optimistically added {:?}", name);
        Some(self.issue(Mutation::Create { name }, Undo::Add { row: key }))
    }

    /// Flip the completion flag of the row at `index` and reorder the view.
    pub fn toggle(&mut self, index: usize) -> Option<Command> {
        if !self.is_ready() {
            return None;
        }
        let Some(row) = self.view.get(index) else {
            tracing::warn!("Toggle index {} out of range ({} rows)", index, self.view.len());
            return None;
        };
        // Captured before reordering shifts the indices.
        let Some(id) = row.task.id.clone() else {
            tracing::warn!("Cannot toggle {:?} before the store confirms it", row.task.name);
            return None;
        };
        let key = row.key;
        let previous = row.task.done;

        self.view[index].task.done = !previous;
        self.reorder();

        tracing::debug!("Toggled {} to done={}", id, !previous);
        Some(self.issue(
            Mutation::Update {
                id,
                done: !previous,
            },
            Undo::Toggle { row: key, previous },
        ))
    }

    /// Remove the row at `index` from the view.
    pub fn delete(&mut self, index: usize) -> Option<Command> {
        if !self.is_ready() {
            return None;
        }
        let Some(row) = self.view.get(index) else {
            tracing::warn!("Delete index {} out of range ({} rows)", index, self.view.len());
            return None;
        };
        let key = row.key;

        let Some(id) = row.task.id.clone() else {
            if self.has_pending_create(key) {
                tracing::warn!("Cannot delete {:?} before the store confirms it", row.task.name);
                return None;
            }
            // Left behind by a failed create; nothing exists remotely.
            self.view.remove(index);
            self.failures.retain(|f| f.row != Some(key));
            return None;
        };

        let row = self.view.remove(index);
        tracing::debug!("Optimistically deleted {}", id);
        Some(self.issue(Mutation::Delete { id }, Undo::Delete { row, index }))
    }

    /// Rebuild the view from the reference set, keeping matching names.
    pub fn search(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();

        let matcher = match Matcher::compile(&self.pattern, self.options.search_mode) {
            Ok(matcher) => {
                self.pattern_error = None;
                matcher
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.pattern_error = Some(e);
                Matcher::nothing()
            }
        };

        // The reference set still lists tasks whose delete has not resolved.
        let tasks: Vec<Task> = filter_tasks(&self.reference, &matcher)
            .into_iter()
            .filter(|t| !t.id.as_deref().is_some_and(|id| self.is_pending_delete(id)))
            .collect();
        self.view = tasks.into_iter().map(|t| self.new_row(t)).collect();
        tracing::debug!(
            "Search {:?} matched {} of {} tasks",
            self.pattern,
            self.view.len(),
            self.reference.len()
        );
    }

    /// Re-run a failed mutation, re-applying its local change when possible.
    pub fn retry_failure(&mut self, index: usize) -> Option<Command> {
        if !self.is_ready() || index >= self.failures.len() {
            return None;
        }
        let failure = self.failures.remove(index);
        tracing::info!("Retrying failed action {}", failure.action);

        let command = match failure.mutation {
            Mutation::Create { name } => {
                let key = match failure.row.filter(|k| self.position(*k).is_some()) {
                    Some(key) => key,
                    None => {
                        let row = self.new_row(Task::transient(name.clone()));
                        let key = row.key;
                        self.view.push(row);
                        key
                    }
                };
                self.issue(Mutation::Create { name }, Undo::Add { row: key })
            }
            Mutation::Update { id, done } => {
                let undo = match self.position_by_id(&id) {
                    Some(i) => {
                        let key = self.view[i].key;
                        if self.view[i].task.done != done {
                            self.view[i].task.done = done;
                            self.reorder();
                        }
                        Undo::Toggle {
                            row: key,
                            previous: !done,
                        }
                    }
                    None => Undo::Nothing,
                };
                self.issue(Mutation::Update { id, done }, undo)
            }
            Mutation::Delete { id } => {
                let undo = match self.position_by_id(&id) {
                    Some(i) => Undo::Delete {
                        row: self.view.remove(i),
                        index: i,
                    },
                    None => Undo::Nothing,
                };
                self.issue(Mutation::Delete { id }, undo)
            }
        };
        Some(command)
    }

    pub fn dismiss_failure(&mut self, index: usize) -> Option<SyncFailure> {
        (index < self.failures.len()).then(|| self.failures.remove(index))
    }

    /// Apply a user action.
    pub fn dispatch(&mut self, action: UserAction) -> Vec<Command> {
        match action {
            UserAction::SetInput(text) => {
                self.set_input(text);
                Vec::new()
            }
            UserAction::Submit => self.submit().into_iter().collect(),
            UserAction::Toggle(index) => self.toggle(index).into_iter().collect(),
            UserAction::Delete(index) => self.delete(index).into_iter().collect(),
            UserAction::Search(pattern) => {
                self.search(pattern);
                Vec::new()
            }
            UserAction::Retry(index) => self.retry_failure(index).into_iter().collect(),
            UserAction::Dismiss(index) => {
                self.dismiss_failure(index);
                Vec::new()
            }
            UserAction::Reload => vec![self.reload()],
        }
    }

    /// Apply a completion. Returns follow-up commands.
    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Loaded(Ok(tasks)) => {
                tracing::info!("Loaded {} tasks", tasks.len());
                self.view = tasks.iter().cloned().map(|t| self.new_row(t)).collect();
                self.reference = tasks;
                self.pattern.clear();
                self.pattern_error = None;
                self.load_state = LoadState::Ready;
                Vec::new()
            }
            Event::Loaded(Err(e)) => {
                tracing::error!("Initial load failed: {}", e);
                self.load_state = LoadState::Failed(e.user_message());
                Vec::new()
            }
            Event::Refreshed(Ok(tasks)) => {
                tracing::debug!("Reference set refreshed ({} tasks)", tasks.len());
                self.reference = tasks;
                Vec::new()
            }
            Event::Refreshed(Err(e)) => {
                tracing::warn!("Refresh failed, keeping previous reference set: {}", e);
                Vec::new()
            }
            Event::Resolved { action, result } => {
                let Some(pending) = self.pending.remove(&action) else {
                    tracing::warn!("Completion for unknown action {}", action);
                    return Vec::new();
                };
                match result {
                    Ok(outcome) => self.confirm(action, pending, outcome),
                    Err(e) => self.fail(action, pending, e),
                }
                vec![Command::Refresh]
            }
        }
    }

    fn confirm(&mut self, action: ActionId, pending: Pending, outcome: Outcome) {
        match (outcome, pending.undo) {
            (Outcome::Created(task), Undo::Add { row }) => match self.position(row) {
                Some(i) => {
                    tracing::debug!("Action {} confirmed as {:?}", action, task.id);
                    self.view[i].task.id = task.id;
                }
                None => tracing::debug!("Created task {:?} is no longer in view", task.id),
            },
            (outcome, _) => tracing::debug!("Action {} confirmed: {:?}", action, outcome),
        }
    }

    fn fail(&mut self, action: ActionId, pending: Pending, error: RemoteError) {
        tracing::error!("Action {} ({:?}) failed: {}", action, pending.mutation, error);

        let row = match &pending.undo {
            Undo::Add { row } | Undo::Toggle { row, .. } => Some(*row),
            Undo::Delete { row, .. } => Some(row.key),
            Undo::Nothing => None,
        };

        if self.options.failure_policy == FailurePolicy::Rollback {
            self.rollback(pending.undo);
        }

        self.failures.push(SyncFailure {
            action,
            mutation: pending.mutation,
            message: error.user_message(),
            row,
        });
    }

    fn rollback(&mut self, undo: Undo) {
        match undo {
            Undo::Add { row } => {
                if let Some(i) = self.position(row) {
                    let removed = self.view.remove(i);
                    tracing::warn!("Rolled back add of {:?}", removed.task.name);
                }
            }
            Undo::Toggle { row, previous } => {
                if let Some(i) = self.position(row) {
                    self.view[i].task.done = previous;
                    tracing::warn!("Rolled back toggle of {:?}", self.view[i].task.name);
                }
            }
            Undo::Delete { row, index } => {
                let shown = row
                    .task
                    .id
                    .as_deref()
                    .is_some_and(|id| self.position_by_id(id).is_some());
                if shown {
                    tracing::debug!("Deleted {:?} is already back in view", row.task.name);
                    return;
                }
                let index = index.min(self.view.len());
                tracing::warn!("Rolled back delete of {:?}", row.task.name);
                self.view.insert(index, row);
            }
            Undo::Nothing => {}
        }
    }

    fn issue(&mut self, mutation: Mutation, undo: Undo) -> Command {
        let action = ActionId(self.next_action);
        self.next_action += 1;
        self.pending.insert(
            action,
            Pending {
                mutation: mutation.clone(),
                undo,
            },
        );
        Command::Remote { action, mutation }
    }

    fn new_row(&mut self, task: Task) -> Row {
        let key = RowKey(self.next_row);
        self.next_row += 1;
        Row { key, task }
    }

    fn reorder(&mut self) {
        let rows = std::mem::take(&mut self.view);
        self.view = match self.options.toggle_ordering {
            ToggleOrdering::Replay => partition_replay(rows, |r| r.task.done),
            ToggleOrdering::Stable => partition_stable(rows, |r| r.task.done),
        };
    }

    fn position(&self, key: RowKey) -> Option<usize> {
        self.view.iter().position(|r| r.key == key)
    }

    fn position_by_id(&self, id: &str) -> Option<usize> {
        self.view
            .iter()
            .position(|r| r.task.id.as_deref() == Some(id))
    }

    fn is_pending_delete(&self, id: &str) -> bool {
        self.pending
            .values()
            .any(|p| matches!(&p.mutation, Mutation::Delete { id: pending } if pending == id))
    }

    fn has_pending_create(&self, key: RowKey) -> bool {
        self.pending
            .values()
            .any(|p| matches!(p.undo, Undo::Add { row } if row == key))
    }
}
