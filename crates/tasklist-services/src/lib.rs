//! Task list services: the remote store client, the reconciliation state and
//! the async session that ties them together.

pub mod backend;
pub mod client;
pub mod error;
pub mod filter;
pub mod memory;
pub mod retry;
pub mod session;
pub mod state;
pub mod task;

pub use backend::TaskBackend;
pub use client::TaskClient;
pub use error::RemoteError;
pub use filter::Matcher;
pub use memory::MemoryStore;
pub use retry::RetryConfig;
pub use session::Session;
pub use state::{
    ActionId, Command, Event, LoadState, Mutation, Outcome, Row, RowKey, SyncFailure, TaskList,
    TaskListOptions, UserAction,
};
pub use task::{Task, TaskCreateRequest, TaskDeleteRequest, TaskUpdateRequest};
