//! HTTP client for the remote task store.
//!
//! Endpoints:
//! - `GET /` lists every task
//! - `POST /create`, `POST /update`, `POST /delete` mutate one task

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::error::RemoteError;
use crate::retry::{with_retry, RetryConfig};
use crate::task::{Task, TaskCreateRequest, TaskDeleteRequest, TaskUpdateRequest};

pub struct TaskClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl TaskClient {
    /// Create a client for the store at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Fetch every task in store order.
    #[instrument(skip(self), level = "info")]
    pub async fn list_all(&self) -> Result<Vec<Task>, RemoteError> {
        let url = self.endpoint("");

        let response = with_retry(&self.retry, || self.client.get(&url).send()).await?;

        let tasks: Vec<Task> = Self::handle_response(response).await?;
        tracing::info!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Create a task. The returned task carries its store-assigned id.
    #[instrument(skip(self), level = "info")]
    pub async fn create(&self, name: &str) -> Result<Task, RemoteError> {
        let url = self.endpoint("create");
        let body = TaskCreateRequest {
            task: name.to_string(),
            done: false,
        };

        let response = with_retry(&self.retry, || self.client.post(&url).json(&body).send()).await?;

        let mut task: Task = Self::handle_response(response).await?;
        if !task.is_persisted() {
            return Err(RemoteError::InvalidResponse(
                "created task has no _id".to_string(),
            ));
        }
        if task.name.is_empty() {
            task.name = name.to_string();
        }

        tracing::info!("Created task {:?}", task.id);
        Ok(task)
    }

    /// Set the completion flag of a task.
    #[instrument(skip(self), level = "info")]
    pub async fn update(&self, id: &str, done: bool) -> Result<Task, RemoteError> {
        let url = self.endpoint("update");
        let body = TaskUpdateRequest {
            id: id.to_string(),
            done,
        };

        let response = with_retry(&self.retry, || self.client.post(&url).json(&body).send()).await?;

        let task: Task = Self::handle_response(response).await?;
        tracing::info!("Updated task {} (done={})", id, done);
        Ok(task)
    }

    /// Delete a task. The response body is ignored.
    #[instrument(skip(self), level = "info")]
    pub async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let url = self.endpoint("delete");
        let body = TaskDeleteRequest { id: id.to_string() };

        let response = with_retry(&self.retry, || self.client.post(&url).json(&body).send()).await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Deleted task {}", id);
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| RemoteError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Task store returned {}: {}", status, text);
            Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

impl std::fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
