//! Hand-off of uploaded images to the ML worker.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use demeter_photos::ProcessingTaskRequest;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker request failed: {0}")]
    Transport(String),

    #[error("worker rejected task with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends processing tasks to whatever runs the ML pipeline.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Returns the worker-assigned task id, when the worker reports one.
    async fn dispatch(&self, task: &ProcessingTaskRequest) -> Result<Option<String>, DispatchError>;
}

/// Posts tasks to `{base_url}/tasks/process`.
#[derive(Debug, Clone)]
pub struct HttpTaskDispatcher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskAccepted {
    #[serde(default)]
    task_id: Option<String>,
}

impl HttpTaskDispatcher {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/tasks/process", base_url.trim_end_matches('/')),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TaskDispatcher for HttpTaskDispatcher {
    #[instrument(skip(self, task), fields(image_id = %task.image_id, pipeline = %task.pipeline), err)]
    async fn dispatch(&self, task: &ProcessingTaskRequest) -> Result<Option<String>, DispatchError> {
        let mut request = self.client.post(&self.endpoint).json(task);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // Workers that answer without a body are fine.
        let accepted = response.json::<TaskAccepted>().await.ok();
        Ok(accepted.and_then(|a| a.task_id))
    }
}

/// Used when no worker is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTaskDispatcher;

#[async_trait]
impl TaskDispatcher for NoopTaskDispatcher {
    async fn dispatch(&self, task: &ProcessingTaskRequest) -> Result<Option<String>, DispatchError> {
        tracing::debug!(image_id = %task.image_id, "no ML worker configured; task not dispatched");
        Ok(None)
    }
}

/// Records dispatched tasks. Optionally fails every dispatch.
#[derive(Debug, Default)]
pub struct InMemoryTaskDispatcher {
    sent: Mutex<Vec<ProcessingTaskRequest>>,
    fail: bool,
}

impl InMemoryTaskDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<ProcessingTaskRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskDispatcher for InMemoryTaskDispatcher {
    async fn dispatch(&self, task: &ProcessingTaskRequest) -> Result<Option<String>, DispatchError> {
        if self.fail {
            return Err(DispatchError::Transport("worker unavailable".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DispatchError::Transport("dispatcher lock poisoned".to_string()))?;
        sent.push(task.clone());
        Ok(Some(format!("task-{}", sent.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task() -> ProcessingTaskRequest {
        ProcessingTaskRequest {
            tenant_id: "tenant-alpha".into(),
            session_id: Uuid::now_v7(),
            image_id: Uuid::now_v7(),
            image_url: "gs://bucket/a.jpg".into(),
            pipeline: "DETECTION".into(),
            options: None,
        }
    }

    #[test]
    fn endpoint_joins_base_url() {
        let d = HttpTaskDispatcher::new("http://ml-worker:8000/", None).unwrap();
        assert_eq!(d.endpoint(), "http://ml-worker:8000/tasks/process");
    }

    #[tokio::test]
    async fn in_memory_records_tasks() {
        let d = InMemoryTaskDispatcher::new();
        let t = task();
        assert_eq!(d.dispatch(&t).await.unwrap().as_deref(), Some("task-1"));
        assert_eq!(d.sent(), vec![t]);
    }

    #[tokio::test]
    async fn failing_dispatcher_errors() {
        let d = InMemoryTaskDispatcher::failing();
        assert!(d.dispatch(&task()).await.is_err());
        assert!(d.sent().is_empty());
    }

    #[tokio::test]
    async fn unreachable_worker_is_transport_error() {
        let d = HttpTaskDispatcher::new("http://127.0.0.1:1", None).unwrap();
        let err = d.dispatch(&task()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }
}
