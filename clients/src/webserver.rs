//! Client for the webserver

use crate::error::ClientError;
use crate::executor::RequestExecutor;
use crate::response::ApiResponse;
use notes_harness_core::config::ServiceConfig;
use notes_harness_core::models::Note;
use serde_json::Value;
use std::time::Duration;

/// Path suffix of the note-creation endpoint, below the API version.
pub const CREATE_NOTE_PATH: &str = "/spaces/notes/create";

/// Webserver client: health, metrics and note creation.
#[derive(Debug, Clone)]
pub struct WebServerClient {
    executor: RequestExecutor,
}

impl WebServerClient {
    /// Build a client from the webserver configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the configuration is unusable
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        RequestExecutor::new(config).map(Self::from_executor)
    }

    /// Wrap an existing executor.
    #[must_use]
    pub const fn from_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Underlying executor
    #[must_use]
    pub const fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// `GET /api/<version>/health`
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn get_health(&self) -> Result<ApiResponse, ClientError> {
        self.executor.get(&self.health_path()).await
    }

    /// `GET /metrics`
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn get_metrics(&self) -> Result<ApiResponse, ClientError> {
        self.executor.get("/metrics").await
    }

    /// `POST /api/<version>/spaces/notes/create` with a raw body.
    ///
    /// The body is sent as given so malformed requests can be tested.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn create_note(&self, body: Option<&Value>) -> Result<ApiResponse, ClientError> {
        let path = self.executor.config().versioned_path(CREATE_NOTE_PATH);
        self.executor.post_json(&path, body, None).await
    }

    /// Submit a well-formed note.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn submit_note(&self, note: &Note) -> Result<ApiResponse, ClientError> {
        let body = serde_json::to_value(note)
            .map_err(|e| ClientError::InvalidConfig(format!("note is not serializable: {e}")))?;
        self.create_note(Some(&body)).await
    }

    /// Poll the health endpoint until it answers 200.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ServiceUnavailable`] after `attempts` failed polls
    pub async fn wait_until_healthy(
        &self,
        attempts: usize,
        delay: Duration,
    ) -> Result<(), ClientError> {
        self.executor
            .wait_until_healthy(&self.health_path(), attempts, delay)
            .await
    }

    fn health_path(&self) -> String {
        self.executor.config().versioned_path("/health")
    }
}
