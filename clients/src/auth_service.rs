//! Client for the auth service

use crate::error::ClientError;
use crate::executor::RequestExecutor;
use crate::response::ApiResponse;
use notes_harness_core::config::ServiceConfig;
use serde_json::Value;
use std::time::Duration;

/// Path suffix of the note-filtering endpoint, below the API version.
pub const FILTER_NOTES_PATH: &str = "/auth/notes/filter";

/// Auth service client: health, metrics and note filtering.
///
/// Configure no `api_key` for this service. A default bearer credential
/// would be sent on every request and mask the missing-token cases.
#[derive(Debug, Clone)]
pub struct AuthServiceClient {
    executor: RequestExecutor,
}

impl AuthServiceClient {
    /// Build a client from the auth service configuration.
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

    /// `POST /api/<version>/auth/notes/filter`.
    ///
    /// `token` is sent as `Authorization: Bearer <token>` when present.
    /// `body` is sent verbatim, or as an empty body when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn filter_notes(
        &self,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        let path = self.executor.config().versioned_path(FILTER_NOTES_PATH);
        self.executor.post_json(&path, body, token).await
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
