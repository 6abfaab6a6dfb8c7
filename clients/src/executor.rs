//! Shared request execution
//!
//! Every service client sends its requests through a [`RequestExecutor`]:
//! one `reqwest::Client` per service, built from that service's
//! [`ServiceConfig`], with a per-request timeout, JSON default headers, an
//! optional default bearer key, and transport retries.

use crate::error::ClientError;
use crate::response::ApiResponse;
use notes_harness_core::config::ServiceConfig;
use notes_harness_core::retry::RetryPolicy;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Statuses that are retried before the response is handed back.
///
/// Only idempotent methods are retried on status; a POST that reached the
/// server may already have had its effect.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Sends requests to one service.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    config: ServiceConfig,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Build an executor for the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the configuration fails
    /// validation, the API key is not a valid header value, or the HTTP
    /// client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        config
            .validate("service")
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers(config)?)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            retry: config.retry_policy(),
        })
    }

    /// Configuration this executor was built from
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Per-request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Send `GET path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.execute(Method::GET, path, None, None).await
    }

    /// Send `POST path` with an optional JSON body and bearer token.
    ///
    /// `None` for the body sends an empty body; `None` for the token sends
    /// no per-request `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or timeout
    pub async fn post_json(
        &self,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        self.execute(Method::POST, path, body, bearer).await
    }

    /// Poll `path` until it answers 200.
    ///
    /// Transport errors and non-200 statuses both count as "not yet".
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ServiceUnavailable`] after `attempts` failed polls
    pub async fn wait_until_healthy(
        &self,
        path: &str,
        attempts: usize,
        delay: Duration,
    ) -> Result<(), ClientError> {
        for attempt in 1..=attempts {
            match self.get(path).await {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::info!(url = %self.config.url(path), attempt, "Service is healthy");
                    return Ok(());
                }
                Ok(response) => {
                    tracing::debug!(
                        status = response.status().as_u16(),
                        attempt,
                        "Service not healthy yet"
                    );
                }
                Err(e) => tracing::debug!(error = %e, attempt, "Service not reachable yet"),
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(ClientError::ServiceUnavailable {
            url: self.config.url(path),
            attempts,
        })
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.config.url(path);
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ClientError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            %method,
            %url,
            body_bytes = payload.as_ref().map_or(0, Vec::len),
            bearer = bearer.is_some(),
            "Sending request"
        );
        if let Some(payload) = &payload {
            tracing::debug!(body = %String::from_utf8_lossy(payload), "Request body");
        }

        let retry_status = is_idempotent(&method);
        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }
            if let Some(payload) = &payload {
                request = request.body(payload.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if retry_status
                        && RETRYABLE_STATUSES.contains(&status)
                        && attempt < self.retry.max_retries
                    {
                        let delay = self.retry.delay_for_attempt(attempt);
                        tracing::warn!(
                            %url,
                            status = status.as_u16(),
                            attempt = attempt + 1,
                            ?delay,
                            "Retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return ApiResponse::read(response).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(ClientError::Timeout {
                        url,
                        timeout: self.config.timeout(),
                    });
                }
                Err(e) if e.is_connect() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        %url,
                        error = %e,
                        attempt = attempt + 1,
                        ?delay,
                        "Connection failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ClientError::RequestFailed {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

fn default_headers(config: &ServiceConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ClientError::InvalidConfig(format!("api_key: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}
