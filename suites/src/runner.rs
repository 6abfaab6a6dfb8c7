//! Scenario runner
//!
//! Executes case tables against the services: sends the request, checks the
//! status and body, and for accepted notes follows the request through to
//! the queue.

use crate::cases::{CreateNoteCase, FilterNotesCase};
use crate::checks::{assert_status, check_time_difference, created_at};
use crate::error::ScenarioFailure;
use notes_harness_clients::{ApiResponse, AuthServiceClient, WebServerClient};
use notes_harness_core::clock::Clock;
use notes_harness_core::config::HarnessConfig;
use notes_harness_core::models::{FilterNotesResponse, FullMessage, RequestId};
use notes_harness_core::queue::MessageQueue;
use notes_harness_token::TokenFactory;
use reqwest::StatusCode;
use std::time::Duration;

/// Service addressed by the shared health and metrics checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    /// The note-creation API
    WebServer,
    /// The note permission service
    AuthService,
}

/// Result of a create-note case.
#[derive(Debug, Clone)]
pub struct CreateNoteOutcome {
    /// The HTTP response
    pub response: ApiResponse,
    /// The message taken off the queue, for accepted notes
    pub message: Option<FullMessage>,
}

/// Runs scenarios against the configured services.
///
/// The queue and clock are injected so the runner can be driven offline with
/// an in-memory queue and a fixed clock.
#[derive(Debug)]
pub struct ScenarioRunner<Q, C> {
    webserver: WebServerClient,
    auth_service: AuthServiceClient,
    tokens: Option<TokenFactory>,
    queue: Q,
    notes_queue: String,
    clock: C,
    tolerance: Duration,
}

impl<Q: MessageQueue, C: Clock> ScenarioRunner<Q, C> {
    /// Build a runner from the harness configuration.
    ///
    /// Without an auth service `secret_key` the runner still works, but
    /// filter-notes cases that need a token fail with
    /// [`ScenarioFailure::Setup`].
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioFailure::Transport`] if a client cannot be built
    pub fn new(config: &HarnessConfig, queue: Q, clock: C) -> Result<Self, ScenarioFailure> {
        let tokens = TokenFactory::from_config(&config.auth_service).ok();
        if tokens.is_none() {
            tracing::warn!("No auth_service.secret_key configured; token cases will fail");
        }

        Ok(Self {
            webserver: WebServerClient::new(&config.webserver)?,
            auth_service: AuthServiceClient::new(&config.auth_service)?,
            tokens,
            queue,
            notes_queue: config.rabbitmq.notes_queue.clone(),
            clock,
            tolerance: config.scenarios.clock_skew_tolerance(),
        })
    }

    /// Webserver client
    #[must_use]
    pub const fn webserver(&self) -> &WebServerClient {
        &self.webserver
    }

    /// Auth service client
    #[must_use]
    pub const fn auth_service(&self) -> &AuthServiceClient {
        &self.auth_service
    }

    /// Queue the runner reads accepted notes from
    #[must_use]
    pub const fn queue(&self) -> &Q {
        &self.queue
    }

    /// Name of the notes queue
    #[must_use]
    pub fn notes_queue(&self) -> &str {
        &self.notes_queue
    }

    /// `GET` the health endpoint of `service` and require 200.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioFailure`] on transport failure or any other status
    pub async fn check_health(&self, service: Service) -> Result<ApiResponse, ScenarioFailure> {
        let response = match service {
            Service::WebServer => self.webserver.get_health().await?,
            Service::AuthService => self.auth_service.get_health().await?,
        };
        assert_status(&response, StatusCode::OK)?;
        tracing::info!(?service, "Health check passed");
        Ok(response)
    }

    /// `GET /metrics` on `service` and require 200 with a non-empty body.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioFailure`] on transport failure, another status,
    /// or an empty body
    pub async fn check_metrics(&self, service: Service) -> Result<ApiResponse, ScenarioFailure> {
        let response = match service {
            Service::WebServer => self.webserver.get_metrics().await?,
            Service::AuthService => self.auth_service.get_metrics().await?,
        };
        assert_status(&response, StatusCode::OK)?;
        if response.body().is_empty() {
            return Err(ScenarioFailure::EmptyBody);
        }
        tracing::info!(?service, bytes = response.body().len(), "Metrics check passed");
        Ok(response)
    }

    /// Run one filter-notes case.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioFailure`] the case hits
    pub async fn run_filter_notes(
        &self,
        case: &FilterNotesCase,
    ) -> Result<ApiResponse, ScenarioFailure> {
        tracing::info!(case = case.name, "Running filter-notes case");

        let token = match case.token_fields {
            Some(fields) => {
                let tokens = self.tokens.as_ref().ok_or_else(|| {
                    ScenarioFailure::Setup("auth_service.secret_key is not configured".to_string())
                })?;
                Some(tokens.issue(&fields.claims(self.clock.now()))?)
            }
            None => None,
        };

        let response = self
            .auth_service
            .filter_notes(token.as_deref(), case.body.as_ref())
            .await?;
        assert_status(&response, case.expected_status)?;

        if let Some(expected) = case.expected_error {
            let actual = response
                .error_message()
                .map_err(|e| ScenarioFailure::schema("ErrorBody", &e))?;
            if actual != expected {
                return Err(ScenarioFailure::ErrorMessageMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        if let Some(expected) = &case.expected_response {
            if response.status() == StatusCode::OK {
                response
                    .json::<FilterNotesResponse>()
                    .map_err(|e| ScenarioFailure::schema("FilterNotesResponse", &e))?;
            }
            let actual = response
                .json_value()
                .map_err(|e| ScenarioFailure::schema("response body", &e))?;
            if &actual != expected {
                return Err(ScenarioFailure::BodyMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        tracing::info!(case = case.name, "Filter-notes case passed");
        Ok(response)
    }

    /// Run one create-note case.
    ///
    /// An accepted note must show up on the notes queue, equal to the
    /// submitted note apart from `created`, which must be within the clock
    /// skew tolerance of now. A rejected request must leave the queue empty.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioFailure`] the case hits
    pub async fn run_create_note(
        &self,
        case: &CreateNoteCase,
    ) -> Result<CreateNoteOutcome, ScenarioFailure> {
        tracing::info!(case = case.name, "Running create-note case");

        let response = self.webserver.create_note(case.body.as_ref()).await?;
        assert_status(&response, case.expected_status)?;

        let message = if response.status() == StatusCode::ACCEPTED {
            let request_id = response
                .json::<RequestId>()
                .map_err(|e| ScenarioFailure::schema("RequestId", &e))?
                .request_id;
            tracing::debug!(case = case.name, %request_id, "Note accepted");

            match &case.expected_message {
                Some(note) => {
                    let expected = FullMessage::expected(note.clone(), request_id);
                    Some(self.verify_queued(expected).await?)
                }
                None => None,
            }
        } else {
            if let Some(expected) = &case.expected_response {
                let actual = response
                    .json_value()
                    .map_err(|e| ScenarioFailure::schema("response body", &e))?;
                if &actual != expected {
                    return Err(ScenarioFailure::BodyMismatch {
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
            self.verify_queue_empty().await?;
            None
        };

        tracing::info!(case = case.name, "Create-note case passed");
        Ok(CreateNoteOutcome { response, message })
    }

    async fn verify_queued(&self, expected: FullMessage) -> Result<FullMessage, ScenarioFailure> {
        let payload = self
            .queue
            .fetch_one(&self.notes_queue)
            .await?
            .ok_or_else(|| ScenarioFailure::NoMessage {
                queue: self.notes_queue.clone(),
            })?;

        let actual: FullMessage =
            serde_json::from_slice(&payload).map_err(|e| ScenarioFailure::Schema {
                record: "FullMessage",
                reason: e.to_string(),
            })?;

        if !expected.matches_ignoring_created(&actual) {
            return Err(ScenarioFailure::MessageMismatch {
                expected: Box::new(expected),
                actual: Box::new(actual),
            });
        }

        check_time_difference(created_at(&actual)?, self.clock.now(), self.tolerance)?;
        Ok(actual)
    }

    async fn verify_queue_empty(&self) -> Result<(), ScenarioFailure> {
        match self.queue.fetch_one(&self.notes_queue).await? {
            Some(payload) => Err(ScenarioFailure::UnexpectedMessage {
                queue: self.notes_queue.clone(),
                payload: String::from_utf8_lossy(&payload).into_owned(),
            }),
            None => Ok(()),
        }
    }
}
