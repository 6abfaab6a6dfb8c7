//! Auth service suite against a deployed service.
//!
//! Ignored by default. Configure the service through `config.yaml`,
//! `HARNESS_CONFIG` or `HARNESS_AUTH_SERVICE__*` variables, then run:
//!
//! ```bash
//! cargo test -p notes-harness-suites --test live_auth_service -- --ignored
//! ```

#![allow(clippy::expect_used)]

use notes_harness_core::clock::SystemClock;
use notes_harness_core::config::HarnessConfig;
use notes_harness_suites::{ScenarioRunner, Service, filter_notes_cases};
use notes_harness_testing::{InMemoryQueue, init_tracing};
use std::time::Duration;

fn runner() -> ScenarioRunner<InMemoryQueue, SystemClock> {
    let config = HarnessConfig::load().expect("load harness configuration");
    init_tracing(&config.log_level);
    ScenarioRunner::new(&config, InMemoryQueue::new(), SystemClock).expect("build runner")
}

#[tokio::test]
#[ignore = "requires a running auth service"]
async fn auth_service_is_healthy() {
    let runner = runner();
    runner
        .auth_service()
        .wait_until_healthy(30, Duration::from_secs(1))
        .await
        .expect("auth service did not come up");
    runner
        .check_health(Service::AuthService)
        .await
        .expect("health check");
}

#[tokio::test]
#[ignore = "requires a running auth service"]
async fn auth_service_exposes_metrics() {
    runner()
        .check_metrics(Service::AuthService)
        .await
        .expect("metrics check");
}

#[tokio::test]
#[ignore = "requires a running auth service with fixture data"]
async fn filter_notes_cases_pass() {
    let runner = runner();
    let mut failures = Vec::new();

    for case in filter_notes_cases() {
        if let Err(e) = runner.run_filter_notes(&case).await {
            failures.push(format!("{}: {e}", case.name));
        }
    }

    assert!(failures.is_empty(), "failed cases:\n{}", failures.join("\n"));
}
