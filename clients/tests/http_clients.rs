//! Client behavior against a mock HTTP server.

#![allow(clippy::unwrap_used)]

use notes_harness_clients::{AuthServiceClient, ClientError, WebServerClient};
use notes_harness_core::config::ServiceConfig;
use notes_harness_core::models::{Note, RequestId};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ServiceConfig {
    ServiceConfig::new(server.uri())
        .with_timeout_secs(5)
        .with_retries(0, 10)
}

#[tokio::test]
async fn health_and_metrics_use_expected_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("requests_total 1\n"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let web = WebServerClient::new(&config).unwrap();
    let auth = AuthServiceClient::new(&config).unwrap();

    assert_eq!(web.get_health().await.unwrap().status(), StatusCode::OK);
    assert_eq!(auth.get_health().await.unwrap().status(), StatusCode::OK);
    assert_eq!(web.get_metrics().await.unwrap().text(), "requests_total 1\n");
}

#[tokio::test]
async fn unversioned_config_uses_bare_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.api_version = String::new();
    let web = WebServerClient::new(&config).unwrap();
    assert_eq!(web.get_health().await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn create_note_posts_body_verbatim() {
    let server = MockServer::start().await;
    let space_id = Uuid::new_v4();
    let request_id = Uuid::new_v4();
    let note = Note::text(123_456_789, "Test Note1", space_id);

    Mock::given(method("POST"))
        .and(path("/api/v0/spaces/notes/create"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "user_id": 123_456_789,
            "text": "Test Note1",
            "space_id": space_id,
            "type": "text",
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"request_id": request_id})))
        .expect(1)
        .mount(&server)
        .await;

    let web = WebServerClient::new(&config_for(&server)).unwrap();
    let response = web.submit_note(&note).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.json::<RequestId>().unwrap().request_id, request_id);
}

#[tokio::test]
async fn missing_body_is_sent_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/spaces/notes/create"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "unexpected end of JSON input"})),
        )
        .mount(&server)
        .await;

    let web = WebServerClient::new(&config_for(&server)).unwrap();
    let response = web.create_note(None).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message().unwrap(), "unexpected end of JSON input");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn filter_notes_sends_bearer_only_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/auth/notes/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"notes": {}})))
        .mount(&server)
        .await;

    let auth = AuthServiceClient::new(&config_for(&server)).unwrap();
    let body = json!({"note_ids": [1, 2, 3], "space_id": 1});

    auth.filter_notes(Some("abc.def.ghi"), Some(&body)).await.unwrap();
    auth.filter_notes(None, Some(&body)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer abc.def.ghi"
    );
    assert!(requests[1].headers.get("authorization").is_none());
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&requests[1].body).unwrap(),
        body
    );
}

#[tokio::test]
async fn api_key_is_a_default_credential_that_tokens_override() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"notes": {}})))
        .mount(&server)
        .await;

    let config = config_for(&server).with_api_key("service-key");
    let auth = AuthServiceClient::new(&config).unwrap();

    auth.filter_notes(None, None).await.unwrap();
    auth.filter_notes(Some("case-token"), None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer service-key"
    );
    assert_eq!(
        requests[1].headers.get("authorization").unwrap(),
        "Bearer case-token"
    );
}

#[tokio::test]
async fn error_statuses_are_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "user is not member"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_retries(3, 10);
    let auth = AuthServiceClient::new(&config).unwrap();
    let response = auth.filter_notes(Some("t"), None).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.error_message().unwrap(), "user is not member");
}

#[tokio::test]
async fn retryable_status_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up 1"))
        .mount(&server)
        .await;

    let config = config_for(&server).with_retries(3, 10);
    let web = WebServerClient::new(&config).unwrap();
    let response = web.get_metrics().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn exhausted_retries_return_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let config = config_for(&server).with_retries(2, 10);
    let web = WebServerClient::new(&config).unwrap();
    let response = web.get_metrics().await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text(), "bad gateway");
}

#[tokio::test]
async fn create_note_is_not_resent_on_retryable_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/spaces/notes/create"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_retries(3, 10);
    let web = WebServerClient::new(&config).unwrap();
    let body = json!({"text": "hello"});
    let response = web.create_note(Some(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = config_for(&server).with_timeout_secs(1);
    let web = WebServerClient::new(&config).unwrap();
    let err = web.get_health().await.unwrap_err();

    match err {
        ClientError::Timeout { timeout, url } => {
            assert_eq!(timeout, Duration::from_secs(1));
            assert!(url.ends_with("/api/v0/health"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_fails_after_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ServiceConfig::new(format!("http://127.0.0.1:{port}"))
        .with_timeout_secs(2)
        .with_retries(1, 10);
    let web = WebServerClient::new(&config).unwrap();

    assert!(matches!(
        web.get_health().await,
        Err(ClientError::RequestFailed { .. })
    ));
}

#[tokio::test]
async fn identical_configs_behave_identically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = config_for(&server).with_api_key("k");
    let first = WebServerClient::new(&config).unwrap();
    let second = WebServerClient::new(&config).unwrap();
    assert_eq!(first.executor().config(), second.executor().config());
    assert_eq!(first.executor().timeout(), second.executor().timeout());

    first.get_health().await.unwrap();
    second.get_health().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    for name in ["content-type", "accept", "authorization"] {
        assert_eq!(requests[0].headers.get(name), requests[1].headers.get(name));
    }
    assert_eq!(requests[0].url.path(), requests[1].url.path());
}

#[tokio::test]
async fn wait_until_healthy_polls_until_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/health"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v0/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let auth = AuthServiceClient::new(&config_for(&server)).unwrap();
    auth.wait_until_healthy(5, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn wait_until_healthy_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let web = WebServerClient::new(&config_for(&server)).unwrap();
    let err = web
        .wait_until_healthy(3, Duration::from_millis(5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::ServiceUnavailable { attempts: 3, .. }
    ));
}
