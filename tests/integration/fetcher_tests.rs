//! Retry behaviour of the fetcher against stubbed endpoints

use std::time::Duration;
use wayback_salvage::archive::{build_http_client, FetchFailure, Fetcher};
use wayback_salvage::config::UserAgentConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_attempts: u32) -> Fetcher {
    let client = build_http_client(&UserAgentConfig {
        crawler_name: "TestSalvage".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "test@example.com".to_string(),
    })
    .expect("client");

    Fetcher::new(client, max_attempts, Duration::from_millis(10))
}

#[tokio::test]
async fn test_always_timeout_makes_exactly_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch(&format!("{}/slow", server.uri()), Duration::from_millis(50))
        .await;

    let error = result.expect_err("every attempt should time out");
    assert_eq!(error.attempts, 3);
    assert_eq!(error.reason, FetchFailure::Timeout);

    server.verify().await;
}

#[tokio::test]
async fn test_success_on_attempt_k_makes_k_calls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let fetched = fetcher(5)
        .fetch(&format!("{}/flaky", server.uri()), Duration::from_secs(2))
        .await
        .expect("third attempt should succeed");

    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body, b"ok");

    server.verify().await;
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let error = fetcher(4)
        .fetch(&format!("{}/missing", server.uri()), Duration::from_secs(2))
        .await
        .expect_err("404 is a definitive failure");

    assert_eq!(error.attempts, 1);
    assert!(error.is_not_found());

    server.verify().await;
}

#[tokio::test]
async fn test_rate_limited_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let error = fetcher(2)
        .fetch(&format!("{}/busy", server.uri()), Duration::from_secs(2))
        .await
        .expect_err("every attempt is rate limited");

    assert_eq!(error.attempts, 2);
    assert_eq!(error.reason, FetchFailure::Status(429));

    server.verify().await;
}

#[tokio::test]
async fn test_malformed_url_fails_without_a_request() {
    let error = fetcher(3)
        .fetch("not a url", Duration::from_secs(1))
        .await
        .expect_err("malformed URL");

    assert_eq!(error.attempts, 0);
    assert!(matches!(error.reason, FetchFailure::InvalidUrl(_)));
}
