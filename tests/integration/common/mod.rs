//! Shared fixtures: a configuration pointed at a mock archive, and helpers
//! that mount CDX, replay and Memento responses on it.

use std::path::Path;
use wayback_salvage::archive::{build_http_client, Fetcher};
use wayback_salvage::config::{parse_config, Config};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CAPTURE_TS: &str = "20200101000000";

/// Builds a validated configuration whose archive services all live on
/// `server`. `extra` is appended verbatim (e.g. an `[assets]` table).
pub fn test_config(server: &MockServer, work_dir: &Path, extra: &str) -> Config {
    let uri = server.uri();
    let work = work_dir.display();

    let toml = format!(
        r#"
[archive]
target-domain = "example.org"
cdx-api-url = "{uri}/cdx"
wayback-base-url = "{uri}/web/"
memento-api-url = "{uri}/timetravel/"

[requests]
delay-ms = 10
max-retries = 2
api-timeout-ms = 2000
content-timeout-ms = 2000

[user-agent]
crawler-name = "TestSalvage"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "test@example.com"

[output]
output-dir = '{work}/output'

[checkpoint]
path = '{work}/progress.json'

{extra}
"#
    );

    parse_config(&toml).expect("test configuration should be valid")
}

/// Asset settings with only stylesheets enabled
pub const CSS_ONLY: &str = r#"
[assets]
download-css = true
"#;

pub fn fetcher_for(config: &Config) -> Fetcher {
    let client = build_http_client(&config.user_agent).expect("client");
    Fetcher::from_config(client, &config.requests)
}

/// Path the replay service serves a raw capture under
pub fn capture_path(timestamp: &str, original: &str) -> String {
    format!("/web/{}id_/{}", timestamp, original)
}

pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

pub fn html_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

fn cdx_body(originals: &[&str], timestamp: &str) -> serde_json::Value {
    let mut rows = vec![serde_json::json!(["original", "timestamp", "mimetype"])];
    for original in originals {
        rows.push(serde_json::json!([original, timestamp, "text/html"]));
    }
    serde_json::Value::Array(rows)
}

/// Mounts the domain enumeration response
pub async fn mount_listing(server: &MockServer, originals: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .and(query_param("url", "example.org/*"))
        .and(query_param("collapse", "urlkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cdx_body(originals, CAPTURE_TS)))
        .mount(server)
        .await;
}

/// Builds the per-URL capture list mock, for callers that want expectations
pub fn captures_mock(source_url: &str, original: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .and(query_param("url", source_url))
        .respond_with(ResponseTemplate::new(200).set_body_json(cdx_body(&[original], CAPTURE_TS)))
}

/// Mounts a per-URL capture list and the raw capture it points to
pub async fn mount_page(server: &MockServer, source_url: &str, html: &str) {
    captures_mock(source_url, source_url).mount(server).await;

    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, source_url)))
        .respond_with(html_response(html))
        .mount(server)
        .await;
}
