//! Full archive passes: processing, checkpointing and resumption

use crate::common::{
    capture_path, captures_mock, fetcher_for, html_page, html_response, mount_listing, mount_page,
    test_config, CAPTURE_TS, CSS_ONLY,
};
use std::fs;
use tempfile::TempDir;
use wayback_salvage::archive::{PageOutcome, PageProcessor};
use wayback_salvage::checkpoint::{
    open_store, CheckpointEntry, CheckpointError, CheckpointResult, CheckpointStatus,
    CheckpointStore, JsonCheckpoint,
};
use wayback_salvage::config::CheckpointBackend;
use wayback_salvage::{normalize_url, PageStage, RunDriver, SalvageError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A store whose writes always fail
struct BrokenStore;

impl CheckpointStore for BrokenStore {
    fn get(&self, _source_url: &str) -> Option<&CheckpointEntry> {
        None
    }

    fn record(&mut self, entry: CheckpointEntry) -> CheckpointResult<()> {
        Err(CheckpointError::Io {
            path: entry.source_url,
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn entries(&self) -> Vec<&CheckpointEntry> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn test_done_url_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    store
        .record(CheckpointEntry::done("https://example.org/about"))
        .unwrap();

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let url = normalize_url("https://example.org/about").unwrap();

    let outcome = processor.process(&url, &mut store).await.unwrap();

    assert!(matches!(outcome, PageOutcome::Skipped));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_driver_skips_done_urls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    mount_listing(
        &server,
        &["https://example.org/about", "https://example.org/contact"],
    )
    .await;
    captures_mock("https://example.org/about", "https://example.org/about")
        .expect(0)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "https://example.org/contact",
        &html_page("Contact", "<main><p>Write to us</p></main>"),
    )
    .await;

    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    store
        .record(CheckpointEntry::done("https://example.org/about"))
        .unwrap();

    let mut driver = RunDriver::with_store(config, Box::new(store)).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.done, 1);
    assert!(summary.is_clean());

    server.verify().await;
}

#[tokio::test]
async fn test_restart_resumes_at_next_url() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, dir.path(), "");
    config.checkpoint.backend = CheckpointBackend::Sqlite;
    config.checkpoint.path = dir.path().join("progress.db");

    mount_listing(&server, &["https://example.org/one", "https://example.org/two"]).await;

    captures_mock("https://example.org/one", "https://example.org/one")
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, "https://example.org/one")))
        .respond_with(html_response(html_page("One", "<main><p>First</p></main>")))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "https://example.org/two",
        &html_page("Two", "<main><p>Second</p></main>"),
    )
    .await;

    // First run is cut short after one page
    let mut first = RunDriver::new(config.clone()).unwrap().with_limit(Some(1));
    let summary = first.run().await.unwrap();
    assert_eq!(summary.done, 1);
    drop(first);

    let mut second = RunDriver::new(config.clone()).unwrap();
    let summary = second.run().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.done, 1);
    assert_eq!(second.store().len(), 2);
    assert!(second.store().is_done("https://example.org/two"));

    server.verify().await;
}

#[tokio::test]
async fn test_failed_page_is_recorded_and_run_continues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    // /gone has no capture list and no Memento answer: both paths 404
    mount_listing(
        &server,
        &["https://example.org/gone", "https://example.org/about"],
    )
    .await;
    mount_page(
        &server,
        "https://example.org/about",
        &html_page("About", "<main><p>Still here</p></main>"),
    )
    .await;

    let mut driver = RunDriver::new(config.clone()).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.done, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_urls, vec!["https://example.org/gone".to_string()]);
    assert!(!summary.is_clean());

    let gone = driver.store().get("https://example.org/gone").unwrap();
    assert_eq!(gone.status, CheckpointStatus::Failed);
    assert!(gone.detail.as_deref().unwrap().starts_with("resolving"));

    // Failed URLs are retried by a later run
    drop(driver);
    let store = open_store(&config.checkpoint).unwrap();
    assert!(!store.is_done("https://example.org/gone"));
}

#[tokio::test]
async fn test_non_html_capture_without_fallback_fails_at_resolving() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    let source = "https://example.org/report";
    captures_mock(source, source).mount(&server).await;
    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, source)))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    let url = normalize_url(source).unwrap();

    // No Memento answer is mounted, so the fallback finds nothing
    match processor.process(&url, &mut store).await.unwrap() {
        PageOutcome::Failed { stage, error } => {
            assert_eq!(stage, PageStage::Resolving);
            match error {
                SalvageError::NoSnapshotAvailable { primary, .. } => {
                    assert!(primary.contains("not an HTML document"), "{}", primary);
                }
                other => panic!("expected NoSnapshotAvailable, got {:?}", other),
            }
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(store.count_by_status(CheckpointStatus::Failed), 1);
}

#[tokio::test]
async fn test_checkpoint_write_failure_stops_the_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    mount_listing(
        &server,
        &["https://example.org/first", "https://example.org/second"],
    )
    .await;
    mount_page(
        &server,
        "https://example.org/first",
        &html_page("First", "<main><p>One</p></main>"),
    )
    .await;
    captures_mock("https://example.org/second", "https://example.org/second")
        .expect(0)
        .mount(&server)
        .await;

    let mut driver = RunDriver::with_store(config, Box::new(BrokenStore)).unwrap();
    let error = driver.run().await.expect_err("checkpoint failure is fatal");

    assert!(error.is_fatal());
    server.verify().await;
}

#[tokio::test]
async fn test_unreachable_index_aborts_enumeration() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut driver = RunDriver::new(config).unwrap();
    let error = driver.run().await.expect_err("enumeration failure");

    assert!(matches!(error, SalvageError::Fetch(_)));
    server.verify().await;
}

#[tokio::test]
async fn test_legacy_checkpoint_entries_are_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), "");

    // Older runs stored the index's raw spelling of each URL
    fs::write(&config.checkpoint.path, r#"["http://example.org/about"]"#).unwrap();
    mount_listing(&server, &["http://example.org/about"]).await;

    let mut driver = RunDriver::new(config).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.done, 0);

    // Only the enumeration query reached the archive
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Mounts the about page (recorded under its http:// spelling) and its two
/// stylesheets, each expected to be fetched once
async fn mount_about_page(server: &MockServer) {
    let original = "http://example.org/about";
    mount_listing(server, &[original]).await;
    captures_mock("https://example.org/about", original)
        .mount(server)
        .await;

    let html = html_page(
        "About Us",
        r#"<link rel="stylesheet" href="/css/site.css">
           <main>
             <h1>About</h1>
             <p>We are an example.</p>
             <link rel="stylesheet" href="print.css">
           </main>"#,
    );
    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, original)))
        .respond_with(html_response(html))
        .expect(1)
        .mount(server)
        .await;
    for (asset, body) in [
        ("http://example.org/css/site.css", "body { color: black; }"),
        ("http://example.org/print.css", "@media print {}"),
    ] {
        Mock::given(method("GET"))
            .and(path(capture_path(CAPTURE_TS, asset)))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/css"))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_end_to_end_about_page_with_two_stylesheets() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    mount_about_page(&server).await;

    let output_dir = config.output.output_dir.clone();
    let mut driver = RunDriver::new(config.clone()).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.done, 1);
    assert!(summary.is_clean());

    let document = fs::read_to_string(output_dir.join("About_Us.md")).unwrap();
    assert!(document.starts_with("# About Us\n"));
    assert!(document.contains("_Source URL: https://example.org/about_"));
    assert!(document.contains("_Archived Timestamp: 2020-01-01 00:00:00_"));
    assert!(document.contains("We are an example."));

    assert_eq!(
        fs::read_to_string(output_dir.join("_assets/css/site.css")).unwrap(),
        "body { color: black; }"
    );
    assert_eq!(
        fs::read_to_string(output_dir.join("_assets/css/print.css")).unwrap(),
        "@media print {}"
    );

    let entries = driver.store().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source_url, "https://example.org/about");
    assert_eq!(entries[0].status, CheckpointStatus::Done);

    server.verify().await;
}

#[tokio::test]
async fn test_about_page_content_points_at_local_stylesheet() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    mount_about_page(&server).await;

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    let url = normalize_url("https://example.org/about").unwrap();

    let report = match processor.process(&url, &mut store).await.unwrap() {
        PageOutcome::Done(report) => report,
        other => panic!("expected Done, got {:?}", other),
    };

    let content = &report.result.content_html;
    assert!(content.contains(r#"href="_assets/css/print.css""#), "{}", content);
    assert!(!content.contains(r#"href="print.css""#));
    assert!(config
        .output
        .output_dir
        .join("_assets/css/print.css")
        .is_file());

    server.verify().await;
}

#[tokio::test]
async fn test_asset_links_are_rewritten_to_local_copies() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    let source = "https://example.org/blog/post";
    mount_page(
        &server,
        source,
        &html_page(
            "Post",
            r#"<main><p>Text</p><link rel="stylesheet" href="/css/site.css"></main>"#,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(capture_path(
            CAPTURE_TS,
            "https://example.org/css/site.css",
        )))
        .respond_with(ResponseTemplate::new(200).set_body_raw("p {}", "text/css"))
        .mount(&server)
        .await;

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    let url = normalize_url(source).unwrap();

    let report = match processor.process(&url, &mut store).await.unwrap() {
        PageOutcome::Done(report) => report,
        other => panic!("expected Done, got {:?}", other),
    };

    assert!(report
        .result
        .content_html
        .contains(r#"href="_assets/css/site.css""#));
    assert_eq!(
        report.document_path,
        config.output.output_dir.join("blog").join("Post.md")
    );
    assert!(config
        .output
        .output_dir
        .join("blog/_assets/css/site.css")
        .is_file());
}
