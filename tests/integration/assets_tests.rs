//! Asset downloading through the archive

use crate::common::{
    capture_path, fetcher_for, html_page, mount_page, test_config, CAPTURE_TS, CSS_ONLY,
};
use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;
use wayback_salvage::archive::{
    AssetDownloader, PageOutcome, PageProcessor, Snapshot, SnapshotOrigin, MANIFEST_FILENAME,
};
use wayback_salvage::checkpoint::{CheckpointStore, JsonCheckpoint};
use wayback_salvage::content::{AssetKind, AssetRef};
use wayback_salvage::normalize_url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SOURCE: &str = "https://example.org/about";

fn stylesheet(name: &str) -> AssetRef {
    AssetRef {
        original_url: format!("https://example.org/css/{}", name),
        kind: AssetKind::Css,
        local_path: None,
    }
}

async fn mount_css(server: &MockServer, name: &str, status: u16, hits: u64) {
    let original = format!("https://example.org/css/{}", name);
    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, &original)))
        .respond_with(
            ResponseTemplate::new(status).set_body_raw(format!("/* {} */", name), "text/css"),
        )
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_asset_is_left_out_of_mapping() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    mount_css(&server, "a.css", 200, 1).await;
    mount_css(&server, "b.css", 404, 1).await;
    mount_css(&server, "c.css", 200, 1).await;

    let snapshot = snapshot_on(&server);

    let downloader = AssetDownloader::new(
        fetcher_for(&config),
        config.requests.content_timeout(),
        config.assets.clone(),
    );
    let dest = dir.path().join("assets");
    let mut assets = vec![
        stylesheet("a.css"),
        stylesheet("b.css"),
        stylesheet("c.css"),
    ];

    let stored = downloader.download_all(&snapshot, &mut assets, &dest).await;

    let keys: Vec<&str> = stored.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "https://example.org/css/a.css",
            "https://example.org/css/c.css"
        ]
    );
    assert_eq!(
        fs::read_to_string(dest.join("css/a.css")).unwrap(),
        "/* a.css */"
    );
    assert!(assets[0].local_path.is_some());
    assert!(assets[1].local_path.is_none());
    assert!(assets[2].local_path.is_some());
    assert!(dest.join(MANIFEST_FILENAME).exists());

    server.verify().await;
}

fn snapshot_on(server: &MockServer) -> Snapshot {
    Snapshot {
        source_url: SOURCE.to_string(),
        capture_timestamp: NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        capture_url: format!("{}{}", server.uri(), capture_path(CAPTURE_TS, SOURCE)),
        origin: SnapshotOrigin::Primary,
    }
}

#[tokio::test]
async fn test_empty_asset_body_is_a_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    Mock::given(method("GET"))
        .and(path(capture_path(CAPTURE_TS, "https://example.org/css/empty.css")))
        .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/css"))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = AssetDownloader::new(
        fetcher_for(&config),
        config.requests.content_timeout(),
        config.assets.clone(),
    );
    let dest = dir.path().join("assets");
    let mut assets = vec![stylesheet("empty.css")];

    let stored = downloader
        .download_all(&snapshot_on(&server), &mut assets, &dest)
        .await;

    assert!(stored.is_empty());
    assert!(assets[0].local_path.is_none());
    assert!(!dest.join("css/empty.css").exists());

    server.verify().await;
}

#[tokio::test]
async fn test_leftover_file_without_manifest_entry_is_reused_by_name() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    // A run stopped after writing the file but before recording it
    let dest = dir.path().join("assets");
    fs::create_dir_all(dest.join("css")).unwrap();
    fs::write(dest.join("css/a.css"), "/* partial */").unwrap();

    mount_css(&server, "a.css", 200, 1).await;

    let downloader = AssetDownloader::new(
        fetcher_for(&config),
        config.requests.content_timeout(),
        config.assets.clone(),
    );
    let mut assets = vec![stylesheet("a.css")];
    let stored = downloader
        .download_all(&snapshot_on(&server), &mut assets, &dest)
        .await;

    assert_eq!(
        stored.get("https://example.org/css/a.css"),
        Some(&dest.join("css/a.css"))
    );
    assert_eq!(
        fs::read_to_string(dest.join("css/a.css")).unwrap(),
        "/* a.css */"
    );
    assert!(!dest.join("css/a-1.css").exists());

    let manifest = fs::read_to_string(dest.join(MANIFEST_FILENAME)).unwrap();
    assert!(manifest.contains(r#""https://example.org/css/a.css": "css/a.css""#));

    server.verify().await;
}

#[tokio::test]
async fn test_page_is_done_despite_asset_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    let html = html_page(
        "About",
        r#"<main><p>Styled page</p></main>
           <link rel="stylesheet" href="/css/a.css">
           <link rel="stylesheet" href="/css/b.css">
           <link rel="stylesheet" href="/css/c.css">"#,
    );
    mount_page(&server, SOURCE, &html).await;
    mount_css(&server, "a.css", 200, 1).await;
    mount_css(&server, "b.css", 404, 1).await;
    mount_css(&server, "c.css", 200, 1).await;

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let mut store = JsonCheckpoint::open(&config.checkpoint.path).unwrap();
    let url = normalize_url(SOURCE).unwrap();

    let outcome = processor.process(&url, &mut store).await.unwrap();

    let report = match outcome {
        PageOutcome::Done(report) => report,
        other => panic!("expected Done, got {:?}", other),
    };
    let stored: Vec<bool> = report
        .result
        .asset_refs
        .iter()
        .map(|a| a.local_path.is_some())
        .collect();
    assert_eq!(stored, vec![true, false, true]);

    let assets = config.output.output_dir.join("_assets").join("css");
    assert!(assets.join("a.css").is_file());
    assert!(!assets.join("b.css").exists());
    assert!(assets.join("c.css").is_file());
    assert!(store.is_done(SOURCE));

    server.verify().await;
}

#[tokio::test]
async fn test_second_run_reuses_downloaded_assets() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), CSS_ONLY);

    let html = html_page(
        "About",
        r#"<main><p>Styled page</p><link rel="stylesheet" href="/css/a.css"></main>"#,
    );
    mount_page(&server, SOURCE, &html).await;
    // Fetched by the first run only
    mount_css(&server, "a.css", 200, 1).await;

    let processor = PageProcessor::from_config(&config, fetcher_for(&config));
    let url = normalize_url(SOURCE).unwrap();

    for run in 0..2 {
        let checkpoint = dir.path().join(format!("run-{}.json", run));
        let mut store = JsonCheckpoint::open(&checkpoint).unwrap();
        let outcome = processor.process(&url, &mut store).await.unwrap();
        assert!(matches!(outcome, PageOutcome::Done(_)));
    }

    let documents: Vec<_> = fs::read_dir(&config.output.output_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().map(|e| e == "md").unwrap_or(false))
        .collect();
    assert_eq!(documents.len(), 1, "re-processing overwrites the document");

    let copies: Vec<_> = fs::read_dir(config.output.output_dir.join("_assets/css"))
        .unwrap()
        .collect();
    assert_eq!(copies.len(), 1, "the asset is stored once");

    server.verify().await;
}
