//! Archive module for snapshot discovery and page harvesting
//!
//! This module contains the resolution-and-resume pipeline, including:
//! - HTTP fetching with bounded retries
//! - CDX index queries and Memento fallback discovery
//! - Asset downloading through the archive
//! - Per-page processing and the run driver

mod assets;
mod driver;
mod fetcher;
mod index;
mod memento;
mod processor;
mod resolver;
mod snapshot;

pub use assets::{AssetDownloader, MANIFEST_FILENAME};
pub use driver::{candidate_urls, run_archive, RunDriver, RunSummary};
pub use fetcher::{build_http_client, FetchError, FetchFailure, Fetched, Fetcher};
pub use index::{latest, parse_rows, CaptureRecord, CdxIndex};
pub use memento::{MementoCapture, MementoClient};
pub use processor::{PageOutcome, PageProcessor, PageReport, PageResult};
pub use resolver::{Resolution, SnapshotResolver};
pub use snapshot::{
    format_archive_timestamp, parse_archive_timestamp, raw_capture_url, replay_prefix, Snapshot,
    SnapshotOrigin, ARCHIVE_TIMESTAMP_FORMAT,
};
