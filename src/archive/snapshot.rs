//! Archived capture addressing
//!
//! A capture URL embeds the original live-web URL after a replay prefix, e.g.
//! `https://web.archive.org/web/20200101000000id_/http://example.org/about`.
//! Assets are fetched through the same prefix so they come from the archive,
//! not the live site.

use chrono::NaiveDateTime;
use url::Url;

/// Format of 14-digit archive timestamps (YYYYMMDDhhmmss)
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Which discovery path produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// The CDX index and the Wayback replay service
    Primary,
    /// The Memento TimeTravel discovery service
    Fallback,
}

/// A usable archived capture of a source URL
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Normalized live-web URL
    pub source_url: String,
    pub capture_timestamp: NaiveDateTime,
    /// Fully-qualified archived-content address
    pub capture_url: String,
    pub origin: SnapshotOrigin,
}

impl Snapshot {
    /// Part of the capture URL before the embedded original URL
    ///
    /// Returns None when the capture URL does not embed an absolute
    /// `http://` or `https://` URL.
    pub fn replay_prefix(&self) -> Option<&str> {
        replay_prefix(&self.capture_url)
    }

    /// URL that relative references in the capture resolve against
    ///
    /// This is the original URL embedded in the capture URL, which keeps the
    /// trailing slash that normalization strips from the source URL.
    pub fn page_base(&self) -> Option<Url> {
        self.replay_prefix()
            .and_then(|prefix| Url::parse(&self.capture_url[prefix.len()..]).ok())
            .or_else(|| Url::parse(&self.source_url).ok())
    }

    /// Archive address of an asset referenced by this capture
    ///
    /// The asset URL is resolved against the page and placed under the
    /// capture's replay prefix.
    pub fn archived_asset_url(&self, asset_url: &str) -> Option<String> {
        let prefix = self.replay_prefix()?;
        let absolute = self.page_base()?.join(asset_url).ok()?;
        Some(format!("{}{}", prefix, absolute))
    }
}

/// Returns the replay prefix of a capture URL, up to and including the "/"
/// that precedes the embedded original URL
pub fn replay_prefix(capture_url: &str) -> Option<&str> {
    // Skip the capture URL's own scheme
    let search_from = capture_url.find("://").map(|i| i + 3)?;
    let rest = &capture_url[search_from..];

    let embedded = ["http://", "https://"]
        .iter()
        .filter_map(|scheme| rest.find(scheme))
        .min()?;

    let end = search_from + embedded;
    let prefix = &capture_url[..end];
    if prefix.ends_with('/') {
        Some(prefix)
    } else {
        None
    }
}

/// Parses a 14-digit archive timestamp
pub fn parse_archive_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 14 || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, ARCHIVE_TIMESTAMP_FORMAT).ok()
}

/// Formats a timestamp as 14 archive digits
pub fn format_archive_timestamp(value: &NaiveDateTime) -> String {
    value.format(ARCHIVE_TIMESTAMP_FORMAT).to_string()
}

/// Builds the raw-content replay URL for a capture
///
/// The `id_` flag asks the replay service for the original bytes without
/// its toolbar or rewritten links.
pub fn raw_capture_url(wayback_base: &str, timestamp: &str, original: &str) -> String {
    format!("{}{}id_/{}", wayback_base, timestamp, original)
}
