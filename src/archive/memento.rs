//! Memento TimeTravel discovery client
//!
//! The fallback path asks an aggregator for the capture closest to a given
//! moment, across all archives it knows about.

use crate::archive::fetcher::Fetcher;
use crate::archive::snapshot::{format_archive_timestamp, parse_archive_timestamp};
use crate::Result;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct TimeTravelResponse {
    mementos: Option<Mementos>,
}

#[derive(Debug, Deserialize)]
struct Mementos {
    closest: Option<ClosestMemento>,
}

#[derive(Debug, Deserialize)]
struct ClosestMemento {
    #[serde(default)]
    uri: Vec<String>,
    datetime: Option<String>,
}

/// The capture an aggregator reported as nearest
#[derive(Debug, Clone, PartialEq)]
pub struct MementoCapture {
    pub uri: String,
    pub captured_at: NaiveDateTime,
}

/// Client for the TimeTravel JSON API
#[derive(Debug, Clone)]
pub struct MementoClient {
    fetcher: Fetcher,
    endpoint: String,
    timeout: Duration,
    /// Captures under this base are rejected to avoid re-entering the primary path
    excluded_base: String,
}

impl MementoClient {
    pub fn new(
        fetcher: Fetcher,
        endpoint: impl Into<String>,
        timeout: Duration,
        excluded_base: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            timeout,
            excluded_base: excluded_base.into(),
        }
    }

    /// Finds the capture of `source_url` closest to `target`
    ///
    /// Returns `Ok(None)` when the service knows no capture (404), the
    /// response has no usable URI, or the URI points back into the primary
    /// archive.
    pub async fn nearest(
        &self,
        source_url: &str,
        target: NaiveDateTime,
    ) -> Result<Option<MementoCapture>> {
        let query = format!(
            "{}{}/{}",
            self.endpoint,
            format_archive_timestamp(&target),
            source_url
        );

        let response = match self.fetcher.fetch(&query, self.timeout).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                info!("Memento service has no capture of {}", source_url);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let parsed: TimeTravelResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unreadable Memento response for {}: {}", source_url, e);
                return Ok(None);
            }
        };

        let Some(closest) = parsed.mementos.and_then(|m| m.closest) else {
            warn!("Memento response for {} has no closest capture", source_url);
            return Ok(None);
        };

        let Some(uri) = closest.uri.into_iter().next() else {
            warn!("Memento response for {} has an empty URI list", source_url);
            return Ok(None);
        };

        if points_into(&uri, &self.excluded_base) {
            warn!(
                "Memento service pointed back into the primary archive ({}); skipping",
                uri
            );
            return Ok(None);
        }

        let captured_at = closest
            .datetime
            .as_deref()
            .and_then(parse_memento_datetime)
            .unwrap_or(target);

        info!("Found Memento capture {} for {}", uri, source_url);
        Ok(Some(MementoCapture { uri, captured_at }))
    }
}

/// Returns true if `uri` is on the host of `base` and under its path
///
/// Scheme and port are ignored: aggregators often report `http://` forms of
/// an `https://` archive.
fn points_into(uri: &str, base: &str) -> bool {
    let (Ok(uri), Ok(base)) = (Url::parse(uri), Url::parse(base)) else {
        return false;
    };

    match (uri.host_str(), base.host_str()) {
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => uri.path().starts_with(base.path()),
        _ => false,
    }
}

/// Parses the `datetime` field, which aggregators emit as RFC 3339, RFC 1123
/// or bare archive digits
fn parse_memento_datetime(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| parse_archive_timestamp(value))
}
