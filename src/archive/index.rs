//! Wayback CDX index client
//!
//! The CDX server lists captures as JSON rows of `[original, timestamp,
//! mimetype]`, optionally preceded by a header row naming those fields. A 404
//! from the index means "no captures", not an error.

use crate::archive::fetcher::Fetcher;
use crate::archive::snapshot::parse_archive_timestamp;
use crate::{Result, SalvageError};
use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Fields requested from the index, in row order
const CDX_FIELDS: &str = "original,timestamp,mimetype";

/// Only successful HTML captures are worth fetching
const CDX_FILTERS: [&str; 2] = ["statuscode:200", "mimetype:text/html"];

/// One capture listed by the index
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    /// The live-web URL as the archive recorded it
    pub original: String,
    /// 14-digit capture timestamp
    pub timestamp: String,
    pub captured_at: NaiveDateTime,
    pub mimetype: String,
}

/// Client for the CDX index
#[derive(Debug, Clone)]
pub struct CdxIndex {
    fetcher: Fetcher,
    endpoint: String,
    timeout: Duration,
}

impl CdxIndex {
    pub fn new(fetcher: Fetcher, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Lists every distinct URL captured under a domain pattern
    ///
    /// Issues one query with `collapse=urlkey`, so each URL appears once, in
    /// index order. `*.example.org` also matches subdomains.
    pub async fn enumerate_domain(&self, domain_pattern: &str) -> Result<Vec<CaptureRecord>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        match domain_pattern.strip_prefix("*.") {
            Some(base) => {
                params.push(("url", base.to_string()));
                params.push(("matchType", "domain".to_string()));
            }
            None => params.push(("url", format!("{}/*", domain_pattern))),
        }
        params.push(("collapse", "urlkey".to_string()));

        let records = self.query(params).await?;
        debug!(
            "Index lists {} distinct URLs for {}",
            records.len(),
            domain_pattern
        );
        Ok(records)
    }

    /// Lists all successful HTML captures of a single URL
    pub async fn captures_for(&self, source_url: &str) -> Result<Vec<CaptureRecord>> {
        self.query(vec![("url", source_url.to_string())]).await
    }

    /// Returns the most recent capture of a URL, if any
    pub async fn latest_capture(&self, source_url: &str) -> Result<Option<CaptureRecord>> {
        let captures = self.captures_for(source_url).await?;
        Ok(latest(captures))
    }

    async fn query(&self, extra: Vec<(&str, String)>) -> Result<Vec<CaptureRecord>> {
        let mut params: Vec<(&str, String)> = vec![
            ("output", "json".to_string()),
            ("fl", CDX_FIELDS.to_string()),
        ];
        for filter in CDX_FILTERS {
            params.push(("filter", filter.to_string()));
        }
        params.extend(extra);

        let url = Url::parse_with_params(&self.endpoint, &params)?;

        let response = match self.fetcher.fetch(url.as_str(), self.timeout).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        parse_rows(&response.text()).map_err(|message| SalvageError::IndexResponse {
            url: url.to_string(),
            message,
        })
    }
}

/// Picks the capture with the greatest timestamp
pub fn latest(captures: Vec<CaptureRecord>) -> Option<CaptureRecord> {
    captures.into_iter().max_by_key(|c| c.captured_at)
}

/// Parses a CDX JSON body into capture records
///
/// An empty body is an empty result. Rows that are too short or carry an
/// unparseable timestamp are skipped.
pub fn parse_rows(body: &str) -> std::result::Result<Vec<CaptureRecord>, String> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<String>> =
        serde_json::from_str(body).map_err(|e| format!("invalid CDX JSON: {}", e))?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        if i == 0 && row.first().map(|s| s == "original").unwrap_or(false) {
            continue;
        }

        if row.len() < 2 {
            warn!("Skipping short CDX row: {:?}", row);
            continue;
        }

        let mut fields = row.into_iter();
        let original = fields.next().unwrap_or_default();
        let timestamp = fields.next().unwrap_or_default();
        let mimetype = fields.next().unwrap_or_default();

        match parse_archive_timestamp(&timestamp) {
            Some(captured_at) => records.push(CaptureRecord {
                original,
                timestamp,
                captured_at,
                mimetype,
            }),
            None => warn!(
                "Skipping CDX row for {} with invalid timestamp '{}'",
                original, timestamp
            ),
        }
    }

    Ok(records)
}
