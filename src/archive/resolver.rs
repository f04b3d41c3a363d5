//! Snapshot resolution
//!
//! # Resolution Flow
//!
//! 1. Ask the CDX index for every capture of the URL
//! 2. Take the latest one and fetch its raw replay form
//! 3. If the index is empty or unreachable, or that single fetch fails or
//!    yields an empty or non-HTML body, ask
//!    the Memento service once for the capture nearest to the primary
//!    candidate's timestamp (or to now) and fetch it
//! 4. Both paths failing is `NoSnapshotAvailable`; the fallback capture must
//!    pass the same body check
//!
//! Older primary captures are never tried; the fallback is the only second
//! chance.

use crate::archive::fetcher::{Fetched, Fetcher};
use crate::archive::index::CdxIndex;
use crate::archive::memento::MementoClient;
use crate::archive::snapshot::{raw_capture_url, Snapshot, SnapshotOrigin};
use crate::{Result, SalvageError};
use chrono::{NaiveDateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

/// A resolved snapshot together with the fetched capture
#[derive(Debug, Clone)]
pub struct Resolution {
    pub snapshot: Snapshot,
    pub document: Fetched,
}

/// Finds and fetches a usable capture for a source URL
#[derive(Debug, Clone)]
pub struct SnapshotResolver {
    index: CdxIndex,
    memento: MementoClient,
    fetcher: Fetcher,
    wayback_base: String,
    content_timeout: Duration,
}

impl SnapshotResolver {
    pub fn new(
        index: CdxIndex,
        memento: MementoClient,
        fetcher: Fetcher,
        wayback_base: impl Into<String>,
        content_timeout: Duration,
    ) -> Self {
        Self {
            index,
            memento,
            fetcher,
            wayback_base: wayback_base.into(),
            content_timeout,
        }
    }

    /// Resolves `source_url` to a fetched capture
    pub async fn resolve(&self, source_url: &str) -> Result<Resolution> {
        let mut primary_timestamp: Option<NaiveDateTime> = None;

        let primary_reason = match self.index.latest_capture(source_url).await {
            Ok(Some(capture)) => {
                primary_timestamp = Some(capture.captured_at);
                let capture_url =
                    raw_capture_url(&self.wayback_base, &capture.timestamp, &capture.original);

                info!("Fetching capture {} for {}", capture_url, source_url);
                match self.fetch_usable(&capture_url).await {
                    Ok(document) => {
                        return Ok(Resolution {
                            snapshot: Snapshot {
                                source_url: source_url.to_string(),
                                capture_timestamp: capture.captured_at,
                                capture_url,
                                origin: SnapshotOrigin::Primary,
                            },
                            document,
                        });
                    }
                    Err(e) => {
                        warn!("Primary capture failed for {}: {}", source_url, e);
                        e.to_string()
                    }
                }
            }
            Ok(None) => {
                info!("Index lists no captures of {}", source_url);
                "index lists no captures".to_string()
            }
            Err(e) => {
                warn!("Index query failed for {}: {}", source_url, e);
                e.to_string()
            }
        };

        let target = primary_timestamp.unwrap_or_else(|| Utc::now().naive_utc());
        info!("Trying fallback discovery for {}", source_url);

        let fallback_reason = match self.memento.nearest(source_url, target).await {
            Ok(Some(capture)) => match self.fetch_usable(&capture.uri).await {
                Ok(document) => {
                    return Ok(Resolution {
                        snapshot: Snapshot {
                            source_url: source_url.to_string(),
                            capture_timestamp: capture.captured_at,
                            capture_url: capture.uri,
                            origin: SnapshotOrigin::Fallback,
                        },
                        document,
                    });
                }
                Err(e) => {
                    warn!("Fallback capture failed for {}: {}", source_url, e);
                    e.to_string()
                }
            },
            Ok(None) => "no usable capture".to_string(),
            Err(e) => {
                warn!("Fallback discovery failed for {}: {}", source_url, e);
                e.to_string()
            }
        };

        Err(SalvageError::NoSnapshotAvailable {
            url: source_url.to_string(),
            primary: primary_reason,
            fallback: fallback_reason,
        })
    }

    /// Fetches a capture and rejects empty or non-HTML bodies
    async fn fetch_usable(&self, capture_url: &str) -> Result<Fetched> {
        let document = self.fetcher.fetch(capture_url, self.content_timeout).await?;

        if document.body.is_empty() || !document.is_html() {
            return Err(SalvageError::NotHtml {
                url: capture_url.to_string(),
            });
        }

        Ok(document)
    }
}
