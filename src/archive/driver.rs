//! Run driver - the archive pass over a whole domain
//!
//! This module contains the main loop, which:
//! - Enumerates candidate URLs with a single index query
//! - Normalizes, de-duplicates and filters them against the target domain
//! - Drops URLs the checkpoint already marks Done
//! - Feeds the rest to the page processor one at a time, pacing requests

use crate::archive::fetcher::{build_http_client, Fetcher};
use crate::archive::index::{CaptureRecord, CdxIndex};
use crate::archive::processor::{PageOutcome, PageProcessor};
use crate::checkpoint::{open_store, CheckpointStore};
use crate::config::Config;
use crate::url::{is_in_target, normalize_url};
use crate::Result;
use std::collections::HashSet;
use std::time::Instant;
use url::Url;

/// Totals of one archive pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Distinct candidate URLs under the target domain
    pub total: usize,
    /// Already Done before this run
    pub skipped: usize,
    pub done: usize,
    pub failed: usize,
    pub failed_urls: Vec<String>,
}

impl RunSummary {
    /// Returns true if no processed URL ended Failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Drives the archive pass for a configuration
pub struct RunDriver {
    config: Config,
    store: Box<dyn CheckpointStore>,
    fetcher: Fetcher,
    limit: Option<usize>,
}

impl RunDriver {
    /// Creates a driver using the configured checkpoint backend
    ///
    /// # Returns
    ///
    /// * `Ok(RunDriver)` - Checkpoint loaded and HTTP client built
    /// * `Err(SalvageError)` - The checkpoint is unreadable or the client failed
    pub fn new(config: Config) -> Result<Self> {
        let store = open_store(&config.checkpoint)?;
        Self::with_store(config, store)
    }

    /// Creates a driver over an already opened checkpoint store
    pub fn with_store(config: Config, store: Box<dyn CheckpointStore>) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;
        let fetcher = Fetcher::from_config(client, &config.requests);

        Ok(Self {
            config,
            store,
            fetcher,
            limit: None,
        })
    }

    /// Caps the number of URLs processed in this run
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        self.store.as_ref()
    }

    /// Runs the archive pass
    ///
    /// Per-page failures are recorded and counted. The run stops early only
    /// when enumeration fails or a checkpoint write fails.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let target = self.config.archive.target_domain.clone();
        tracing::info!("Enumerating archived URLs for {}", target);

        let index = CdxIndex::new(
            self.fetcher.clone(),
            self.config.archive.cdx_api_url.clone(),
            self.config.requests.api_timeout(),
        );
        let captures = index.enumerate_domain(&target).await?;
        let candidates = candidate_urls(&captures, &target);

        let mut summary = RunSummary {
            total: candidates.len(),
            ..RunSummary::default()
        };

        let pending: Vec<Url> = candidates
            .into_iter()
            .filter(|url| !self.store.is_done(url.as_str()))
            .collect();
        summary.skipped = summary.total - pending.len();

        let queue: Vec<Url> = match self.limit {
            Some(limit) => pending.into_iter().take(limit).collect(),
            None => pending,
        };

        tracing::info!(
            "{} candidate URLs, {} already done, {} to process",
            summary.total,
            summary.skipped,
            queue.len()
        );

        let processor = PageProcessor::from_config(&self.config, self.fetcher.clone());
        let delay = self.config.requests.delay();
        let start_time = Instant::now();

        for (position, url) in queue.iter().enumerate() {
            if position > 0 {
                tokio::time::sleep(delay).await;
            }

            tracing::info!("[{}/{}] {}", position + 1, queue.len(), url);

            match processor.process(url, self.store.as_mut()).await {
                Ok(PageOutcome::Skipped) => summary.skipped += 1,
                Ok(PageOutcome::Done(_)) => summary.done += 1,
                Ok(PageOutcome::Failed { .. }) => {
                    summary.failed += 1;
                    summary.failed_urls.push(url.to_string());
                }
                Err(e) => {
                    tracing::error!("Stopping run at {}: {}", url, e);
                    return Err(e);
                }
            }

            let processed = position + 1;
            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} of {} pages, {:.2} pages/sec",
                    processed,
                    queue.len(),
                    rate
                );
            }
        }

        tracing::info!(
            "Run complete: {} done, {} failed, {} skipped",
            summary.done,
            summary.failed,
            summary.skipped
        );

        Ok(summary)
    }
}

/// Runs a full archive pass with the configured checkpoint backend
pub async fn run_archive(config: Config) -> Result<RunSummary> {
    let mut driver = RunDriver::new(config)?;
    driver.run().await
}

/// Normalized, de-duplicated candidate URLs in index order
///
/// Records that fail normalization or lie outside the target are dropped.
pub fn candidate_urls(captures: &[CaptureRecord], domain_pattern: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for capture in captures {
        let url = match normalize_url(&capture.original) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Dropping candidate {}: {}", capture.original, e);
                continue;
            }
        };

        if !is_in_target(&url, domain_pattern) {
            tracing::debug!("Dropping off-target candidate {}", url);
            continue;
        }

        if seen.insert(url.as_str().to_string()) {
            urls.push(url);
        }
    }

    urls
}
