//! Per-page processing
//!
//! A page moves through the stages of `PageStage`:
//!
//! ```text
//! Pending -> Resolving -> Fetching -> Extracting -> DownloadingAssets -> Persisting -> Done
//!                 \___________\____________\________________\________________\-> Failed
//! ```
//!
//! Entering `Done` or `Failed` writes the checkpoint before `process`
//! returns. Only a checkpoint write failure is returned as an error; every
//! other failure is reported in the outcome.

use crate::archive::assets::AssetDownloader;
use crate::archive::fetcher::Fetcher;
use crate::archive::index::CdxIndex;
use crate::archive::memento::MementoClient;
use crate::archive::resolver::{Resolution, SnapshotResolver};
use crate::archive::snapshot::SnapshotOrigin;
use crate::checkpoint::{CheckpointEntry, CheckpointStore};
use crate::config::{AssetLayout, Config};
use crate::content::{
    convert, extract, find_assets, rewrite_asset_links, title_from_url, AssetRef,
};
use crate::output::{relative_path, Document, DocumentWriter};
use crate::state::PageStage;
use crate::{Result, SalvageError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, error, info};
use url::Url;

/// What was produced for a page
#[derive(Debug, Clone)]
pub struct PageResult {
    pub source_url: String,
    pub title: String,
    /// Extracted HTML after link rewriting; the input to conversion
    pub content_html: String,
    /// Markdown body of the document
    pub content_text: String,
    pub asset_refs: Vec<AssetRef>,
}

/// A page stored successfully
#[derive(Debug, Clone)]
pub struct PageReport {
    pub result: PageResult,
    pub origin: SnapshotOrigin,
    pub document_path: PathBuf,
}

/// Outcome of processing one candidate URL
#[derive(Debug)]
pub enum PageOutcome {
    /// Already Done in the checkpoint; nothing was fetched
    Skipped,
    Done(PageReport),
    /// Recorded as Failed; `stage` is where processing stopped
    Failed { stage: PageStage, error: SalvageError },
}

/// Runs single pages through the pipeline
#[derive(Debug, Clone)]
pub struct PageProcessor {
    resolver: SnapshotResolver,
    downloader: AssetDownloader,
    writer: DocumentWriter,
    selectors: Vec<String>,
    domain_pattern: String,
    download_assets: bool,
    layout: AssetLayout,
    rewrite_links: bool,
    save_original_html: bool,
}

impl PageProcessor {
    /// Builds a processor whose collaborators share one retrying fetcher
    pub fn from_config(config: &Config, fetcher: Fetcher) -> Self {
        let requests = &config.requests;
        let archive = &config.archive;

        let index = CdxIndex::new(
            fetcher.clone(),
            archive.cdx_api_url.clone(),
            requests.api_timeout(),
        );
        let memento = MementoClient::new(
            fetcher.clone(),
            archive.memento_api_url.clone(),
            requests.api_timeout(),
            archive.wayback_base_url.clone(),
        );
        let resolver = SnapshotResolver::new(
            index,
            memento,
            fetcher.clone(),
            archive.wayback_base_url.clone(),
            requests.content_timeout(),
        );
        let downloader =
            AssetDownloader::new(fetcher, requests.content_timeout(), config.assets.clone());

        Self {
            resolver,
            downloader,
            writer: DocumentWriter::new(config.output.output_dir.clone()),
            selectors: config.content.selectors.clone(),
            domain_pattern: archive.target_domain.clone(),
            download_assets: config.assets.any_enabled(),
            layout: config.assets.layout,
            rewrite_links: config.output.rewrite_asset_links,
            save_original_html: config.output.save_original_html,
        }
    }

    /// Processes one normalized candidate URL and records the outcome
    ///
    /// # Returns
    ///
    /// * `Ok(PageOutcome)` - The page was skipped, stored or recorded as failed
    /// * `Err(SalvageError)` - The checkpoint could not be written (fatal)
    pub async fn process(
        &self,
        url: &Url,
        store: &mut dyn CheckpointStore,
    ) -> Result<PageOutcome> {
        let key = url.as_str();

        if store.is_done(key) {
            debug!("Skipping {} (already done)", key);
            return Ok(PageOutcome::Skipped);
        }

        let mut stage = PageStage::Pending;
        match self.run_stages(url, &mut stage).await {
            Ok(report) => {
                store.record(CheckpointEntry::done(key))?;
                stage.advance_to(PageStage::Done)?;
                info!("Stored {} as {}", key, report.document_path.display());
                Ok(PageOutcome::Done(report))
            }
            Err(error) => {
                error!("Failed {} during {}: {}", key, stage, error);
                store.record(CheckpointEntry::failed(
                    key,
                    format!("{}: {}", stage.to_db_string(), error),
                ))?;
                Ok(PageOutcome::Failed { stage, error })
            }
        }
    }

    /// Runs the stages up to and including Persisting
    ///
    /// `stage` is left at the stage that was being worked on when an error
    /// is returned.
    async fn run_stages(&self, url: &Url, stage: &mut PageStage) -> Result<PageReport> {
        *stage = stage.advance_to(PageStage::Resolving)?;
        let Resolution { snapshot, document } = self.resolver.resolve(url.as_str()).await?;
        debug!(
            "Resolved {} to {} ({:?})",
            url, snapshot.capture_url, snapshot.origin
        );

        // Resolution only accepts non-empty HTML captures
        *stage = stage.advance_to(PageStage::Fetching)?;
        let html = document.text();

        *stage = stage.advance_to(PageStage::Extracting)?;
        let extraction = extract(&html, &self.selectors);
        let title = extraction
            .title
            .clone()
            .unwrap_or_else(|| title_from_url(url));
        if let Some(selector) = &extraction.matched_selector {
            debug!("Content of {} taken from '{}'", url, selector);
        }

        *stage = stage.advance_to(PageStage::DownloadingAssets)?;
        let page_base = snapshot.page_base().unwrap_or_else(|| url.clone());
        let page_dir = self.writer.page_dir(url);

        let mut asset_refs = if self.download_assets {
            find_assets(&html, &page_base, &self.domain_pattern)
        } else {
            Vec::new()
        };

        let downloaded = if asset_refs.is_empty() {
            BTreeMap::new()
        } else {
            let dest = self.writer.asset_dir(&page_dir, self.layout);
            self.downloader
                .download_all(&snapshot, &mut asset_refs, &dest)
                .await
        };

        let content_html = if self.rewrite_links && !downloaded.is_empty() {
            let replacements: BTreeMap<String, String> = downloaded
                .iter()
                .map(|(original, path)| (original.clone(), relative_path(&page_dir, path)))
                .collect();
            let (rewritten, count) =
                rewrite_asset_links(&extraction.content_html, &page_base, &replacements);
            debug!("Rewrote {} asset references in {}", count, url);
            rewritten
        } else {
            extraction.content_html
        };
        let content_text = convert(&content_html);

        *stage = stage.advance_to(PageStage::Persisting)?;
        let document_path = self
            .writer
            .write_document(&Document {
                source_url: url,
                title: &title,
                capture_timestamp: snapshot.capture_timestamp,
                capture_url: &snapshot.capture_url,
                markdown: &content_text,
            })
            .map_err(|source| SalvageError::Persistence {
                path: page_dir.display().to_string(),
                source,
            })?;

        if self.save_original_html {
            self.writer
                .write_original(&document_path, &document.body)
                .map_err(|source| SalvageError::Persistence {
                    path: document_path.display().to_string(),
                    source,
                })?;
        }

        Ok(PageReport {
            result: PageResult {
                source_url: url.to_string(),
                title,
                content_html,
                content_text,
                asset_refs,
            },
            origin: snapshot.origin,
            document_path,
        })
    }
}
