//! Asset downloading
//!
//! Assets are fetched from the archive through the capture's replay prefix and
//! stored under `{dest}/{css|img|js}/`. A `manifest.json` in the destination
//! maps each original URL to its stored file, so a second run with the same
//! output directory reuses the files instead of fetching them again. The
//! manifest is rewritten after every stored file.

use crate::archive::fetcher::{FetchError, FetchFailure, Fetcher};
use crate::archive::snapshot::Snapshot;
use crate::config::AssetConfig;
use crate::content::AssetRef;
use crate::output::{asset_file_name, unique_path_with, write_atomic};
use crate::SalvageError;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the per-destination manifest file
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Downloads the assets of a page into a destination directory
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    fetcher: Fetcher,
    timeout: Duration,
    config: AssetConfig,
}

impl AssetDownloader {
    pub fn new(fetcher: Fetcher, timeout: Duration, config: AssetConfig) -> Self {
        Self {
            fetcher,
            timeout,
            config,
        }
    }

    /// Downloads every enabled asset and returns `original_url -> local_path`
    ///
    /// Never fails: an asset that cannot be fetched or written is logged and
    /// left out of the mapping. `local_path` is set on each stored asset.
    pub async fn download_all(
        &self,
        snapshot: &Snapshot,
        assets: &mut [AssetRef],
        dest_dir: &Path,
    ) -> BTreeMap<String, PathBuf> {
        let mut stored = BTreeMap::new();
        let mut manifest = Manifest::load(dest_dir);

        for asset in assets.iter_mut() {
            if !asset.kind.is_enabled(&self.config) {
                continue;
            }

            if let Some(path) = manifest.existing(&asset.original_url) {
                debug!("Reusing {} for {}", path.display(), asset.original_url);
                asset.local_path = Some(path.clone());
                stored.insert(asset.original_url.clone(), path);
                continue;
            }

            let Some(address) = snapshot.archived_asset_url(&asset.original_url) else {
                warn!(
                    "No archive address for asset {} of {}",
                    asset.original_url, snapshot.source_url
                );
                continue;
            };

            let fetched = match self.fetcher.fetch(&address, self.timeout).await {
                Ok(fetched) if fetched.body.is_empty() => {
                    let error = SalvageError::AssetFetch {
                        url: asset.original_url.clone(),
                        source: FetchError {
                            url: address,
                            attempts: 1,
                            reason: FetchFailure::EmptyBody,
                        },
                    };
                    warn!("{} (page {})", error, snapshot.source_url);
                    continue;
                }
                Ok(fetched) => fetched,
                Err(source) => {
                    let error = SalvageError::AssetFetch {
                        url: asset.original_url.clone(),
                        source,
                    };
                    warn!("{} (page {})", error, snapshot.source_url);
                    continue;
                }
            };

            let kind_dir = dest_dir.join(asset.kind.dir_name());
            match store_file(&kind_dir, &asset.original_url, &fetched.body, &manifest) {
                Ok(path) => {
                    debug!("Stored {} as {}", asset.original_url, path.display());
                    manifest.insert(&asset.original_url, &path);
                    if let Err(e) = manifest.save() {
                        warn!(
                            "Failed to write asset manifest in {}: {}",
                            dest_dir.display(),
                            e
                        );
                    }
                    asset.local_path = Some(path.clone());
                    stored.insert(asset.original_url.clone(), path);
                }
                Err(e) => {
                    warn!(
                        "Failed to store asset {} under {}: {}",
                        asset.original_url,
                        kind_dir.display(),
                        e
                    );
                }
            }
        }

        if !stored.is_empty() {
            info!(
                "{} of {} assets available for {}",
                stored.len(),
                assets.len(),
                snapshot.source_url
            );
        }

        stored
    }
}

/// Writes an asset body, reusing a same-named file no manifest entry claims
///
/// An unclaimed file is left over from a run that stopped between writing
/// the asset and recording it, so it is overwritten rather than suffixed.
fn store_file(
    kind_dir: &Path,
    original_url: &str,
    body: &[u8],
    manifest: &Manifest,
) -> io::Result<PathBuf> {
    fs::create_dir_all(kind_dir)?;
    let path = unique_path_with(kind_dir, &asset_file_name(original_url), |candidate| {
        !manifest.claims(candidate)
    })?;
    write_atomic(&path, body)?;
    Ok(path)
}

/// Stored files of one destination, keyed by original URL
///
/// Paths are kept relative to the destination directory.
#[derive(Debug)]
struct Manifest {
    dir: PathBuf,
    files: BTreeMap<String, String>,
}

impl Manifest {
    fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILENAME);
        let files = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(
                    "Ignoring unreadable asset manifest {}: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self {
            dir: dir.to_path_buf(),
            files,
        }
    }

    /// Path of a previously stored asset, if its file is still there
    fn existing(&self, original_url: &str) -> Option<PathBuf> {
        let relative = self.files.get(original_url)?;
        let path = self.dir.join(relative);
        path.is_file().then_some(path)
    }

    /// Returns true if some entry already points at `path`
    fn claims(&self, path: &Path) -> bool {
        let relative = self.relative(path);
        self.files.values().any(|stored| *stored == relative)
    }

    fn insert(&mut self, original_url: &str, path: &Path) {
        let relative = self.relative(path);
        self.files.insert(original_url.to_string(), relative);
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Rewrites the manifest atomically
    fn save(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(&self.files)?;
        write_atomic(&self.dir.join(MANIFEST_FILENAME), &json)
    }
}
