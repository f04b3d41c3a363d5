//! Asset discovery
//!
//! Finds the stylesheets, images and scripts a page references on its own
//! domain. Third-party assets are left alone.

use crate::config::AssetConfig;
use crate::url::is_in_target;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::PathBuf;
use url::Url;

/// Elements that reference downloadable assets, in one selector group so
/// matches come back in document order
const ASSET_SELECTOR: &str = "script[src], link[rel~=stylesheet][href], img[src]";

/// Class of a referenced asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Css,
    Image,
    Script,
}

impl AssetKind {
    /// Subdirectory of the asset directory holding this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Image => "img",
            Self::Script => "js",
        }
    }

    /// Returns true if the configuration asks for this kind
    pub fn is_enabled(&self, config: &AssetConfig) -> bool {
        match self {
            Self::Css => config.download_css,
            Self::Image => config.download_images,
            Self::Script => config.download_scripts,
        }
    }
}

/// An asset referenced by a page
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    /// Absolute live-web URL of the asset
    pub original_url: String,
    pub kind: AssetKind,
    /// Set only after a successful download
    pub local_path: Option<PathBuf>,
}

/// Lists same-domain assets referenced anywhere in the document
///
/// References are resolved against `page_base`; `data:` URIs and assets on
/// other domains are skipped. Each URL appears once, at its first position.
pub fn find_assets(html: &str, page_base: &Url, domain_pattern: &str) -> Vec<AssetRef> {
    let Ok(selector) = Selector::parse(ASSET_SELECTOR) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for element in document.select(&selector) {
        let (kind, attr) = match element.value().name() {
            "script" => (AssetKind::Script, "src"),
            "link" => (AssetKind::Css, "href"),
            "img" => (AssetKind::Image, "src"),
            _ => continue,
        };

        let Some(raw) = element.value().attr(attr) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("data:") {
            continue;
        }

        let Ok(absolute) = page_base.join(raw) else {
            continue;
        };
        if absolute.scheme() != "http" && absolute.scheme() != "https" {
            continue;
        }
        if !is_in_target(&absolute, domain_pattern) {
            continue;
        }

        let original_url = absolute.to_string();
        if seen.insert(original_url.clone()) {
            assets.push(AssetRef {
                original_url,
                kind,
                local_path: None,
            });
        }
    }

    assets
}
