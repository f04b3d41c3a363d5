//! Content module for captured HTML
//!
//! Pure functions over a fetched document:
//! - `extract`: pick the main content element and the page title
//! - `find_assets`: list same-domain CSS, images and scripts
//! - `rewrite_asset_links`: point asset references at local copies
//! - `convert`: turn the content into Markdown

mod assets;
mod convert;
mod extract;
mod rewrite;

pub use assets::{find_assets, AssetKind, AssetRef};
pub use convert::convert;
pub use extract::{extract, title_from_url, Extraction, HOMEPAGE_TITLE, UNTITLED};
pub use rewrite::rewrite_asset_links;
