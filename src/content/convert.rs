//! HTML to Markdown conversion

use scraper::Html;
use tracing::warn;

/// Converts an HTML fragment to Markdown
///
/// Falls back to the fragment's plain text if the converter fails.
pub fn convert(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            warn!("Markdown conversion failed, keeping plain text: {}", e);
            plain_text(html)
        }
    }
}

fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
