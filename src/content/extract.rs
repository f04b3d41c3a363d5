//! Main-content and title extraction

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Title used for the root page when nothing better is available
pub const HOMEPAGE_TITLE: &str = "Homepage";

/// Title used when a URL path yields nothing usable
pub const UNTITLED: &str = "untitled";

/// Extracted main content of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Outer HTML of the selected content element
    pub content_html: String,
    /// Text of `<title>`, else of the first `<h1>`
    pub title: Option<String>,
    /// The selector that matched; None when the whole document was used
    pub matched_selector: Option<String>,
}

/// Selects the main content of an HTML document
///
/// Selectors are tried in the given order and the first one matching an
/// element with content wins. `body` is tried last even if the list omits it;
/// a document without any body falls back to its full serialization.
///
/// # Example
///
/// ```
/// use wayback_salvage::content::extract;
///
/// let html = r#"<html><head><title>About</title></head>
///     <body><nav>menu</nav><main><p>Hello</p></main></body></html>"#;
/// let selectors = vec!["main".to_string(), "body".to_string()];
///
/// let extraction = extract(html, &selectors);
/// assert_eq!(extraction.title.as_deref(), Some("About"));
/// assert_eq!(extraction.content_html, "<main><p>Hello</p></main>");
/// ```
pub fn extract(html: &str, selectors: &[String]) -> Extraction {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    let candidates = selectors
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("body"));

    for raw in candidates {
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Skipping unparseable selector '{}': {:?}", raw, e);
                continue;
            }
        };

        if let Some(element) = document.select(&selector).find(has_content) {
            debug!("Content matched selector '{}'", raw);
            return Extraction {
                content_html: element.html(),
                title,
                matched_selector: Some(raw.to_string()),
            };
        }
    }

    Extraction {
        content_html: document.root_element().html(),
        title,
        matched_selector: None,
    }
}

/// Derives a title from the URL path
///
/// The last path segment with `-`/`_` turned into spaces and the first letter
/// capitalized; `Homepage` for the root.
pub fn title_from_url(url: &Url) -> String {
    let path = url.path().trim_matches('/');
    if path.is_empty() {
        return HOMEPAGE_TITLE.to_string();
    }

    let last = path.rsplit('/').next().unwrap_or(path);
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    let spaced = decoded.replace(['-', '_'], " ");
    let spaced = spaced.trim();

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => UNTITLED.to_string(),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    })
}

fn has_content(element: &ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty())
        || element.children().any(|child| child.value().is_element())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
