//! Asset link rewriting
//!
//! scraper documents are read-only, so rewriting works on the serialized
//! content: each asset attribute is located by its escaped serialized form
//! inside `<script>`, `<link>` and `<img>` start tags and replaced with the
//! local path. Anchors and other elements carrying the same URL are left
//! alone.

use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;

const REWRITE_SELECTOR: &str = "script[src], link[href], img[src]";

/// Points asset references in `content_html` at local copies
///
/// `replacements` maps absolute asset URLs to the path written in their
/// place (relative to the document). References are resolved against
/// `page_base` before lookup; unmapped references keep their original URL.
///
/// Returns the rewritten HTML and the number of attributes changed.
pub fn rewrite_asset_links(
    content_html: &str,
    page_base: &Url,
    replacements: &BTreeMap<String, String>,
) -> (String, usize) {
    if replacements.is_empty() {
        return (content_html.to_string(), 0);
    }

    let Ok(selector) = Selector::parse(REWRITE_SELECTOR) else {
        return (content_html.to_string(), 0);
    };

    let fragment = Html::parse_fragment(content_html);
    let mut edits: HashMap<String, String> = HashMap::new();

    for element in fragment.select(&selector) {
        let attr = if element.value().name() == "link" {
            "href"
        } else {
            "src"
        };

        let Some(raw) = element.value().attr(attr) else {
            continue;
        };
        let Ok(absolute) = page_base.join(raw.trim()) else {
            continue;
        };
        let Some(local) = replacements.get(absolute.as_str()) else {
            continue;
        };

        edits.insert(
            format!(" {}=\"{}\"", attr, escape_attribute(raw)),
            format!(" {}=\"{}\"", attr, escape_attribute(local)),
        );
    }

    let mut rewritten = String::with_capacity(content_html.len());
    let mut count = 0;
    let mut rest = content_html;

    while let Some(start) = rest.find('<') {
        rewritten.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tag_end(tail).unwrap_or(tail.len());
        let (tag, after) = tail.split_at(end);

        if is_asset_tag(tag) {
            let mut tag = tag.to_string();
            for (from, to) in &edits {
                let occurrences = tag.matches(from.as_str()).count();
                if occurrences > 0 {
                    tag = tag.replace(from.as_str(), to);
                    count += occurrences;
                    debug!("Rewrote {} -> {}", from.trim_start(), to.trim_start());
                }
            }
            rewritten.push_str(&tag);
        } else {
            rewritten.push_str(tag);
        }

        rest = after;
    }
    rewritten.push_str(rest);

    (rewritten, count)
}

/// Length of the tag starting at `html[0] == '<'`, quotes respected
fn tag_end(html: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in html.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i + 1),
            None => {}
        }
    }
    None
}

fn is_asset_tag(tag: &str) -> bool {
    let name: String = tag
        .chars()
        .skip(1)
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    matches!(
        name.to_ascii_lowercase().as_str(),
        "script" | "link" | "img"
    )
}

/// Escapes an attribute value the way html5ever serializes it
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
