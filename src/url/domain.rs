use super::matcher::matches_domain;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wayback_salvage::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.org/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL's host belongs to the target domain pattern
pub fn is_in_target(url: &Url, pattern: &str) -> bool {
    extract_domain(url)
        .map(|host| matches_domain(pattern, &host))
        .unwrap_or(false)
}
