/// Checks if a host belongs to the target domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "example.org" matches "example.org" (and "www.example.org",
///    since archives list both spellings of the same site)
/// 2. Wildcard: "*.example.org" matches the bare domain and any subdomain
///
/// # Examples
///
/// ```
/// use wayback_salvage::url::matches_domain;
///
/// assert!(matches_domain("example.org", "example.org"));
/// assert!(matches_domain("example.org", "WWW.example.org"));
/// assert!(!matches_domain("example.org", "blog.example.org"));
///
/// assert!(matches_domain("*.example.org", "example.org"));
/// assert!(matches_domain("*.example.org", "api.v2.example.org"));
/// assert!(!matches_domain("*.example.org", "example.com"));
/// ```
pub fn matches_domain(pattern: &str, host: &str) -> bool {
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host == pattern.strip_prefix("www.").unwrap_or(pattern)
    }
}
