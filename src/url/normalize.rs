use crate::url::BaseDomain;
use url::{form_urlencoded, Url};

/// Normalizes a URL relative to the crawl's base domain
///
/// # Normalization Steps
///
/// 1. Resolve the input to an absolute http(s) URL (base-relative and
///    protocol-relative forms are resolved against the base domain)
/// 2. Reject it if the host or port differs from the base domain
/// 3. Keep only the path (dot segments already removed by parsing), with a
///    run of leading slashes collapsed to one so the result never reads as a
///    protocol-relative URL
/// 4. Drop the fragment
/// 5. Remove the excluded query parameters; drop the query if nothing remains
///
/// The result is idempotent: normalizing a normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use post_harvest::url::{normalize_url, BaseDomain};
///
/// let domain = BaseDomain::parse("example.com").unwrap();
/// let excluded = vec!["utm_source".to_string()];
///
/// let url = normalize_url(&domain, &excluded, "https://example.com/a?utm_source=x#top");
/// assert_eq!(url.as_deref(), Some("/a"));
/// assert_eq!(normalize_url(&domain, &excluded, "https://other.com/a"), None);
/// ```
pub fn normalize_url(
    domain: &BaseDomain,
    excluded_params: &[String],
    url_str: &str,
) -> Option<String> {
    let url = domain.resolve(url_str.trim())?;

    if !domain.contains(&url) {
        return None;
    }

    let mut normalized = format!("/{}", url.path().trim_start_matches('/'));
    if let Some(query) = filter_query_params(&url, excluded_params) {
        normalized.push('?');
        normalized.push_str(&query);
    }

    Some(normalized)
}

/// Removes excluded query parameters, keeping the rest in their original order
fn filter_query_params(url: &Url, excluded_params: &[String]) -> Option<String> {
    let query = url.query().filter(|q| !q.is_empty())?;

    if excluded_params.is_empty() {
        return Some(query.to_string());
    }

    let kept: Vec<_> = url
        .query_pairs()
        .filter(|(key, _)| !excluded_params.iter().any(|p| p == key))
        .collect();

    if kept.is_empty() {
        return None;
    }

    Some(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish(),
    )
}
