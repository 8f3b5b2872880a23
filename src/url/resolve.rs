use crate::{UrlError, UrlResult};
use url::Url;

/// Destination prefixes that never lead to a fetchable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Parses a URL and requires it to be an absolute http(s) URL with a host
///
/// # Examples
///
/// ```
/// use text_harvest::url::parse_absolute;
///
/// assert!(parse_absolute("https://lib.example.com/RUFANT/").is_ok());
/// assert!(parse_absolute("/RUFANT/").is_err());
/// assert!(parse_absolute("ftp://lib.example.com/").is_err());
/// ```
pub fn parse_absolute(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty or whitespace-only hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - fragment-only links (same page anchors)
/// - hrefs that do not resolve to an absolute http(s) URL with a host
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.host_str().filter(|host| !host.is_empty())?;

    Some(absolute.to_string())
}

/// Returns the lowercase host of a URL, used to key per-host politeness state
///
/// The port is kept so that two services on one machine are throttled
/// separately.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
