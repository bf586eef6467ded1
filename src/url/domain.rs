use crate::UrlError;
use url::Url;

/// Extracts the origin (`scheme://host[:port]`) of a seed URL
///
/// Relative album links are resolved against this origin, and it doubles as
/// the default Referer for image requests.
///
/// # Arguments
///
/// * `url_str` - An absolute http(s) URL
///
/// # Returns
///
/// * `Ok(String)` - The origin without a trailing slash
/// * `Err(UrlError)` - The URL is malformed, not http(s), or has no host
///
/// # Examples
///
/// ```
/// use gallery_harvest::url::origin_of;
///
/// let origin = origin_of("https://shop.x.example.com/categories/42?isSubCate=true").unwrap();
/// assert_eq!(origin, "https://shop.x.example.com");
/// ```
pub fn origin_of(url_str: &str) -> Result<String, UrlError> {
    let url = parse_http_url(url_str)?;
    let host = url.host_str().ok_or(UrlError::MissingDomain)?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Parses an absolute URL and checks that it is fetchable over http(s)
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
