use crate::url::domain::parse_http_url;
use crate::UrlError;
use url::Url;

/// Query parameter carrying the page number on paginated listings
const PAGE_PARAM: &str = "page";

/// Rewrites a scheme-relative image source to HTTPS
///
/// Gallery markup commonly serves images as `//cdn.host/path`. Any other value
/// is only trimmed.
///
/// # Examples
///
/// ```
/// use gallery_harvest::url::normalize_image_url;
///
/// assert_eq!(
///     normalize_image_url("//cdn.example.com/a.jpg"),
///     "https://cdn.example.com/a.jpg"
/// );
/// ```
pub fn normalize_image_url(src: &str) -> String {
    let src = src.trim();
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => src.to_string(),
    }
}

/// Resolves an album link found on a category page
///
/// Returns None when the href is empty or cannot be turned into an absolute
/// http(s) URL.
///
/// # Arguments
///
/// * `href` - The raw `href` attribute
/// * `origin` - Origin of the category the link was found on
pub fn resolve_link(href: &str, origin: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let candidate = if href.starts_with("//") {
        normalize_image_url(href)
    } else if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else {
        href.to_string()
    };

    match parse_http_url(&candidate) {
        Ok(url) => Some(url),
        Err(_) => {
            // Plain relative paths ("albums/12") still resolve against the origin
            let base = Url::parse(&format!("{}/", origin.trim_end_matches('/'))).ok()?;
            base.join(href)
                .ok()
                .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        }
    }
}

/// Builds the URL of page `page` of a paginated listing
///
/// Page 1 is the listing URL itself. Later pages carry a `page=N` query pair,
/// which renders as `?page=N` on bare category links and `&page=N` on album
/// links that already have a query string.
///
/// # Examples
///
/// ```
/// use gallery_harvest::url::page_url;
/// use url::Url;
///
/// let album = Url::parse("https://g.example.com/albums/9?uid=1").unwrap();
/// assert_eq!(page_url(&album, 3).unwrap().as_str(), "https://g.example.com/albums/9?uid=1&page=3");
/// ```
pub fn page_url(base: &Url, page: u32) -> Result<Url, UrlError> {
    if page == 0 {
        return Err(UrlError::Parse("page numbers start at 1".to_string()));
    }

    if page == 1 {
        return Ok(base.clone());
    }

    let mut url = base.clone();
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(PAGE_PARAM, &page.to_string());
    }

    Ok(url)
}
