//! HTML parser for gallery listings
//!
//! This module extracts structured records from fetched documents:
//! - Pagination count (category and album pages alike)
//! - Category title from the breadcrumb
//! - Album cards on a category page
//! - Image cards on an album page
//!
//! Missing markup is never an error. An absent pagination control means a
//! single page, an absent title means a placeholder, and absent cards mean an
//! empty list.

use crate::naming::{UNKNOWN_CATEGORY, UNTITLED_ALBUM};
use crate::url::normalize_image_url;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

const PAGINATION_FORM: &str = "form.pagination__jumpwrap";
const BREADCRUMB: &str = "div.yupoo-crumbs.categories__box-right-header";
const BREADCRUMB_CATEGORY_LINK: &str = "a.yupoo-crumbs-span[title]";
const ALBUM_CARD: &str = "a.album__main";
const IMAGE_CARD: &str = "div.showalbum__children.image__main";
const IMAGE_SOURCE: &str = "img[data-origin-src]";
const IMAGE_TITLE: &str = "h3[title]";

/// An album link found on a category page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumCard {
    /// Album title, `Untitled` when the card has none
    pub title: String,
    /// Raw `href`, possibly relative to the category's origin
    pub link: String,
}

/// An image found on an album page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCard {
    /// Absolute image URL (scheme-relative sources already rewritten to https)
    pub url: String,
    /// Title attribute of the card, as found in the markup
    pub title: String,
}

/// Everything the crawler needs from one category page
#[derive(Debug, Clone)]
pub struct CategoryPage {
    pub page_count: u32,
    pub title: String,
    pub albums: Vec<AlbumCard>,
}

/// Everything the crawler needs from one album page
#[derive(Debug, Clone)]
pub struct AlbumPage {
    pub page_count: u32,
    pub images: Vec<ImageCard>,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Pattern of the localized "N pages total" marker (e.g. "共12页")
fn page_total_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"共\s*(\d+)\s*页").ok())
        .as_ref()
}

/// Extracts the total number of pages from the pagination control
///
/// Returns 1 when the control or its marker is missing or unreadable, so the
/// result is always at least 1.
///
/// # Example
///
/// ```
/// use gallery_harvest::crawler::parse_pagination_count;
/// use scraper::Html;
///
/// let html = r#"<form class="pagination__jumpwrap"><span>共3页</span></form>"#;
/// assert_eq!(parse_pagination_count(&Html::parse_document(html)), 3);
/// assert_eq!(parse_pagination_count(&Html::parse_document("<p></p>")), 1);
/// ```
pub fn parse_pagination_count(document: &Html) -> u32 {
    let (Some(form_selector), Some(span_selector)) = (selector(PAGINATION_FORM), selector("span"))
    else {
        return 1;
    };

    let (Some(form), Some(pattern)) = (
        document.select(&form_selector).next(),
        page_total_pattern(),
    ) else {
        return 1;
    };

    form.select(&span_selector)
        .find_map(|span| {
            let text = span.text().collect::<String>();
            pattern
                .captures(text.trim())
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .filter(|count| *count >= 1)
        .unwrap_or(1)
}

/// Extracts the category title from the breadcrumb
///
/// Falls back to `Unknown_Category` when the breadcrumb, its category link,
/// or a non-blank title attribute is missing.
pub fn parse_category_title(document: &Html) -> String {
    let (Some(crumbs_selector), Some(link_selector)) =
        (selector(BREADCRUMB), selector(BREADCRUMB_CATEGORY_LINK))
    else {
        return UNKNOWN_CATEGORY.to_string();
    };

    document
        .select(&crumbs_selector)
        .next()
        .and_then(|crumbs| crumbs.select(&link_selector).next())
        .and_then(|link| link.value().attr("title"))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNKNOWN_CATEGORY)
        .to_string()
}

/// Extracts the album cards of a category page
///
/// Cards without an `href` are skipped; cards without a title are named
/// `Untitled`.
pub fn parse_albums(document: &Html) -> Vec<AlbumCard> {
    let Some(card_selector) = selector(ALBUM_CARD) else {
        return Vec::new();
    };

    document
        .select(&card_selector)
        .filter_map(|card| {
            let link = card
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|href| !href.is_empty());

            let Some(link) = link else {
                tracing::debug!("Skipping album card without a link");
                return None;
            };

            let title = card
                .value()
                .attr("title")
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(UNTITLED_ALBUM);

            Some(AlbumCard {
                title: title.to_string(),
                link: link.to_string(),
            })
        })
        .collect()
}

/// Extracts the image cards of an album page
///
/// A card needs both an image source and a title; cards missing either are
/// skipped.
pub fn parse_image_cards(document: &Html) -> Vec<ImageCard> {
    let (Some(card_selector), Some(img_selector), Some(title_selector)) = (
        selector(IMAGE_CARD),
        selector(IMAGE_SOURCE),
        selector(IMAGE_TITLE),
    ) else {
        return Vec::new();
    };

    document
        .select(&card_selector)
        .filter_map(|card| parse_image_card(card, &img_selector, &title_selector))
        .collect()
}

fn parse_image_card(
    card: ElementRef<'_>,
    img_selector: &Selector,
    title_selector: &Selector,
) -> Option<ImageCard> {
    let src = card
        .select(img_selector)
        .next()?
        .value()
        .attr("data-origin-src")?
        .trim();

    if src.is_empty() {
        return None;
    }

    let title = card
        .select(title_selector)
        .next()?
        .value()
        .attr("title")?;

    Some(ImageCard {
        url: normalize_image_url(src),
        title: title.to_string(),
    })
}

/// Parses a category page into owned records
///
/// # Example
///
/// ```
/// use gallery_harvest::crawler::parse_category_page;
///
/// let page = parse_category_page(r#"<a class="album__main" href="/albums/1" title="Bags">x</a>"#);
/// assert_eq!(page.page_count, 1);
/// assert_eq!(page.title, "Unknown_Category");
/// assert_eq!(page.albums[0].title, "Bags");
/// ```
pub fn parse_category_page(html: &str) -> CategoryPage {
    let document = Html::parse_document(html);

    CategoryPage {
        page_count: parse_pagination_count(&document),
        title: parse_category_title(&document),
        albums: parse_albums(&document),
    }
}

/// Parses an album page into owned records
pub fn parse_album_page(html: &str) -> AlbumPage {
    let document = Html::parse_document(html);

    AlbumPage {
        page_count: parse_pagination_count(&document),
        images: parse_image_cards(&document),
    }
}
