//! Crawler module for gallery fetching and downloading
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing of category and album pages
//! - Bounded parallel image downloads
//! - Overall crawl coordination

mod coordinator;
mod downloader;
mod fetcher;
mod parser;
mod retry;

pub use coordinator::{run_crawl, Coordinator};
pub use downloader::{part_path, BatchReport, DownloadItem, DownloadOutcome, DownloadPool};
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use parser::{
    parse_album_page, parse_albums, parse_category_page, parse_category_title,
    parse_image_cards, parse_pagination_count, AlbumCard, AlbumPage, CategoryPage, ImageCard,
};
pub use retry::{ErrorKind, RetryDecision, RetryPolicy};

use crate::config::Config;
use crate::input::SeedLink;
use crate::output::CrawlStats;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the shared HTTP client and the download pool
/// 2. Walk every category page of every seed
/// 3. Walk every album page of every album found
/// 4. Download each album page's images before moving on
/// 5. Return the run statistics
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seeds` - The category links to crawl
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl completed, possibly with skipped units
/// * `Err(HarvestError)` - Crawl could not start
pub async fn crawl(config: Config, seeds: &[SeedLink]) -> Result<CrawlStats, HarvestError> {
    run_crawl(config, seeds).await
}
