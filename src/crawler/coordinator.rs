//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives the two nested pagination loops:
//! - category pages 1..N, each listing albums
//! - album pages 1..M, each listing images
//!
//! The walk is strictly sequential. Only the images of the current album page
//! are downloaded in parallel, and the next page is fetched once that batch
//! has finished. Any failure below the run level is logged, counted and
//! skipped; the crawl continues with the next sibling.

use crate::config::{validate, Config};
use crate::crawler::downloader::{DownloadItem, DownloadPool};
use crate::crawler::fetcher::{build_http_client, FetchResult, Fetcher};
use crate::crawler::parser::{parse_album_page, parse_category_page, AlbumCard, ImageCard};
use crate::input::SeedLink;
use crate::naming::{FolderNamer, PageNamer};
use crate::output::CrawlStats;
use crate::url::{origin_of, page_url, parse_http_url, resolve_link};
use crate::{Result, UrlError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A category resolved from its first page
#[derive(Debug)]
struct Category {
    title: String,
    base_url: Url,
    origin: String,
    referer: String,
    folder: PathBuf,
    page_count: u32,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    pool: DownloadPool,
    output_root: PathBuf,
    category_folders: FolderNamer,
    stats: CrawlStats,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The configuration is validated, then the HTTP client is built once and
    /// shared by the fetcher and the download pool.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The configuration is invalid or the HTTP client
    ///   could not be built
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;

        let client = build_http_client(&config.http)?;
        let fetcher = Fetcher::new(client.clone(), &config.http);
        let pool = DownloadPool::new(client, &config.download);
        let output_root = PathBuf::from(&config.output.root);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            pool,
            output_root,
            category_folders: FolderNamer::categories(),
            stats: CrawlStats::default(),
        })
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Root folder receiving the category folders
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Crawls every seed in order and returns the run statistics
    ///
    /// This never fails: unreachable categories, pages, albums and images are
    /// skipped and show up in the returned counters.
    pub async fn run(&mut self, seeds: &[SeedLink]) -> CrawlStats {
        let start_time = Instant::now();
        tracing::info!(
            "Starting harvest of {} categories into {} ({} download workers)",
            seeds.len(),
            self.output_root.display(),
            self.pool.workers()
        );

        for seed in seeds {
            self.process_category(seed).await;
        }

        self.stats.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl finished: {} images downloaded, {} skipped, {} units failed in {:?}",
            self.stats.images_downloaded,
            self.stats.images_skipped,
            self.stats.failures(),
            self.stats.elapsed
        );

        self.stats.clone()
    }

    /// Processes one seed: reads title and page count from its first page,
    /// then walks every category page
    async fn process_category(&mut self, seed: &SeedLink) {
        tracing::info!("Fetching main category page: {}", seed);

        let seed_url = match parse_listing_url(seed.as_str()) {
            Ok((url, _)) => url,
            Err(e) => {
                tracing::error!("Skipping invalid category link '{}': {}", seed, e);
                self.stats.seeds_failed += 1;
                return;
            }
        };

        let (final_url, body) = match self.fetch_body(seed_url.as_str()).await {
            Ok(fetched) => fetched,
            Err(reason) => {
                tracing::error!("Failed to fetch main category page {}: {}", seed, reason);
                self.stats.seeds_failed += 1;
                return;
            }
        };

        // Pagination and relative links follow the page we ended up on
        let (base_url, origin) = match parse_listing_url(&final_url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Category {} redirected to unusable '{}': {}", seed, final_url, e);
                self.stats.seeds_failed += 1;
                return;
            }
        };

        let mut first_page = parse_category_page(&body);
        tracing::info!(
            "Total number of pages in the category: {}",
            first_page.page_count
        );

        let folder = self
            .category_folders
            .claim(&self.output_root, &first_page.title);
        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            tracing::error!("Cannot create folder {}: {}", folder.display(), e);
            self.stats.seeds_failed += 1;
            return;
        }

        let referer = self
            .config
            .download
            .referer
            .clone()
            .unwrap_or_else(|| format!("{}/", origin));

        let category = Category {
            title: first_page.title.clone(),
            base_url,
            origin,
            referer,
            folder,
            page_count: self.capped_page_count(first_page.page_count, seed.as_str()),
        };
        self.stats.seeds_processed += 1;

        let mut album_folders = FolderNamer::albums();

        for page in 1..=category.page_count {
            tracing::info!("Processing page {} of '{}'...", page, category.title);

            let albums = if page == 1 {
                std::mem::take(&mut first_page.albums)
            } else {
                match self.fetch_category_page(&category, page).await {
                    Some(albums) => albums,
                    None => continue,
                }
            };

            self.stats.category_pages_processed += 1;

            if albums.is_empty() {
                tracing::info!("No albums found on page {}.", page);
                self.stats.category_pages_empty += 1;
                continue;
            }

            for album in albums {
                self.process_album(&category, &mut album_folders, album).await;
            }
        }

        tracing::info!("Finished category '{}'", category.title);
    }

    async fn fetch_category_page(&mut self, category: &Category, page: u32) -> Option<Vec<AlbumCard>> {
        let url = match page_url(&category.base_url, page) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build URL for page {}: {}", page, e);
                self.stats.category_pages_failed += 1;
                return None;
            }
        };

        match self.fetch_body(url.as_str()).await {
            Ok((_, body)) => Some(parse_category_page(&body).albums),
            Err(reason) => {
                tracing::error!("Failed to fetch page {}: {}", page, reason);
                self.stats.category_pages_failed += 1;
                None
            }
        }
    }

    /// Processes one album: reads its page count from the first page, then
    /// downloads the images of every album page
    async fn process_album(
        &mut self,
        category: &Category,
        album_folders: &mut FolderNamer,
        album: AlbumCard,
    ) {
        let Some(link) = resolve_link(&album.link, &category.origin) else {
            tracing::warn!(
                "Skipping album '{}' with unusable link '{}'",
                album.title,
                album.link
            );
            self.stats.albums_failed += 1;
            return;
        };

        let folder = album_folders.claim(&category.folder, &album.title);
        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            tracing::error!("Cannot create folder {}: {}", folder.display(), e);
            self.stats.albums_failed += 1;
            return;
        }

        tracing::info!("Fetching album '{}' metadata...", album.title);
        let (final_url, body) = match self.fetch_body(link.as_str()).await {
            Ok(fetched) => fetched,
            Err(reason) => {
                tracing::error!("Failed to fetch album URL {}: {}", link, reason);
                self.stats.albums_failed += 1;
                return;
            }
        };
        let link = Url::parse(&final_url).unwrap_or(link);

        let mut first_page = parse_album_page(&body);
        tracing::info!(
            "Total pages in album '{}': {}",
            album.title,
            first_page.page_count
        );
        let page_count = self.capped_page_count(first_page.page_count, link.as_str());
        self.stats.albums_processed += 1;

        for page in 1..=page_count {
            tracing::info!("Fetching album '{}', page {}", album.title, page);

            let images = if page == 1 {
                std::mem::take(&mut first_page.images)
            } else {
                match self.fetch_album_page(&link, page).await {
                    Some(images) => images,
                    None => continue,
                }
            };

            self.stats.album_pages_processed += 1;

            if images.is_empty() {
                tracing::info!("No images found on page {}.", page);
                continue;
            }

            let items = self.build_download_items(&folder, page, images);
            tracing::info!(
                "Starting downloads for album '{}', page {} ({} images)...",
                album.title,
                page,
                items.len()
            );

            let report = self.pool.download_all(items, &category.referer).await;
            if report.skipped > 0 {
                tracing::warn!(
                    "{} of {} images skipped on album '{}', page {}",
                    report.skipped,
                    report.total(),
                    album.title,
                    page
                );
            }
            self.stats.record_batch(&report);
        }

        tracing::info!("All pages of album '{}' have been processed.", album.title);
    }

    async fn fetch_album_page(&mut self, link: &Url, page: u32) -> Option<Vec<ImageCard>> {
        let url = match page_url(link, page) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build URL for album page {}: {}", page, e);
                self.stats.album_pages_failed += 1;
                return None;
            }
        };

        match self.fetch_body(url.as_str()).await {
            Ok((_, body)) => Some(parse_album_page(&body).images),
            Err(reason) => {
                tracing::error!("Failed to fetch URL for page {}: {}", page, reason);
                self.stats.album_pages_failed += 1;
                None
            }
        }
    }

    /// Maps the image cards of one album page onto unique destination paths
    fn build_download_items(
        &self,
        folder: &Path,
        page: u32,
        images: Vec<ImageCard>,
    ) -> Vec<DownloadItem> {
        let mut namer = PageNamer::new(page, &self.config.output.extension);

        images
            .into_iter()
            .enumerate()
            .map(|(index, image)| DownloadItem {
                path: folder.join(namer.file_name(index + 1, &image.title)),
                url: image.url,
            })
            .collect()
    }

    /// Limits a parsed page count to `http.max-pages`
    fn capped_page_count(&self, page_count: u32, listing: &str) -> u32 {
        let max_pages = self.config.http.max_pages;
        if page_count > max_pages {
            tracing::warn!(
                "{} claims {} pages, only the first {} are walked",
                listing,
                page_count,
                max_pages
            );
            max_pages
        } else {
            page_count
        }
    }

    /// Fetches a listing page, returning the URL it was served from and its body
    async fn fetch_body(&self, url: &str) -> std::result::Result<(String, String), String> {
        match self.fetcher.fetch_document(url).await {
            FetchResult::Success {
                final_url, body, ..
            } => Ok((final_url, body)),
            failed => Err(failed
                .failure_reason()
                .unwrap_or_else(|| "unknown failure".to_string())),
        }
    }
}

/// Parses an http(s) listing URL together with its origin
fn parse_listing_url(raw: &str) -> std::result::Result<(Url, String), UrlError> {
    let url = parse_http_url(raw)?;
    let origin = origin_of(url.as_str())?;
    Ok((url, origin))
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `seeds` - Category links, crawled in order
///
/// # Returns
///
/// * `Ok(CrawlStats)` - The run completed (possibly with skipped units)
/// * `Err(HarvestError)` - The crawler could not be set up
///
/// # Example
///
/// ```no_run
/// use gallery_harvest::config::Config;
/// use gallery_harvest::crawler::run_crawl;
/// use gallery_harvest::input::load_seed_links;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let seeds = load_seed_links(Path::new("input.csv"))?;
/// let stats = run_crawl(Config::default(), &seeds).await?;
/// println!("{} images downloaded", stats.images_downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, seeds: &[SeedLink]) -> Result<CrawlStats> {
    let mut coordinator = Coordinator::new(config)?;
    Ok(coordinator.run(seeds).await)
}
