//! Run statistics
//!
//! Counters collected by the coordinator while it walks categories, albums
//! and their pages, plus the summary printed at the end of a run.

use crate::crawler::BatchReport;
use std::time::Duration;

/// Counters for one crawl run
///
/// "Failed" units are those whose fetch or folder creation failed and that
/// were skipped; the crawl carried on with the next sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Seeds whose first category page was fetched
    pub seeds_processed: u64,
    /// Seeds skipped (bad URL, unreachable first page, folder error)
    pub seeds_failed: u64,

    /// Category pages fetched and scanned for albums
    pub category_pages_processed: u64,
    /// Category pages that could not be fetched
    pub category_pages_failed: u64,
    /// Category pages fetched but listing no album
    pub category_pages_empty: u64,

    /// Albums whose pagination loop ran
    pub albums_processed: u64,
    /// Albums skipped (bad link, unreachable first page, folder error)
    pub albums_failed: u64,

    /// Album pages fetched and handed to the download pool
    pub album_pages_processed: u64,
    /// Album pages that could not be fetched
    pub album_pages_failed: u64,

    /// Images written to disk
    pub images_downloaded: u64,
    /// Images left untouched because the file already existed
    pub images_already_present: u64,
    /// Images skipped after exhausting their retries
    pub images_skipped: u64,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Adds the outcome of one download batch
    pub fn record_batch(&mut self, report: &BatchReport) {
        self.images_downloaded += report.downloaded as u64;
        self.images_already_present += report.already_present as u64;
        self.images_skipped += report.skipped as u64;
    }

    /// Number of units (of any level) that were skipped because of a failure
    pub fn failures(&self) -> u64 {
        self.seeds_failed
            + self.category_pages_failed
            + self.albums_failed
            + self.album_pages_failed
            + self.images_skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_summary(stats: &CrawlStats) {
    println!("=== Harvest Summary ===\n");

    println!("Categories:");
    println!("  Processed: {}", stats.seeds_processed);
    println!("  Failed: {}", stats.seeds_failed);
    println!(
        "  Pages: {} processed, {} failed, {} without albums",
        stats.category_pages_processed, stats.category_pages_failed, stats.category_pages_empty
    );
    println!();

    println!("Albums:");
    println!("  Processed: {}", stats.albums_processed);
    println!("  Failed: {}", stats.albums_failed);
    println!(
        "  Pages: {} processed, {} failed",
        stats.album_pages_processed, stats.album_pages_failed
    );
    println!();

    println!("Images:");
    println!("  Downloaded: {}", stats.images_downloaded);
    if stats.images_already_present > 0 {
        println!("  Already present: {}", stats.images_already_present);
    }
    println!("  Skipped: {}", stats.images_skipped);
    println!();

    let attempted = stats.images_downloaded + stats.images_skipped;
    let success_rate = if attempted > 0 {
        (stats.images_downloaded as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} images downloaded) in {:.1?}",
        success_rate, stats.images_downloaded, attempted, stats.elapsed
    );
}
