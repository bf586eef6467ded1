//! Output module for reporting crawl results
//!
//! This module handles recording run statistics and printing the final
//! summary.

pub mod stats;

pub use stats::{print_summary, CrawlStats};
