//! Gallery-Harvest: a paginated photo-gallery downloader
//!
//! This crate walks a two-level gallery site (category pages listing albums,
//! album pages listing images) and mirrors every image into a local folder tree
//! named after the category and album titles.

pub mod config;
pub mod crawler;
pub mod input;
pub mod naming;
pub mod output;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Gallery-Harvest operations
///
/// Only run-level conditions surface through this type. Failures of a single
/// page, album or image are absorbed by the crawler and counted in the run
/// statistics instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while loading the seed table
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input table must have a column named '{0}'")]
    MissingColumn(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Gallery-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator};
pub use input::{load_seed_links, SeedLink};
pub use naming::sanitize;
pub use output::CrawlStats;
