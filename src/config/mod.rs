//! Configuration module for Gallery-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file.
//!
//! # Example
//!
//! ```no_run
//! use gallery_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Downloading with {} workers", config.download.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DownloadConfig, HttpConfig, OutputConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default};
pub use validation::validate;
