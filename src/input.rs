//! Seed table loading
//!
//! The run is driven by a CSV table with a header row. Only the `URL` column is
//! read; every non-empty cell becomes one category seed.

use crate::InputError;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Name of the column holding category links
pub const URL_COLUMN: &str = "URL";

/// A category page URL read from the input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedLink(String);

impl SeedLink {
    /// Creates a seed from a raw table cell, trimming surrounding whitespace
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loads the seed links from a CSV file
///
/// # Arguments
///
/// * `path` - Path to the CSV input table
///
/// # Returns
///
/// * `Ok(Vec<SeedLink>)` - Seeds in table order, empty cells skipped
/// * `Err(InputError)` - The file is missing, malformed, or has no `URL` column
///
/// # Example
///
/// ```no_run
/// use gallery_harvest::input::load_seed_links;
/// use std::path::Path;
///
/// let seeds = load_seed_links(Path::new("input.csv")).unwrap();
/// println!("{} categories to crawl", seeds.len());
/// ```
pub fn load_seed_links(path: &Path) -> Result<Vec<SeedLink>, InputError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Io(e),
    })?;

    read_seed_links(file)
}

/// Reads seed links from any CSV source
pub fn read_seed_links<R: io::Read>(source: R) -> Result<Vec<SeedLink>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == URL_COLUMN)
        .ok_or_else(|| InputError::MissingColumn(URL_COLUMN.to_string()))?;

    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(column).map(str::trim) {
            Some(cell) if !cell.is_empty() => seeds.push(SeedLink::new(cell)),
            _ => tracing::debug!("Skipping row {:?} without a URL", record.position()),
        }
    }

    Ok(seeds)
}
