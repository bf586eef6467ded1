//! Naming policy for the local folder layout
//!
//! Remote titles are free text. Before they become path components they are
//! sanitized so that the same title always maps to the same, filesystem-safe
//! name:
//!
//! ```text
//! <root>/<category title>/<album title>/<page>_<image title>.<ext>
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Placeholder used when a category has no readable title
pub const UNKNOWN_CATEGORY: &str = "Unknown_Category";

/// Placeholder used when an album card has no title
pub const UNTITLED_ALBUM: &str = "Untitled";

/// Replaces every character that is not alphanumeric, a space or an
/// underscore with an underscore, then trims surrounding whitespace
///
/// The output only contains characters that are left alone by a second pass,
/// so `sanitize(sanitize(x)) == sanitize(x)`.
///
/// # Examples
///
/// ```
/// use gallery_harvest::naming::sanitize;
///
/// assert_eq!(sanitize("Spring/Summer"), "Spring_Summer");
/// assert_eq!(sanitize("  Dress: red  "), "Dress_ red");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitizes a title for use as a folder name, falling back to `placeholder`
/// when nothing usable is left
pub fn folder_name(title: &str, placeholder: &str) -> String {
    let name = sanitize(title);
    if name.is_empty() {
        placeholder.to_string()
    } else {
        name
    }
}

/// Hands out sibling folder names that are unique for the whole run
///
/// Titles that sanitize to the same name (two untitled albums, or `A/B` next
/// to `A:B`) would otherwise share a folder and overwrite each other's
/// images. The first claimant keeps the plain name; later ones get `_2`,
/// `_3` and so on. Names are compared case-insensitively.
#[derive(Debug)]
pub struct FolderNamer {
    placeholder: &'static str,
    used: HashSet<String>,
}

impl FolderNamer {
    /// Namer for the category folders under the output root
    pub fn categories() -> Self {
        Self::with_placeholder(UNKNOWN_CATEGORY)
    }

    /// Namer for the album folders of one category
    pub fn albums() -> Self {
        Self::with_placeholder(UNTITLED_ALBUM)
    }

    fn with_placeholder(placeholder: &'static str) -> Self {
        Self {
            placeholder,
            used: HashSet::new(),
        }
    }

    /// Returns `parent/<name>` where `name` is derived from `title` and not
    /// yet handed out by this namer
    pub fn claim(&mut self, parent: &Path, title: &str) -> PathBuf {
        let base = folder_name(title, self.placeholder);

        let mut name = base.clone();
        let mut counter = 2;
        while !self.used.insert(name.to_lowercase()) {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }

        if name != base {
            tracing::warn!(
                "Folder '{}' is already taken in {}, '{}' saved to '{}'",
                base,
                parent.display(),
                title,
                name
            );
        }

        parent.join(name)
    }
}

/// Assigns unique file names to the image cards of one album page
///
/// The base name is the sanitized `<page>_<title>`. Titles repeat freely
/// across pages, which the page prefix takes care of; titles repeated on the
/// same page get the card's 1-based ordinal appended (`1_A_2.jpg`). Should
/// that name be taken as well, a counter is appended until it is unique.
/// Names differing only in case count as taken.
#[derive(Debug)]
pub struct PageNamer {
    page: u32,
    extension: String,
    used: HashSet<String>,
}

impl PageNamer {
    /// Creates a namer for `page` (1-based) producing files with `extension`
    pub fn new(page: u32, extension: &str) -> Self {
        Self {
            page,
            extension: extension.trim_start_matches('.').to_string(),
            used: HashSet::new(),
        }
    }

    /// Returns the file name for the card at `ordinal` (1-based) titled `title`
    pub fn file_name(&mut self, ordinal: usize, title: &str) -> String {
        let base = sanitize(&format!("{}_{}", self.page, title));

        let mut stem = base.clone();
        if self.is_taken(&stem) {
            stem = format!("{}_{}", base, ordinal);
            let mut counter = 2;
            while self.is_taken(&stem) {
                stem = format!("{}_{}_{}", base, ordinal, counter);
                counter += 1;
            }
            tracing::debug!(
                "Title '{}' repeats on page {}, card {} saved as '{}'",
                title,
                self.page,
                ordinal,
                stem
            );
        }

        self.used.insert(stem.to_lowercase());
        format!("{}.{}", stem, self.extension)
    }

    fn is_taken(&self, stem: &str) -> bool {
        self.used.contains(&stem.to_lowercase())
    }
}
