//! URL handling module for Gallery-Harvest
//!
//! This module provides origin extraction, album link resolution, image
//! source normalization and pagination URL building.

mod domain;
mod normalize;

pub use domain::{origin_of, parse_http_url};
pub use normalize::{normalize_image_url, page_url, resolve_link};
