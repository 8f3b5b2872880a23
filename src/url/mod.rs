//! URL handling module for Text-Harvest
//!
//! This module resolves discovered hrefs against their page, validates that
//! URLs are absolute http(s) locations, and extracts host keys for politeness
//! tracking.

mod resolve;

// Re-export main functions
pub use resolve::{host_key, parse_absolute, resolve_link};
