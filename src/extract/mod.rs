//! Link discovery and content extraction from parsed pages
//!
//! This module contains the page-level heuristics of the pipeline:
//! - Link discovery strategies that find child pages on listing pages
//! - Title and body extraction from leaf pages
//! - Sanitizing of extracted body text

mod content;
mod links;
mod sanitize;

pub use content::{ContentExtractor, ExtractedContent};
pub use links::LinkDiscoverer;
pub use sanitize::sanitize;

use crate::config::Field;
use crate::ConfigError;
use scraper::Selector;

/// A link found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Absolute http(s) URL, resolved against the page the link was found on
    pub url: String,

    /// Anchor text with whitespace collapsed (may be empty)
    pub text: String,
}

/// One extracted page, ready for the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub title: String,
    pub body: String,
    pub source_url: String,
    pub section_label: Option<String>,
    pub author_label: Option<String>,
}

impl ExtractedRecord {
    /// Returns the value written for an output column
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
            Field::Url => &self.source_url,
            Field::Section => self.section_label.as_deref().unwrap_or(""),
            Field::Author => self.author_label.as_deref().unwrap_or(""),
        }
    }
}

/// Compiles a CSS selector, reporting the offending text on failure
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
