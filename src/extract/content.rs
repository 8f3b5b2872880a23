//! Title and body extraction for leaf pages

use super::{collapse_whitespace, compile_selector};
use crate::config::{ContentConfig, TitleSource};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Title and unsanitized body of one leaf page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct BodyRule {
    selector: Selector,
    all: bool,
}

/// Compiled extraction rules
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    headings: Vec<Selector>,
    page_title: Selector,
    body_rules: Vec<BodyRule>,
    stripped: HashSet<String>,
    title_source: TitleSource,
    untitled: String,
}

impl ContentExtractor {
    /// Compiles the `[site.content]` rules
    pub fn new(config: &ContentConfig) -> Result<Self, ConfigError> {
        let headings = ["h1", "h2", "h3"]
            .iter()
            .map(|tag| compile_selector(tag))
            .collect::<Result<Vec<_>, _>>()?;

        let body_rules = config
            .body_selectors
            .iter()
            .map(|rule| {
                Ok(BodyRule {
                    selector: compile_selector(&rule.selector)?,
                    all: rule.all,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut stripped: HashSet<String> = config
            .strip_tags
            .iter()
            .map(|tag| tag.trim().to_ascii_lowercase())
            .collect();
        if config.strip_tables {
            stripped.insert("table".to_string());
        }

        Ok(Self {
            headings,
            page_title: compile_selector("title")?,
            body_rules,
            stripped,
            title_source: config.title_source,
            untitled: config.untitled.clone(),
        })
    }

    /// Extracts title and body from a parsed leaf page
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed page
    /// * `link_text` - Text of the anchor that led here, used as the title
    ///   when the title source is `link-text`
    ///
    /// # Returns
    ///
    /// The title is never empty: it falls back to the configured placeholder.
    /// The body is empty when no body selector matched any text.
    pub fn extract(&self, document: &Html, link_text: Option<&str>) -> ExtractedContent {
        let from_link = match self.title_source {
            TitleSource::LinkText => link_text
                .map(collapse_whitespace)
                .filter(|text| !text.is_empty()),
            TitleSource::Page => None,
        };

        let title = from_link
            .or_else(|| self.page_title(document))
            .unwrap_or_else(|| self.untitled.clone());

        ExtractedContent {
            title,
            body: self.body(document),
        }
    }

    /// Parses `html` and extracts from it
    pub fn extract_html(&self, html: &str, link_text: Option<&str>) -> ExtractedContent {
        self.extract(&Html::parse_document(html), link_text)
    }

    /// First non-empty `h1`, then `h2`, then `h3`, then `<title>`
    fn page_title(&self, document: &Html) -> Option<String> {
        self.headings
            .iter()
            .chain(std::iter::once(&self.page_title))
            .find_map(|selector| {
                document
                    .select(selector)
                    .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                    .find(|text| !text.is_empty())
            })
    }

    fn body(&self, document: &Html) -> String {
        for rule in &self.body_rules {
            let text = if rule.all {
                document
                    .select(&rule.selector)
                    .map(|el| self.visible_text(el))
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                document
                    .select(&rule.selector)
                    .next()
                    .map(|el| self.visible_text(el))
                    .unwrap_or_default()
            };

            if !text.is_empty() {
                return text;
            }
        }

        String::new()
    }

    /// Text of `element` without stripped subtrees; trimmed text nodes are
    /// joined with single spaces
    fn visible_text(&self, element: ElementRef<'_>) -> String {
        let mut parts = Vec::new();
        self.collect_text(element, &mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&self, element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                if !self.stripped.contains(child_element.value().name()) {
                    self.collect_text(child_element, parts);
                }
            } else if let Some(text) = child.value().as_text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
        }
    }
}
