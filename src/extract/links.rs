//! Link discovery strategies
//!
//! Listing pages on the target sites do not share markup, so each traversal
//! level picks one of three heuristics:
//!
//! - **header-anchored**: find the text node that reads exactly a phrase
//!   (e.g. "Авторы", trimmed and compared case-insensitively), climb to its
//!   nearest container element and walk the elements that follow it in
//!   document order. Each `<li>` contributes its first
//!   anchor. The walk stops at the next `h1`-`h4` or once `cap` links have
//!   been collected.
//! - **list-items**: anchors inside list items anywhere on the page.
//! - **tag-block**: anchors with non-empty text inside the first element
//!   matching a selector, optionally restricted to a text prefix.
//!
//! Every strategy returns absolute http(s) URLs in document order without
//! duplicates, and returns an empty list (never an error) when the page has
//! nothing to offer.

use super::{collapse_whitespace, compile_selector, LinkCandidate};
use crate::config::DiscoveryRule;
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Headings that end a header-anchored walk
const SECTION_BREAKS: [&str; 4] = ["h1", "h2", "h3", "h4"];

#[derive(Debug, Clone)]
enum Strategy {
    HeaderAnchored {
        header: String,
        cap: usize,
        containers: Vec<String>,
    },
    ListItems {
        items: Selector,
        first_anchor_only: bool,
    },
    TagBlock {
        block: Selector,
        text_prefix: Option<String>,
    },
}

/// Applies one discovery rule to listing pages
#[derive(Debug, Clone)]
pub struct LinkDiscoverer {
    strategy: Strategy,
    anchor: Selector,
}

impl LinkDiscoverer {
    /// Compiles a discovery rule
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSelector` if the rule names a selector or
    /// tag that does not parse.
    pub fn from_rule(rule: &DiscoveryRule) -> Result<Self, ConfigError> {
        let strategy = match rule {
            DiscoveryRule::HeaderAnchored {
                header,
                cap,
                containers,
            } => Strategy::HeaderAnchored {
                header: header.trim().to_lowercase(),
                cap: *cap,
                containers: containers.iter().map(|c| c.to_ascii_lowercase()).collect(),
            },
            DiscoveryRule::ListItems {
                item_tags,
                first_anchor_only,
            } => Strategy::ListItems {
                items: compile_selector(&item_tags.join(", "))?,
                first_anchor_only: *first_anchor_only,
            },
            DiscoveryRule::TagBlock {
                selector,
                text_prefix,
            } => Strategy::TagBlock {
                block: compile_selector(selector)?,
                text_prefix: text_prefix.clone(),
            },
        };

        Ok(Self {
            strategy,
            anchor: compile_selector("a[href]")?,
        })
    }

    /// Parses `html` and discovers links, resolving them against `base`
    pub fn discover(&self, html: &str, base: &Url) -> Vec<LinkCandidate> {
        let document = Html::parse_document(html);
        self.discover_in(&document, base)
    }

    /// Discovers links in an already parsed document
    pub fn discover_in(&self, document: &Html, base: &Url) -> Vec<LinkCandidate> {
        let mut found = CandidateList::default();

        match &self.strategy {
            Strategy::HeaderAnchored {
                header,
                cap,
                containers,
            } => self.walk_after_header(document, base, header, *cap, containers, &mut found),
            Strategy::ListItems {
                items,
                first_anchor_only,
            } => {
                for item in document.select(items) {
                    if *first_anchor_only {
                        found.push_first(item.select(&self.anchor), base);
                    } else {
                        for anchor in item.select(&self.anchor) {
                            found.push_anchor(anchor, base);
                        }
                    }
                }
            }
            Strategy::TagBlock { block, text_prefix } => {
                if let Some(block) = document.select(block).next() {
                    for anchor in block.select(&self.anchor) {
                        let text = anchor_text(anchor);
                        if text.is_empty() {
                            continue;
                        }
                        if let Some(prefix) = text_prefix {
                            if !text.starts_with(prefix.as_str()) {
                                continue;
                            }
                        }
                        if let Some(href) = anchor.value().attr("href") {
                            if let Some(url) = resolve_link(href, base) {
                                found.push(LinkCandidate { url, text });
                            }
                        }
                    }
                }
            }
        }

        found.into_vec()
    }

    fn walk_after_header(
        &self,
        document: &Html,
        base: &Url,
        header: &str,
        cap: usize,
        containers: &[String],
        found: &mut CandidateList,
    ) {
        let Some(container) = find_header_container(document, header, containers) else {
            tracing::debug!("Header {:?} not found inside a known container", header);
            return;
        };

        let following = document
            .tree
            .root()
            .descendants()
            .skip_while(|node| node.id() != container.id())
            .skip(1);

        for node in following {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            let name = element.value().name();

            if SECTION_BREAKS.contains(&name) {
                break;
            }

            if name == "li" {
                found.push_first(element.select(&self.anchor), base);
                if found.len() >= cap {
                    break;
                }
            }
        }
    }
}

/// Finds the nearest whitelisted ancestor of the first text node whose
/// trimmed, lowercased content equals `header`
fn find_header_container<'a>(
    document: &'a Html,
    header: &str,
    containers: &[String],
) -> Option<ElementRef<'a>> {
    document
        .tree
        .root()
        .descendants()
        .filter(|node| {
            node.value()
                .as_text()
                .map_or(false, |text| text.trim().to_lowercase() == header)
        })
        .find_map(|text_node| {
            text_node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| containers.iter().any(|c| c == el.value().name()))
        })
}

fn anchor_text(anchor: ElementRef<'_>) -> String {
    collapse_whitespace(&anchor.text().collect::<String>())
}

/// Ordered, duplicate-free list of candidates
#[derive(Default)]
struct CandidateList {
    items: Vec<LinkCandidate>,
    seen: HashSet<String>,
}

impl CandidateList {
    fn push(&mut self, candidate: LinkCandidate) {
        if self.seen.insert(candidate.url.clone()) {
            self.items.push(candidate);
        }
    }

    /// Adds the anchor if its destination resolves; returns whether it did
    fn push_anchor(&mut self, anchor: ElementRef<'_>, base: &Url) -> bool {
        match anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base))
        {
            Some(url) => {
                self.push(LinkCandidate {
                    url,
                    text: anchor_text(anchor),
                });
                true
            }
            None => false,
        }
    }

    /// Adds the first anchor with a usable destination
    fn push_first<'a>(&mut self, anchors: impl Iterator<Item = ElementRef<'a>>, base: &Url) {
        for anchor in anchors {
            if self.push_anchor(anchor, base) {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn into_vec(self) -> Vec<LinkCandidate> {
        self.items
    }
}
