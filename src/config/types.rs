use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Text-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub submissions: Option<SubmissionsConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two requests to the same host (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of leaf fetches in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_concurrency")]
    pub max_concurrent_fetches: u32,

    /// Stop the run once this many records have been written
    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_fetches: default_concurrency(),
            max_records: None,
        }
    }
}

/// Request identification and decoding configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Value of the User-Agent header
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Value of the Accept-Language header, if the site gates on it
    #[serde(rename = "accept-language", default)]
    pub accept_language: Option<String>,

    /// "auto" to detect per page, or a fixed encoding label
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Encoding used when detection has no confident answer
    #[serde(rename = "fallback-encoding", default = "default_fallback_encoding")]
    pub fallback_encoding: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: None,
            encoding: default_encoding(),
            fallback_encoding: default_fallback_encoding(),
        }
    }
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the delimited output file
    pub path: String,

    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Prefix the file with a UTF-8 byte-order mark (spreadsheet compatibility)
    #[serde(rename = "byte-order-mark", default)]
    pub byte_order_mark: bool,

    /// Columns in output order
    pub columns: Vec<ColumnSpec>,
}

/// One output column
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub field: Field,

    /// Header label; defaults to the field's English name
    #[serde(default)]
    pub header: Option<String>,
}

impl ColumnSpec {
    pub fn new(field: Field, header: &str) -> Self {
        Self {
            field,
            header: Some(header.to_string()),
        }
    }

    pub fn header_label(&self) -> &str {
        self.header
            .as_deref()
            .unwrap_or_else(|| self.field.default_header())
    }
}

/// Record fields that can be written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Title,
    Body,
    Url,
    Section,
    Author,
}

impl Field {
    pub fn default_header(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Body => "Body",
            Self::Url => "URL",
            Self::Section => "Section",
            Self::Author => "Author",
        }
    }

    /// Optional fields may be written as empty cells
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Section | Self::Author)
    }
}

/// What to crawl and how to read it
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root pages to start from
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,

    /// Numbered leaf pages generated from a template (instead of seeds)
    #[serde(default)]
    pub pages: Option<PageRange>,

    /// Traversal depth: 1 (leaves only), 2 (seed → leaves), 3 (seed → listings → leaves)
    #[serde(default = "default_depth")]
    pub depth: u8,

    /// Discovery rule applied to seed pages
    #[serde(rename = "first-level", default)]
    pub first_level: Option<DiscoveryRule>,

    /// Discovery rule applied to intermediate listing pages (depth 3)
    #[serde(rename = "second-level", default)]
    pub second_level: Option<DiscoveryRule>,

    /// Write the links found at the last level as records instead of
    /// fetching them (catalog of titles and URLs, no body)
    #[serde(rename = "emit-links", default)]
    pub emit_links: bool,

    #[serde(default)]
    pub content: ContentConfig,
}

/// A seed URL with an optional section label
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,

    #[serde(default)]
    pub label: Option<String>,
}

/// Range of numbered pages, e.g. `https://host/material/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct PageRange {
    #[serde(rename = "url-template")]
    pub url_template: String,

    pub start: u64,

    /// Inclusive upper bound
    pub end: u64,
}

impl PageRange {
    pub const PLACEHOLDER: &'static str = "{id}";

    /// Expands the template into concrete URLs, in ascending order
    pub fn urls(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..=self.end).map(move |id| {
            self.url_template
                .replace(Self::PLACEHOLDER, &id.to_string())
        })
    }
}

/// Link discovery heuristic for one traversal level
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum DiscoveryRule {
    /// List-item anchors following a named section header
    HeaderAnchored {
        header: String,

        #[serde(default = "default_header_cap")]
        cap: usize,

        #[serde(default = "default_header_containers")]
        containers: Vec<String>,
    },

    /// Anchors inside list items anywhere on the page
    ListItems {
        #[serde(rename = "item-tags", default = "default_item_tags")]
        item_tags: Vec<String>,

        #[serde(rename = "first-anchor-only", default)]
        first_anchor_only: bool,
    },

    /// Anchors inside one distinguished block element
    TagBlock {
        selector: String,

        #[serde(rename = "text-prefix", default)]
        text_prefix: Option<String>,
    },
}

/// Where a record's title comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleSource {
    /// Heading or `<title>` of the leaf page
    #[default]
    Page,
    /// Text of the anchor that led to the leaf, falling back to the page
    LinkText,
}

/// A body container candidate
#[derive(Debug, Clone, Deserialize)]
pub struct BodySelector {
    pub selector: String,

    /// Join the text of every match instead of only the first
    #[serde(default)]
    pub all: bool,
}

impl BodySelector {
    pub fn first(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            all: false,
        }
    }

    pub fn all(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            all: true,
        }
    }
}

/// Title/body extraction rules for leaf pages
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Body containers, tried in order
    #[serde(rename = "body-selectors", default = "default_body_selectors")]
    pub body_selectors: Vec<BodySelector>,

    /// Elements whose text never reaches the output
    #[serde(rename = "strip-tags", default = "default_strip_tags")]
    pub strip_tags: Vec<String>,

    /// Also drop tables (for densely marked-up pages)
    #[serde(rename = "strip-tables", default)]
    pub strip_tables: bool,

    #[serde(rename = "title-source", default)]
    pub title_source: TitleSource,

    /// Title used when the page has none
    #[serde(rename = "untitled", default = "default_untitled")]
    pub untitled: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            body_selectors: default_body_selectors(),
            strip_tags: default_strip_tags(),
            strip_tables: false,
            title_source: TitleSource::default(),
            untitled: default_untitled(),
        }
    }
}

/// Persistence collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionsConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory uploaded files are stored under
    #[serde(rename = "upload-dir", default = "default_upload_dir")]
    pub upload_dir: String,
}

fn default_delay_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_concurrency() -> u32 {
    1
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36".to_string()
}

fn default_encoding() -> String {
    "auto".to_string()
}

fn default_fallback_encoding() -> String {
    "windows-1251".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_depth() -> u8 {
    2
}

fn default_header_cap() -> usize {
    5
}

fn default_header_containers() -> Vec<String> {
    ["h2", "b", "strong", "div", "font"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_item_tags() -> Vec<String> {
    vec!["li".to_string()]
}

fn default_body_selectors() -> Vec<BodySelector> {
    vec![
        BodySelector::first("pre"),
        BodySelector::first("div.text"),
        BodySelector::all("p.text-8"),
    ]
}

fn default_strip_tags() -> Vec<String> {
    ["script", "style", "noscript", "aside", "footer"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_untitled() -> String {
    "Без названия".to_string()
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}
