use crate::config::types::{
    Config, ContentConfig, CrawlerConfig, DiscoveryRule, Field, HttpConfig, OutputConfig,
    PageRange, SiteConfig,
};
use crate::encoding::EncodingPolicy;
use crate::extract::{ContentExtractor, LinkDiscoverer};
use crate::url::parse_absolute;
use crate::ConfigError;
use std::collections::HashSet;

/// Upper bound for `max-concurrent-fetches`
const MAX_CONCURRENT_FETCHES: u32 = 16;

/// Upper bound for `delay-ms`
const MAX_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_site_config(&config.site)?;
    validate_content_config(&config.site.content)?;
    validate_catalog(config)?;
    if let Some(submissions) = &config.submissions {
        if submissions.database_path.is_empty() {
            return Err(ConfigError::Validation(
                "submissions database_path cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > MAX_CONCURRENT_FETCHES
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and {}, got {}",
            MAX_CONCURRENT_FETCHES, config.max_concurrent_fetches
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.delay_ms > MAX_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "delay_ms must be <= {}ms, got {}ms",
            MAX_DELAY_MS, config.delay_ms
        )));
    }

    if config.max_records == Some(0) {
        return Err(ConfigError::Validation(
            "max_records must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates request headers and encoding labels
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    EncodingPolicy::from_config(config)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if !config.delimiter.is_ascii() || matches!(config.delimiter, '"' | '\n' | '\r') {
        return Err(ConfigError::Validation(format!(
            "delimiter must be a single ASCII character other than a quote or line break, got {:?}",
            config.delimiter
        )));
    }

    if config.columns.is_empty() {
        return Err(ConfigError::Validation(
            "output must declare at least one column".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in &config.columns {
        if !seen.insert(column.field) {
            return Err(ConfigError::Validation(format!(
                "column {:?} is declared more than once",
                column.field
            )));
        }
    }

    Ok(())
}

/// Validates the traversal shape
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    match (&config.pages, config.seeds.is_empty()) {
        (Some(_), false) => {
            return Err(ConfigError::Validation(
                "site.seeds and site.pages are mutually exclusive".to_string(),
            ));
        }
        (None, true) => {
            return Err(ConfigError::Validation(
                "site must declare either seeds or a page range".to_string(),
            ));
        }
        _ => {}
    }

    if let Some(pages) = &config.pages {
        if config.depth != 1 {
            return Err(ConfigError::Validation(format!(
                "a page range is crawled at depth 1, got depth {}",
                config.depth
            )));
        }
        validate_page_range(pages)?;
        return Ok(());
    }

    for seed in &config.seeds {
        parse_absolute(&seed.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed.url, e))
        })?;
    }

    match config.depth {
        1 => {}
        2 => require_rule("first-level", config.first_level.as_ref())?,
        3 => {
            require_rule("first-level", config.first_level.as_ref())?;
            require_rule("second-level", config.second_level.as_ref())?;
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "depth must be 1, 2 or 3, got {}",
                other
            )));
        }
    }

    Ok(())
}

fn validate_page_range(pages: &PageRange) -> Result<(), ConfigError> {
    if !pages.url_template.contains(PageRange::PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "url_template must contain {}, got '{}'",
            PageRange::PLACEHOLDER,
            pages.url_template
        )));
    }

    if pages.start > pages.end {
        return Err(ConfigError::Validation(format!(
            "page range start ({}) must not exceed end ({})",
            pages.start, pages.end
        )));
    }

    let sample = pages
        .url_template
        .replace(PageRange::PLACEHOLDER, &pages.start.to_string());
    parse_absolute(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid url_template '{}': {}", pages.url_template, e))
    })?;

    Ok(())
}

/// Ensures a discovery rule is present and compiles
fn require_rule(level: &str, rule: Option<&DiscoveryRule>) -> Result<(), ConfigError> {
    let rule = rule.ok_or_else(|| {
        ConfigError::Validation(format!("site.{} rule is required at this depth", level))
    })?;

    if let DiscoveryRule::HeaderAnchored { header, cap, .. } = rule {
        if header.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site.{} header phrase cannot be empty",
                level
            )));
        }
        if *cap == 0 {
            return Err(ConfigError::Validation(format!(
                "site.{} cap must be >= 1",
                level
            )));
        }
    }

    LinkDiscoverer::from_rule(rule)?;
    Ok(())
}

/// A link catalog has no leaf pages, so it cannot fill a body column
fn validate_catalog(config: &Config) -> Result<(), ConfigError> {
    if !config.site.emit_links {
        return Ok(());
    }

    if config.site.pages.is_some() || config.site.depth < 2 {
        return Err(ConfigError::Validation(
            "site.emit-links needs seeds crawled at depth 2 or 3".to_string(),
        ));
    }

    if config
        .output
        .columns
        .iter()
        .any(|column| column.field == Field::Body)
    {
        return Err(ConfigError::Validation(
            "site.emit-links writes no body; remove the body column".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction rules by compiling them
fn validate_content_config(config: &ContentConfig) -> Result<(), ConfigError> {
    if config.body_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one body selector is required".to_string(),
        ));
    }

    ContentExtractor::new(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{BodySelector, ColumnSpec, SeedEntry};

    fn create_test_config() -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            http: HttpConfig::default(),
            output: OutputConfig {
                path: "./out.csv".to_string(),
                delimiter: ';',
                byte_order_mark: false,
                columns: vec![
                    ColumnSpec::new(Field::Title, "Заголовок"),
                    ColumnSpec::new(Field::Body, "Текст"),
                ],
            },
            site: SiteConfig {
                seeds: vec![SeedEntry {
                    url: "https://lib.example.com/RUFANT/".to_string(),
                    label: None,
                }],
                pages: None,
                depth: 2,
                first_level: Some(DiscoveryRule::ListItems {
                    item_tags: vec!["li".to_string()],
                    first_anchor_only: false,
                }),
                second_level: None,
                emit_links: false,
                content: ContentConfig::default(),
            },
            submissions: None,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = create_test_config();
        config.crawler.max_concurrent_fetches = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let mut config = create_test_config();
        config
            .output
            .columns
            .push(ColumnSpec::new(Field::Title, "Again"));
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_quote_delimiter() {
        let mut config = create_test_config();
        config.output.delimiter = '"';
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_line_break_delimiters() {
        let mut config = create_test_config();
        for delimiter in ['\n', '\r'] {
            config.output.delimiter = delimiter;
            assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
        }
        config.output.delimiter = ',';
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_depth_three_requires_second_level() {
        let mut config = create_test_config();
        config.site.depth = 3;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_seed_and_pages() {
        let mut config = create_test_config();
        config.site.pages = Some(PageRange {
            url_template: "https://news.example.com/{id}".to_string(),
            start: 1,
            end: 2,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_page_range_needs_placeholder() {
        let mut config = create_test_config();
        config.site.seeds.clear();
        config.site.depth = 1;
        config.site.pages = Some(PageRange {
            url_template: "https://news.example.com/material".to_string(),
            start: 1,
            end: 2,
        });
        assert!(validate(&config).is_err());

        config.site.pages = Some(PageRange {
            url_template: "https://news.example.com/material/{id}".to_string(),
            start: 1,
            end: 2,
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_relative_seed() {
        let mut config = create_test_config();
        config.site.seeds[0].url = "/RUFANT/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_invalid_selector() {
        let mut config = create_test_config();
        config.site.content.body_selectors = vec![BodySelector::first("div[")];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_link_catalog_rules() {
        let mut config = create_test_config();
        config.site.emit_links = true;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.output.columns = vec![
            ColumnSpec::new(Field::Section, "Раздел"),
            ColumnSpec::new(Field::Title, "Название"),
            ColumnSpec::new(Field::Url, "Ссылка"),
        ];
        assert!(validate(&config).is_ok());

        config.site.depth = 1;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        let mut config = create_test_config();
        config.http.fallback_encoding = "not-an-encoding".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownEncoding(_))
        ));
    }
}
