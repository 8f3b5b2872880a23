//! Configuration module for Text-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use text_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Delay between requests: {}ms", config.crawler.delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BodySelector, ColumnSpec, Config, ContentConfig, CrawlerConfig, DiscoveryRule, Field,
    HttpConfig, OutputConfig, PageRange, SeedEntry, SiteConfig, SubmissionsConfig, TitleSource,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
