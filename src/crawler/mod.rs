//! Crawler module for fetching pages and driving a run
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with failure classification
//! - Request scheduling and per-host politeness
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchResult, FetchStatus, Fetcher};
pub use scheduler::{ScheduledFetch, Scheduler};

use crate::config::Config;
use crate::output::RunStats;
use crate::Result;

/// Runs a complete harvest writing to the configured output file
///
/// This is the main entry point for a run. It will:
/// 1. Open the output and compile the extraction rules
/// 2. Fetch seeds (or the page range) and discover links level by level
/// 3. Extract, sanitize and write one record per leaf page
/// 4. Return the run statistics
pub async fn harvest(config: Config) -> Result<RunStats> {
    Coordinator::new(config)?.run().await
}
