//! Run statistics
//!
//! Counters are updated by the coordinator as pages finish and printed once
//! the run ends.

use crate::state::PageOutcome;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counters for one run
#[derive(Debug, Clone)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Requests that returned a response body
    pub pages_fetched: u64,

    /// Links returned by discovery, before deduplication against the run
    pub links_discovered: u64,

    /// Final outcome of every URL the run touched
    pub outcomes: HashMap<PageOutcome, u64>,

    /// Whether the run was stopped by cancellation or the record cap
    pub stopped_early: bool,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_fetched: 0,
            links_discovered: 0,
            outcomes: HashMap::new(),
            stopped_early: false,
        }
    }

    pub fn record(&mut self, outcome: PageOutcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    pub fn count(&self, outcome: PageOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn records_written(&self) -> u64 {
        self.count(PageOutcome::Emitted)
    }

    pub fn records_dropped(&self) -> u64 {
        self.count(PageOutcome::EmptyBody)
            + self.count(PageOutcome::Incomplete)
            + self.count(PageOutcome::LimitReached)
    }

    pub fn duplicates_skipped(&self) -> u64 {
        self.count(PageOutcome::Duplicate)
    }

    /// Total fetch failures of every kind
    pub fn failures(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(outcome, _)| outcome.is_error())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in seconds, if the run has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStats) {
    println!("=== Run Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Pages fetched: {}", stats.pages_fetched);
    println!("  Links discovered: {}", stats.links_discovered);
    println!("  Records written: {}", stats.records_written());
    println!("  Records dropped: {}", stats.records_dropped());
    println!("  Duplicates skipped: {}", stats.duplicates_skipped());
    if stats.stopped_early {
        println!("  Stopped early: yes");
    }
    println!();

    println!("Pages by Outcome:");
    let mut outcome_counts: Vec<_> = stats.outcomes.iter().collect();
    outcome_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    for (outcome, count) in outcome_counts {
        println!("  {}: {}", outcome, count);
    }
    println!();

    let failures = stats.failures();
    if failures > 0 {
        println!("Failures ({}):", failures);
        for outcome in PageOutcome::all().iter().filter(|o| o.is_error()) {
            let count = stats.count(*outcome);
            if count > 0 {
                println!("  {}: {}", outcome, count);
            }
        }
    }
}
