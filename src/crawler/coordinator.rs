//! Crawl coordinator - main run orchestration logic
//!
//! This module drives one run over the configured site:
//! - Fetching seed and listing pages and discovering their links
//! - Fanning leaf pages out to a bounded pool of fetch tasks
//! - Extracting, sanitizing and writing one record per leaf
//! - Or, for a link catalog, writing the last level's links without fetching
//! - Stopping cleanly on cancellation or when the record cap is reached
//!
//! Discovery of a page always completes before any of its children is
//! fetched. A failed fetch or an empty discovery abandons that branch only.

use crate::config::{Config, SeedEntry};
use crate::crawler::fetcher::{FetchStatus, Fetcher};
use crate::crawler::scheduler::Scheduler;
use crate::extract::{sanitize, ContentExtractor, ExtractedRecord, LinkCandidate, LinkDiscoverer};
use crate::output::{CsvSink, OutputError, RecordSink, RunStats};
use crate::state::PageOutcome;
use crate::url::parse_absolute;
use crate::Result;
use scraper::Html;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A leaf page waiting to be harvested, with the labels it inherits
#[derive(Debug, Clone)]
struct LeafJob {
    url: Url,
    link_text: Option<String>,
    section: Option<String>,
    author: Option<String>,
}

impl LeafJob {
    fn from_candidate(
        candidate: LinkCandidate,
        section: Option<String>,
        author: Option<String>,
    ) -> Option<Self> {
        let url = Url::parse(&candidate.url).ok()?;
        Some(Self {
            url,
            link_text: Some(candidate.text),
            section,
            author,
        })
    }
}

/// State shared between the coordinator and its leaf tasks
struct Shared {
    fetcher: Fetcher,
    scheduler: Scheduler,
    extractor: ContentExtractor,
    sink: Mutex<Box<dyn RecordSink>>,
    visited: Mutex<HashSet<String>>,
    stats: Mutex<RunStats>,
    fatal: Mutex<Option<OutputError>>,
    max_records: Option<u64>,

    /// Cancelled by the caller's token, the record cap or a fatal sink error
    stop: CancellationToken,
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    first_level: Option<LinkDiscoverer>,
    second_level: Option<LinkDiscoverer>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator writing to the configured output file
    ///
    /// # Arguments
    ///
    /// * `config` - The validated run configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Output opened and rules compiled
    /// * `Err(HarvestError)` - The output could not be created or a rule is invalid
    pub fn new(config: Config) -> Result<Self> {
        let sink = CsvSink::from_config(&config.output)?;
        tracing::info!("Writing records to {}", config.output.path);
        Self::with_sink(config, Box::new(sink))
    }

    /// Creates a coordinator writing to an arbitrary sink
    pub fn with_sink(config: Config, sink: Box<dyn RecordSink>) -> Result<Self> {
        let first_level = config
            .site
            .first_level
            .as_ref()
            .map(LinkDiscoverer::from_rule)
            .transpose()?;
        let second_level = config
            .site
            .second_level
            .as_ref()
            .map(LinkDiscoverer::from_rule)
            .transpose()?;

        let cancel = CancellationToken::new();
        let shared = Shared {
            fetcher: Fetcher::new(&config.http, &config.crawler)?,
            scheduler: Scheduler::new(&config.crawler),
            extractor: ContentExtractor::new(&config.site.content)?,
            sink: Mutex::new(sink),
            visited: Mutex::new(HashSet::new()),
            stats: Mutex::new(RunStats::new()),
            fatal: Mutex::new(None),
            max_records: config.crawler.max_records,
            stop: cancel.child_token(),
        };

        Ok(Self {
            config: Arc::new(config),
            first_level,
            second_level,
            shared: Arc::new(shared),
            cancel,
        })
    }

    /// Token that stops the run when cancelled
    ///
    /// Fetches already in flight are abandoned; a record being written is
    /// finished first. The output is closed cleanly either way.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunStats)` - The run finished, was cancelled or hit the record cap
    /// * `Err(HarvestError)` - Writing the output failed
    pub async fn run(self) -> Result<RunStats> {
        let site = &self.config.site;

        if let Some(pages) = &site.pages {
            tracing::info!(
                "Starting run over pages {}..={} of {}",
                pages.start,
                pages.end,
                pages.url_template
            );
            let jobs = pages
                .urls()
                .filter_map(|url| match parse_absolute(&url) {
                    Ok(url) => Some(LeafJob {
                        url,
                        link_text: None,
                        section: None,
                        author: None,
                    }),
                    Err(e) => {
                        tracing::warn!("Skipping generated URL {}: {}", url, e);
                        None
                    }
                })
                .collect();
            self.harvest(jobs).await;
        } else {
            tracing::info!(
                "Starting run: {} seed(s) at depth {}",
                site.seeds.len(),
                site.depth
            );
            for seed in &site.seeds {
                if self.shared.stop.is_cancelled() {
                    break;
                }
                self.crawl_seed(seed).await;
            }
        }

        self.finish()
    }

    async fn crawl_seed(&self, seed: &SeedEntry) {
        let seed_url = match parse_absolute(&seed.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping seed {}: {}", seed.url, e);
                return;
            }
        };
        let section = seed.label.clone();

        if self.config.site.depth <= 1 {
            let job = LeafJob {
                url: seed_url,
                link_text: None,
                section,
                author: None,
            };
            self.harvest(vec![job]).await;
            return;
        }

        let Some(first_level) = &self.first_level else {
            return;
        };
        let links = self.expand(&seed_url, first_level).await;

        if self.config.site.depth == 2 {
            let jobs = links
                .into_iter()
                .filter_map(|c| LeafJob::from_candidate(c, section.clone(), None))
                .collect();
            self.visit_leaves(jobs).await;
            return;
        }

        let Some(second_level) = &self.second_level else {
            return;
        };
        for listing in links {
            if self.shared.stop.is_cancelled() {
                break;
            }
            let Ok(listing_url) = Url::parse(&listing.url) else {
                continue;
            };

            let author = Some(listing.text).filter(|text| !text.is_empty());
            let jobs = self
                .expand(&listing_url, second_level)
                .await
                .into_iter()
                .filter_map(|c| LeafJob::from_candidate(c, section.clone(), author.clone()))
                .collect();
            self.visit_leaves(jobs).await;
        }
    }

    async fn visit_leaves(&self, jobs: Vec<LeafJob>) {
        if self.config.site.emit_links {
            self.catalog(jobs);
        } else {
            self.harvest(jobs).await;
        }
    }

    /// Writes one record per leaf link without fetching the leaf
    ///
    /// The title is the anchor text; leaves that are archives, broken or
    /// empty are listed all the same.
    fn catalog(&self, jobs: Vec<LeafJob>) {
        for job in jobs {
            if self.shared.stop.is_cancelled() {
                self.shared.record(PageOutcome::Cancelled);
                continue;
            }
            if !self.shared.claim(&job.url) {
                self.shared.record(PageOutcome::Duplicate);
                continue;
            }

            let title = job
                .link_text
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| self.config.site.content.untitled.clone());
            let record = ExtractedRecord {
                title,
                body: String::new(),
                source_url: job.url.to_string(),
                section_label: job.section,
                author_label: job.author,
            };

            let outcome = self.shared.emit(&record);
            self.shared.record(outcome);
        }
    }

    /// Fetches a listing page and runs discovery on it
    async fn expand(&self, url: &Url, discoverer: &LinkDiscoverer) -> Vec<LinkCandidate> {
        if !self.shared.claim(url) {
            self.shared.record(PageOutcome::Duplicate);
            return Vec::new();
        }

        let Some(text) = self.shared.fetch_text(url).await else {
            return Vec::new();
        };

        let links = discoverer.discover(&text, url);
        lock(&self.shared.stats).links_discovered += links.len() as u64;

        if links.is_empty() {
            tracing::warn!("No links discovered on {}", url);
            self.shared.record(PageOutcome::NoLinks);
        } else {
            tracing::info!("Discovered {} links on {}", links.len(), url);
            for link in &links {
                tracing::trace!("  {} ({})", link.url, link.text);
            }
            self.shared.record(PageOutcome::Expanded);
        }

        links
    }

    /// Harvests leaf pages on the bounded fetch pool and waits for all of them
    async fn harvest(&self, jobs: Vec<LeafJob>) {
        let mut tasks = JoinSet::new();

        for job in jobs {
            if self.shared.stop.is_cancelled() {
                self.shared.record(PageOutcome::Cancelled);
                continue;
            }
            if !self.shared.claim(&job.url) {
                tracing::debug!("Already visited {}", job.url);
                self.shared.record(PageOutcome::Duplicate);
                continue;
            }

            let shared = Arc::clone(&self.shared);
            tasks.spawn(async move { shared.harvest_leaf(job).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Leaf task failed: {}", e);
            }
        }
    }

    fn finish(self) -> Result<RunStats> {
        let closed = lock(&self.shared.sink).close();

        if let Some(e) = lock(&self.shared.fatal).take() {
            return Err(e.into());
        }
        closed?;

        let mut stats = lock(&self.shared.stats).clone();
        stats.stopped_early = self.shared.stop.is_cancelled();
        stats.finish();

        if self.cancel.is_cancelled() {
            tracing::info!("Run cancelled");
        }
        tracing::info!(
            "Run finished: {} records written, {} dropped, {} failures",
            stats.records_written(),
            stats.records_dropped(),
            stats.failures()
        );

        Ok(stats)
    }
}

impl Shared {
    /// Marks a URL as visited; returns false if it already was
    fn claim(&self, url: &Url) -> bool {
        lock(&self.visited).insert(url.as_str().to_string())
    }

    fn record(&self, outcome: PageOutcome) {
        lock(&self.stats).record(outcome);
    }

    /// Stops the run from inside: no new fetch slots are handed out
    fn halt(&self) {
        self.stop.cancel();
        self.scheduler.close();
    }

    /// Fetches a page once the scheduler allows it
    ///
    /// Failures and cancellation are recorded here; the caller only sees
    /// whether there is text to work with.
    async fn fetch_text(&self, url: &Url) -> Option<String> {
        let slot = tokio::select! {
            _ = self.stop.cancelled() => None,
            slot = self.scheduler.schedule(url) => slot,
        };
        let Some(_slot) = slot else {
            self.record(PageOutcome::Cancelled);
            return None;
        };

        let result = tokio::select! {
            _ = self.stop.cancelled() => {
                self.record(PageOutcome::Cancelled);
                return None;
            }
            result = self.fetcher.fetch(url.as_str()) => result,
        };

        let failure = match &result.status {
            FetchStatus::Ok => None,
            FetchStatus::HttpError(_) => Some(PageOutcome::HttpError),
            FetchStatus::NetworkError(_) => Some(PageOutcome::NetworkError),
            FetchStatus::Timeout => Some(PageOutcome::TimedOut),
        };

        if let Some(encoding) = result.encoding {
            tracing::debug!("Fetched {} ({})", url, encoding);
        }

        match result.into_text() {
            Ok(text) => {
                lock(&self.stats).pages_fetched += 1;
                Some(text)
            }
            Err(e) => {
                tracing::warn!("Skipping page: {}", e);
                self.record(failure.unwrap_or(PageOutcome::NetworkError));
                None
            }
        }
    }

    async fn harvest_leaf(&self, job: LeafJob) {
        let Some(text) = self.fetch_text(&job.url).await else {
            return;
        };

        let outcome = match self.extract_record(&text, &job) {
            Some(record) => self.emit(&record),
            None => {
                tracing::debug!("No body text on {}, dropping", job.url);
                PageOutcome::EmptyBody
            }
        };
        self.record(outcome);
    }

    /// Builds the record for a leaf page, or `None` if its body is empty
    fn extract_record(&self, html: &str, job: &LeafJob) -> Option<ExtractedRecord> {
        let document = Html::parse_document(html);
        let content = self
            .extractor
            .extract(&document, job.link_text.as_deref());

        let body = sanitize(&content.body);
        if body.is_empty() {
            return None;
        }

        Some(ExtractedRecord {
            title: content.title,
            body,
            source_url: job.url.to_string(),
            section_label: job.section.clone(),
            author_label: job.author.clone(),
        })
    }

    /// Writes a record, enforcing the record cap
    fn emit(&self, record: &ExtractedRecord) -> PageOutcome {
        let mut sink = lock(&self.sink);

        if let Some(max) = self.max_records {
            if sink.rows_written() >= max {
                self.halt();
                return PageOutcome::LimitReached;
            }
        }

        match sink.write_record(record) {
            Ok(()) => {
                tracing::debug!("Wrote {} ({})", record.source_url, record.title);
                if let Some(max) = self.max_records {
                    if sink.rows_written() >= max {
                        tracing::info!("Record limit of {} reached, stopping", max);
                        self.halt();
                    }
                }
                PageOutcome::Emitted
            }
            Err(e) if !e.is_fatal() => {
                tracing::warn!("Dropping record: {}", e);
                PageOutcome::Incomplete
            }
            Err(e) => {
                tracing::error!("Output failed, stopping run: {}", e);
                *lock(&self.fatal) = Some(e);
                self.halt();
                PageOutcome::Cancelled
            }
        }
    }
}

/// Locks a mutex, recovering the data if a task panicked while holding it
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
