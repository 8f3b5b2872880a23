//! Fetch scheduling: global concurrency and per-host politeness
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host request spacing and request counting
//!
//! Ordering of the work itself belongs to the coordinator; the scheduler only
//! decides when a fetch may start.

use crate::config::CrawlerConfig;
use crate::state::HostState;
use crate::url::host_key;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Permission to issue one request
///
/// The global slot is released when this value is dropped.
pub struct ScheduledFetch {
    pub _permit: OwnedSemaphorePermit,
}

/// Gates fetches on a global permit and the target host's spacing
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    permits: Arc<Semaphore>,

    /// Per-host state, keyed by `host[:port]`
    hosts: Mutex<HashMap<String, HostState>>,

    /// Minimum time between request starts on one host
    delay: Duration,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration (concurrency and delay)
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1) as usize)),
            hosts: Mutex::new(HashMap::new()),
            delay: config.delay(),
        }
    }

    /// Waits until a request to `url` may start
    ///
    /// This method:
    /// 1. Acquires a global permit
    /// 2. Reserves the next slot for the URL's host
    /// 3. Sleeps until that slot
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledFetch)` - The request may start now
    /// * `None` - The scheduler was closed
    pub async fn schedule(&self, url: &Url) -> Option<ScheduledFetch> {
        let permit = self.permits.clone().acquire_owned().await.ok()?;

        let wait = self.reserve(url);
        if !wait.is_zero() {
            tracing::trace!("Waiting {:?} before requesting {}", wait, url);
            tokio::time::sleep(wait).await;
        }

        Some(ScheduledFetch { _permit: permit })
    }

    fn reserve(&self, url: &Url) -> Duration {
        let key = host_key(url).unwrap_or_default();
        let now = Instant::now();

        match self.hosts.lock() {
            Ok(mut hosts) => hosts
                .entry(key)
                .or_insert_with(HostState::new)
                .reserve_slot(now, self.delay),
            // A poisoned map only loses accounting; keep the spacing
            Err(poisoned) => poisoned
                .into_inner()
                .entry(key)
                .or_insert_with(HostState::new)
                .reserve_slot(now, self.delay),
        }
    }

    /// Stops handing out permits; pending and future `schedule` calls return `None`
    pub fn close(&self) {
        self.permits.close();
    }

    /// Number of requests scheduled for a host so far
    pub fn request_count(&self, host: &str) -> u32 {
        self.hosts
            .lock()
            .ok()
            .and_then(|hosts| hosts.get(host).map(|state| state.request_count))
            .unwrap_or(0)
    }

    /// Returns the number of free global permits
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
