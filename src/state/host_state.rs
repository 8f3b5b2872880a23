use std::time::{Duration, Instant};

/// Per-host request accounting
///
/// Requests to one host are spaced at least `delay` apart, measured from the
/// start of one request to the start of the next. Hosts do not affect each
/// other.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests made to this host in the current run
    pub request_count: u32,

    /// Start time reserved for the most recent request
    pub last_request_time: Option<Instant>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request slot and returns how long to wait for it
    ///
    /// The slot is recorded immediately, so concurrent callers holding the
    /// host lock in turn get consecutive slots instead of the same one.
    ///
    /// # Arguments
    ///
    /// * `now` - The current time instant
    /// * `delay` - Minimum spacing between request starts
    pub fn reserve_slot(&mut self, now: Instant, delay: Duration) -> Duration {
        let slot = match self.last_request_time {
            Some(last) => (last + delay).max(now),
            None => now,
        };

        self.request_count += 1;
        self.last_request_time = Some(slot);
        slot.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_immediate() {
        let mut state = HostState::new();
        let now = Instant::now();
        assert_eq!(state.reserve_slot(now, Duration::from_millis(200)), Duration::ZERO);
        assert_eq!(state.request_count, 1);
    }

    #[test]
    fn test_consecutive_slots_are_spaced() {
        let mut state = HostState::new();
        let now = Instant::now();
        let delay = Duration::from_millis(200);

        assert_eq!(state.reserve_slot(now, delay), Duration::ZERO);
        assert_eq!(state.reserve_slot(now, delay), delay);
        assert_eq!(state.reserve_slot(now, delay), delay * 2);
        assert_eq!(state.request_count, 3);
    }

    #[test]
    fn test_no_wait_after_delay_elapsed() {
        let mut state = HostState::new();
        let start = Instant::now();
        let delay = Duration::from_millis(100);

        state.reserve_slot(start, delay);
        let later = start + Duration::from_millis(150);
        assert_eq!(state.reserve_slot(later, delay), Duration::ZERO);
    }
}
