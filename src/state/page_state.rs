/// Page outcome definitions for run accounting
///
/// Every URL the run touches ends in exactly one of these outcomes.
use std::fmt;

/// Represents what happened to a page during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    // ===== Success States =====
    /// Leaf page produced a row in the output
    Emitted,

    /// Listing page was fetched and yielded links
    Expanded,

    // ===== Drop States =====
    /// Leaf page had no body text after sanitizing
    EmptyBody,

    /// Record lacked a value for a required output column
    Incomplete,

    /// Listing page yielded no links
    NoLinks,

    /// URL was already visited in this run
    Duplicate,

    /// Record limit reached before the page was written
    LimitReached,

    /// Run was cancelled before the page was fetched
    Cancelled,

    // ===== Error States =====
    /// Server answered with a non-2xx status
    HttpError,

    /// Connection, DNS or TLS failure
    NetworkError,

    /// Request exceeded the configured timeout
    TimedOut,
}

impl PageOutcome {
    /// Returns true if the page did what it was fetched for
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Emitted | Self::Expanded)
    }

    /// Returns true if the page was skipped without a fetch error
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            Self::EmptyBody
                | Self::Incomplete
                | Self::NoLinks
                | Self::Duplicate
                | Self::LimitReached
                | Self::Cancelled
        )
    }

    /// Returns true if fetching the page failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::HttpError | Self::NetworkError | Self::TimedOut)
    }

    /// Stable snake_case name, used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emitted => "emitted",
            Self::Expanded => "expanded",
            Self::EmptyBody => "empty_body",
            Self::Incomplete => "incomplete",
            Self::NoLinks => "no_links",
            Self::Duplicate => "duplicate",
            Self::LimitReached => "limit_reached",
            Self::Cancelled => "cancelled",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
            Self::TimedOut => "timed_out",
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> [Self; 11] {
        [
            Self::Emitted,
            Self::Expanded,
            Self::EmptyBody,
            Self::Incomplete,
            Self::NoLinks,
            Self::Duplicate,
            Self::LimitReached,
            Self::Cancelled,
            Self::HttpError,
            Self::NetworkError,
            Self::TimedOut,
        ]
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
