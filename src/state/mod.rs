//! State tracked while a run is in progress
//!
//! # Components
//!
//! - `PageOutcome`: what happened to one fetched URL (emitted, dropped, failed)
//! - `HostState`: per-host request accounting used for politeness delays

mod host_state;
mod page_state;

pub use host_state::HostState;
pub use page_state::PageOutcome;
