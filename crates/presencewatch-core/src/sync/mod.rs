//! Live presence synchronization.
//!
//! `LiveDataSync` owns the fetch, validate, cache and render pipeline for
//! the presence widget: retries with proxy rotation, falls back to cached or
//! placeholder data, and refreshes on a cadence that follows visibility.

pub mod clock;
pub mod engine;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Collaborators, FetchOutcome, FallbackSource, LiveDataSync, SkipReason};
pub use state::{ConnectionStatus, SyncState};
