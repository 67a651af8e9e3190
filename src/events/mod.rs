//! Diablo IV world events integration and API client.
//!
//! This module fetches the recurring world events (world boss, Legion,
//! Helltide) from the third-party events API and exposes them as typed
//! snapshots for the alert scheduler.
//!
//! # Modules
//!
//! - `requester` - HTTP client for the events API
//! - `response_structs` - Internal data structures for API responses
//! - `structs` - Public data structures representing events and snapshots
//!
//! # Examples
//!
//! ```no_run
//! use crate::events::{EventRequester, EventsRequester};
//!
//! let requester = EventsRequester::new("https://d4armory.io/api/events/recent");
//! let snapshot = requester.fetch().await?;
//! ```

mod requester;
mod response_structs;
mod structs;

#[cfg(test)]
pub use crate::events::requester::MockEventRequester;
pub use crate::events::requester::{EventRequester, EventsRequester};
#[cfg(test)]
pub(crate) use crate::events::structs::tests::create_test_snapshot;
pub use crate::events::structs::{EventKind, EventSnapshot};

use thiserror::Error;

/// Errors that can occur while fetching events.
///
/// Every variant means "no update this cycle": the caller keeps the snapshot
/// it already has.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The payload does not match the expected schema.
    #[error("invalid events payload: {0}")]
    Schema(#[from] serde_json::Error),
}
