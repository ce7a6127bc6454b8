//! Core of the feedsync tool.
//!
//! Mirrors a read-only ICS feed into a remote calendar:
//! - `ics` parses feeds into `EventDefinition`s and renders instances back to ICS
//! - `recurrence` expands definitions into concrete `EventInstance`s within a `SyncWindow`
//! - `sync` builds the existing-event index and reconciles instances against it
//! - `erase` clears the target calendar
//!
//! The remote calendar itself is reached through the `RemoteStore` trait.

pub mod config;
pub mod erase;
pub mod error;
pub mod event;
pub mod ics;
pub mod recurrence;
pub mod remote;
pub mod sync;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FeedSyncError, FeedSyncResult};
pub use event::{EventDefinition, EventInstance, Fingerprint};
pub use remote::{CalendarHandle, RemoteEvent, RemoteStore};
pub use window::SyncWindow;
