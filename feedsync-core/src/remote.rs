//! The remote calendar store the engine syncs into.
//!
//! The engine only ever talks to the store through `RemoteStore`; the CalDAV
//! implementation lives in `feedsync-caldav`.

use std::fmt;

use crate::error::FeedSyncResult;
use crate::event::EventInstance;
use crate::window::SyncWindow;

/// A calendar on the remote store, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarHandle {
    pub name: String,
    /// Collection URL (or any store-specific locator)
    pub url: String,
}

impl fmt::Display for CalendarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// A raw event record as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    /// Resource locator, used for deletion
    pub href: String,
    pub etag: Option<String>,
    /// Calendar data (a VCALENDAR document)
    pub data: String,
}

/// Operations the sync engine and the bulk eraser need from a remote store.
///
/// Calls are awaited one at a time; implementations need not be `Sync`.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Resolve a calendar by display name.
    /// Fails with `CalendarNotFound` when nothing matches.
    async fn find_calendar(&self, name: &str) -> FeedSyncResult<CalendarHandle>;

    /// Events overlapping `window`. Fails with `RemoteQuery`.
    async fn query_events(
        &self,
        calendar: &CalendarHandle,
        window: &SyncWindow,
    ) -> FeedSyncResult<Vec<RemoteEvent>>;

    /// Every event in the calendar. Fails with `RemoteQuery`.
    async fn list_events(&self, calendar: &CalendarHandle) -> FeedSyncResult<Vec<RemoteEvent>>;

    /// Write one instance. Fails with `RemoteWrite`.
    async fn create_event(
        &self,
        calendar: &CalendarHandle,
        instance: &EventInstance,
    ) -> FeedSyncResult<()>;

    /// Delete one event. Fails with `RemoteWrite`.
    async fn delete_event(&self, calendar: &CalendarHandle, event: &RemoteEvent)
    -> FeedSyncResult<()>;
}
