//! Bulk clearing of the target calendar.

use std::fmt;

use tracing::{info, warn};

use crate::error::{FeedSyncError, FeedSyncResult};
use crate::remote::{CalendarHandle, RemoteStore};

/// Outcome of a bulk delete.
#[derive(Debug, Default)]
pub struct EraseReport {
    pub deleted: usize,
    pub failed: usize,
    pub failures: Vec<FeedSyncError>,
}

impl EraseReport {
    /// Whether any delete failed.
    pub fn has_problems(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for EraseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deleted={} failed={}", self.deleted, self.failed)
    }
}

/// Delete every event in `calendar`.
///
/// `authorized` is the caller's confirmation; nothing is listed or deleted
/// without it. Listing failures are fatal, individual delete failures are
/// recorded and the remaining events are still deleted.
pub async fn erase_all<S: RemoteStore>(
    store: &S,
    calendar: &CalendarHandle,
    authorized: bool,
) -> FeedSyncResult<EraseReport> {
    if !authorized {
        return Err(FeedSyncError::EraseNotAuthorized);
    }

    let events = store.list_events(calendar).await?;
    info!(calendar = %calendar.name, count = events.len(), "Deleting all events");

    let mut report = EraseReport::default();

    for event in &events {
        match store.delete_event(calendar, event).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(href = %event.href, "{}", e);
                report.failed += 1;
                report.failures.push(e);
            }
        }
    }

    Ok(report)
}
