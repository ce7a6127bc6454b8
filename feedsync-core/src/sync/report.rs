use std::fmt;

use crate::error::FeedSyncError;

/// Outcome of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Feed definitions that could not be parsed or expanded
    pub rejected: Vec<FeedSyncError>,
    /// Write failures, in the order they happened
    pub failures: Vec<FeedSyncError>,
}

impl SyncReport {
    /// Whether anything went wrong, even if the run completed.
    pub fn has_problems(&self) -> bool {
        self.failed > 0 || !self.rejected.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} skipped={} failed={}",
            self.created, self.skipped, self.failed
        )
    }
}
