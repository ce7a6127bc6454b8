//! Error types for feedsync.

use thiserror::Error;

/// Errors that can occur while syncing a feed into a remote calendar.
#[derive(Error, Debug)]
pub enum FeedSyncError {
    #[error("Could not fetch feed: {0}")]
    Fetch(String),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid recurrence for '{summary}' starting {start}: {message}")]
    Recurrence {
        summary: String,
        start: String,
        message: String,
    },

    #[error("Invalid event '{summary}': {message}")]
    InvalidEvent { summary: String, message: String },

    #[error("Could not read remote calendar: {0}")]
    RemoteQuery(String),

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bulk delete was not confirmed")]
    EraseNotAuthorized,
}

/// Result type alias for feedsync operations.
pub type FeedSyncResult<T> = Result<T, FeedSyncError>;
