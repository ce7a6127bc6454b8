//! Event types flowing through the sync engine.
//!
//! `EventDefinition`s come out of the feed parser (possibly recurring),
//! `EventInstance`s come out of the expander (always concrete), and
//! `Fingerprint`s are what duplicate detection compares.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::FeedSyncError;
use crate::recurrence::RecurrenceRule;

/// Summary used when a feed event has none.
pub const DEFAULT_SUMMARY: &str = "No Title";

/// A calendar event as defined in the feed. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    /// UID from the feed, if any
    pub uid: Option<String>,
    pub summary: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Start and end are dates (midnight in the event's zone), not times
    pub all_day: bool,
    /// `None` for non-repeating events, always has a frequency otherwise
    pub recurrence: Option<RecurrenceRule>,
    /// Excluded occurrence starts (EXDATE and overridden instances)
    pub exceptions: BTreeSet<DateTime<Utc>>,
    /// Set when this definition overrides one occurrence of a recurring series
    pub recurrence_id: Option<DateTime<Utc>>,
}

impl EventDefinition {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Build a `FeedSyncError::Recurrence` naming this definition.
    pub fn recurrence_error(&self, message: impl Into<String>) -> FeedSyncError {
        FeedSyncError::Recurrence {
            summary: self.summary.clone(),
            start: self.start.to_rfc3339(),
            message: message.into(),
        }
    }

    /// The definition's own time span as a concrete instance.
    pub fn as_instance(&self) -> EventInstance {
        EventInstance {
            uid: self.uid.clone(),
            summary: self.summary.clone(),
            start: self.start,
            end: self.end,
            all_day: self.all_day,
            occurrence: false,
            recurrence_id: self.recurrence_id,
        }
    }
}

/// One concrete occurrence.
///
/// Instances are value objects: equality is fingerprint equality, so two
/// instances with the same summary, start and end are the same instance
/// regardless of which definition produced them.
#[derive(Debug, Clone)]
pub struct EventInstance {
    /// UID of the originating definition
    pub uid: Option<String>,
    pub summary: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub all_day: bool,
    /// Produced by expanding a recurrence rule
    pub occurrence: bool,
    /// Original start of the series occurrence this instance overrides
    pub recurrence_id: Option<DateTime<Utc>>,
}

impl EventInstance {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.summary, &self.start, &self.end)
    }

    /// UID to write to the remote calendar.
    ///
    /// Occurrences and overrides share their series UID in the feed, so the
    /// occurrence instant is appended to keep them distinct once flattened.
    /// Overrides use their RECURRENCE-ID, which the series never produces.
    pub fn remote_uid(&self) -> String {
        let Some(uid) = &self.uid else {
            return uuid::Uuid::new_v4().to_string();
        };
        match (self.recurrence_id, self.occurrence) {
            (Some(original), _) => format!("{}-{}", uid, original.format("%Y%m%dT%H%M%SZ")),
            (None, true) => format!(
                "{}-{}",
                uid,
                self.start.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ")
            ),
            (None, false) => uid.clone(),
        }
    }
}

impl PartialEq for EventInstance {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

impl Eq for EventInstance {}

impl fmt::Display for EventInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.summary, self.start.format("%Y-%m-%d %H:%M %Z"))
    }
}

/// Duplicate-detection key: exact summary plus start and end in UTC at second
/// resolution.
///
/// Distinct events with the same title and timing collide on this key; that is
/// the accepted contract for deciding whether an instance already exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Fingerprint {
    pub fn new<Z: TimeZone>(summary: &str, start: &DateTime<Z>, end: &DateTime<Z>) -> Self {
        Fingerprint {
            summary: summary.to_string(),
            start: start.with_timezone(&Utc).trunc_subsecs(0),
            end: end.with_timezone(&Utc).trunc_subsecs(0),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} - {})",
            self.summary,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}
