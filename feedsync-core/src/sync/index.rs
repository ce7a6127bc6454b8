//! Snapshot of what the remote calendar already holds.

use std::collections::HashSet;

use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::FeedSyncResult;
use crate::event::Fingerprint;
use crate::ics::parse_feed;
use crate::recurrence::expand;
use crate::remote::{CalendarHandle, RemoteEvent, RemoteStore};
use crate::window::SyncWindow;

/// Fingerprints of the remote events overlapping the sync window.
///
/// Built once per run, before any writes. The reconciler adds the fingerprint
/// of everything it writes so one run never writes the same instance twice.
#[derive(Debug, Default, Clone)]
pub struct EventIndex {
    fingerprints: HashSet<Fingerprint>,
}

impl EventIndex {
    /// Query the store and index every event overlapping `window`.
    ///
    /// A failed query is returned as is (`RemoteQuery`): without a complete
    /// picture of the remote state the run would create duplicates.
    pub async fn build<S: RemoteStore>(
        store: &S,
        calendar: &CalendarHandle,
        window: &SyncWindow,
        default_tz: Tz,
    ) -> FeedSyncResult<Self> {
        let records = store.query_events(calendar, window).await?;
        let index = Self::from_records(&records, window, default_tz);

        debug!(
            calendar = %calendar.name,
            records = records.len(),
            fingerprints = index.len(),
            "Built existing-event index"
        );

        Ok(index)
    }

    /// Index raw remote records. Recurring masters contribute one fingerprint
    /// per occurrence inside the window; unparseable records are skipped.
    pub fn from_records(records: &[RemoteEvent], window: &SyncWindow, default_tz: Tz) -> Self {
        let mut index = EventIndex::default();

        for record in records {
            let parsed = match parse_feed(&record.data, default_tz) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(href = %record.href, "Ignoring unreadable remote event: {}", e);
                    continue;
                }
            };

            for rejected in &parsed.rejected {
                warn!(href = %record.href, "Ignoring remote event: {}", rejected);
            }

            for definition in &parsed.definitions {
                match expand(definition, window) {
                    Ok(instances) => {
                        for instance in instances {
                            index.insert(instance.fingerprint());
                        }
                    }
                    Err(e) => warn!(href = %record.href, "Ignoring remote event: {}", e),
                }
            }
        }

        index
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Returns `false` if the fingerprint was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.fingerprints.insert(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl FromIterator<Fingerprint> for EventIndex {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        EventIndex {
            fingerprints: iter.into_iter().collect(),
        }
    }
}
