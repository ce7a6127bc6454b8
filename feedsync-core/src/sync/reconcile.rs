//! Decides which instances to write and writes them.

use tracing::{debug, info, warn};

use crate::event::EventInstance;
use crate::remote::{CalendarHandle, RemoteStore};
use crate::sync::{EventIndex, SyncReport};

/// Create every instance the index doesn't know about.
///
/// Each fingerprint is claimed in the index before its write is attempted, so
/// at most one create is issued per fingerprint per run even when the write
/// fails. A failed write is recorded and the loop moves on.
pub async fn reconcile<S: RemoteStore>(
    store: &S,
    calendar: &CalendarHandle,
    instances: &[EventInstance],
    index: &mut EventIndex,
) -> SyncReport {
    let mut report = SyncReport::default();

    for instance in instances {
        if !index.insert(instance.fingerprint()) {
            debug!(
                summary = %instance.summary,
                start = %instance.start,
                "Already on remote, skipping"
            );
            report.skipped += 1;
            continue;
        }

        match store.create_event(calendar, instance).await {
            Ok(()) => {
                info!(summary = %instance.summary, start = %instance.start, "Created event");
                report.created += 1;
            }
            Err(e) => {
                warn!(summary = %instance.summary, start = %instance.start, "{}", e);
                report.failed += 1;
                report.failures.push(e);
            }
        }
    }

    report
}
