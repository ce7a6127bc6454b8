//! The sync engine: parse → expand → index → reconcile.

mod index;
mod reconcile;
mod report;

pub use index::EventIndex;
pub use reconcile::reconcile;
pub use report::SyncReport;

use chrono_tz::Tz;
use tracing::info;

use crate::error::FeedSyncResult;
use crate::ics::parse_feed;
use crate::recurrence::expand_all;
use crate::remote::RemoteStore;
use crate::window::SyncWindow;

/// Everything one sync run needs besides the feed and the store.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Display name of the target calendar
    pub calendar_name: String,
    pub window: SyncWindow,
    /// Zone for floating and all-day feed times
    pub timezone: Tz,
    /// Abort before touching the store if any definition was rejected
    pub strict: bool,
}

/// Sync feed content into the store's calendar.
///
/// Fatal errors (unreadable feed, missing calendar, failed index query, and
/// rejected definitions in strict mode) are returned as `Err` before anything
/// is written. Everything after that point lands in the report.
pub async fn sync_feed<S: RemoteStore>(
    store: &S,
    feed: &str,
    options: &SyncOptions,
) -> FeedSyncResult<SyncReport> {
    let parsed = parse_feed(feed, options.timezone)?;
    let expansion = expand_all(&parsed.definitions, &options.window);

    let mut rejected = parsed.rejected;
    rejected.extend(expansion.rejected);

    if options.strict && !rejected.is_empty() {
        return Err(rejected.remove(0));
    }

    info!(
        definitions = parsed.definitions.len(),
        instances = expansion.instances.len(),
        rejected = rejected.len(),
        from = %options.window.from,
        to = %options.window.to,
        "Expanded feed"
    );

    let calendar = store.find_calendar(&options.calendar_name).await?;
    info!(calendar = %calendar, "Using calendar");

    let mut index = EventIndex::build(store, &calendar, &options.window, options.timezone).await?;

    let mut report = reconcile(store, &calendar, &expansion.instances, &mut index).await;
    report.rejected = rejected;

    Ok(report)
}
