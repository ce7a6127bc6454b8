//! Feed download.

use feedsync_core::{FeedSyncError, FeedSyncResult};
use tracing::debug;

/// GET the feed body. Any transport failure or non-2xx status is a `Fetch` error.
pub async fn fetch_feed(url: &str) -> FeedSyncResult<String> {
    let url = normalize_url(url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| FeedSyncError::Fetch(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedSyncError::Fetch(format!("{} returned status {}", url, status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FeedSyncError::Fetch(format!("{}: {}", url, e)))?;

    debug!(url = %url, bytes = body.len(), "Fetched feed");
    Ok(body)
}

/// `webcal://` is an alias for `https://` used by calendar subscription links.
fn normalize_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}
