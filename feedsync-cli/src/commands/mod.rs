pub mod delete;
pub mod sync;

use anyhow::Result;
use feedsync_caldav::{CalDavConfig, CalDavStore};
use feedsync_core::config::Settings;

/// CalDAV store for the configured server.
fn caldav_store(settings: &Settings) -> Result<CalDavStore> {
    let config = CalDavConfig {
        url: settings.caldav_url.clone(),
        username: settings.username.clone(),
        password: settings.password.clone(),
    };

    CalDavStore::new(&config, settings.render_options())
}
