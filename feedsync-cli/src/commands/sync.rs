use anyhow::Result;
use chrono::Utc;
use feedsync_core::config::Settings;
use feedsync_core::sync::sync_feed;

use crate::feed::fetch_feed;
use crate::render::{Render, RenderDetails};
use crate::utils::tui;

pub async fn run(
    settings: &Settings,
    from: Option<&str>,
    to: Option<&str>,
    strict: bool,
) -> Result<()> {
    let mut options = settings.sync_options(Utc::now())?;
    options.window = options.window.with_args(from, to)?;
    options.strict |= strict;

    let store = super::caldav_store(settings)?;

    let spinner = tui::create_spinner("Fetching feed".to_string());
    let feed = fetch_feed(&settings.ics_url).await;
    spinner.finish_and_clear();
    let feed = feed?;

    let report = sync_feed(&store, &feed, &options).await?;

    for line in report.render_details() {
        println!("{}", line);
    }
    println!("{}", report.render());

    Ok(())
}
