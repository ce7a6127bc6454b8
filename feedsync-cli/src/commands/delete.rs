use anyhow::Result;
use dialoguer::Input;
use feedsync_core::config::Settings;
use feedsync_core::erase::erase_all;
use feedsync_core::RemoteStore;
use owo_colors::{OwoColorize, Stream::Stdout};

use crate::render::{Render, RenderDetails};

pub async fn run(settings: &Settings, force: bool) -> Result<()> {
    let store = super::caldav_store(settings)?;
    let calendar = store.find_calendar(&settings.target_calendar_name).await?;

    println!("{}", calendar.render());

    // Confirm unless --force
    if !force {
        println!(
            "{}",
            "This deletes EVERY event in this calendar, not only ones created by feedsync."
                .if_supports_color(Stdout, |t| t.red())
        );
        let answer: String = Input::new()
            .with_prompt("Type YES to continue")
            .allow_empty(true)
            .interact_text()?;

        if answer.trim() != "YES" {
            println!("Delete canceled.");
            return Ok(());
        }
    }

    let report = erase_all(&store, &calendar, true).await?;

    for line in report.render_details() {
        println!("{}", line);
    }
    println!("{}", report.render());

    Ok(())
}
