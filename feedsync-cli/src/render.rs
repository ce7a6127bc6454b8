//! Colored terminal rendering for feedsync-core types.
//!
//! Everything here is printed to stdout, so colors are applied only when
//! stdout supports them.

use feedsync_core::erase::EraseReport;
use feedsync_core::sync::SyncReport;
use feedsync_core::{CalendarHandle, FeedSyncError};
use owo_colors::{OwoColorize, Stream::Stdout};

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarHandle {
    fn render(&self) -> String {
        format!(
            "{} {}",
            self.name.if_supports_color(Stdout, |t| t.bold()),
            self.url.if_supports_color(Stdout, |t| t.dimmed())
        )
    }
}

impl Render for FeedSyncError {
    fn render(&self) -> String {
        format!("   {}", self.to_string().if_supports_color(Stdout, |t| t.red()))
    }
}

/// The summary line: green for a clean run, yellow when something was skipped or failed.
impl Render for SyncReport {
    fn render(&self) -> String {
        let line = self.to_string();
        if self.has_problems() {
            line.if_supports_color(Stdout, |t| t.yellow()).to_string()
        } else {
            line.if_supports_color(Stdout, |t| t.green()).to_string()
        }
    }
}

impl Render for EraseReport {
    fn render(&self) -> String {
        let line = self.to_string();
        if self.has_problems() {
            line.if_supports_color(Stdout, |t| t.yellow()).to_string()
        } else {
            line.if_supports_color(Stdout, |t| t.green()).to_string()
        }
    }
}

/// Per-item problems shown above the summary line.
pub trait RenderDetails {
    fn render_details(&self) -> Vec<String>;
}

impl RenderDetails for SyncReport {
    fn render_details(&self) -> Vec<String> {
        if !self.has_problems() {
            return Vec::new();
        }

        let mut lines = Vec::new();
        if !self.rejected.is_empty() {
            let heading = format!("Skipped {} unreadable feed events:", self.rejected.len());
            lines.push(heading.if_supports_color(Stdout, |t| t.yellow()).to_string());
            lines.extend(self.rejected.iter().map(|e| {
                format!("   {}", e.to_string().if_supports_color(Stdout, |t| t.yellow()))
            }));
        }
        if !self.failures.is_empty() {
            let heading = format!("{} events could not be created:", self.failures.len());
            lines.push(heading.if_supports_color(Stdout, |t| t.red()).to_string());
            lines.extend(self.failures.iter().map(Render::render));
        }

        lines
    }
}

impl RenderDetails for EraseReport {
    fn render_details(&self) -> Vec<String> {
        if !self.has_problems() {
            return Vec::new();
        }

        let heading = format!("{} events could not be deleted:", self.failures.len());
        let mut lines = vec![heading.if_supports_color(Stdout, |t| t.red()).to_string()];
        lines.extend(self.failures.iter().map(Render::render));
        lines
    }
}
