//! Settings for a feedsync run.
//!
//! Read once at startup from a config file plus `FEEDSYNC_*` environment
//! variables, then handed to the engine as plain values.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;

use crate::error::{FeedSyncError, FeedSyncResult};
use crate::ics::RenderOptions;
use crate::sync::SyncOptions;
use crate::window::SyncWindow;

/// Environment variable prefix, e.g. `FEEDSYNC_PASSWORD`.
pub const ENV_PREFIX: &str = "FEEDSYNC";

/// Table the settings may be nested under.
const SECTION: &str = "calendar";

#[derive(Debug, Clone)]
pub struct Settings {
    pub ics_url: String,
    pub caldav_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub target_calendar_name: String,
    /// Zone for floating/all-day feed times and for written events
    pub timezone: Tz,
    pub transparent: bool,
    pub past_days: Option<i64>,
    pub future_days: Option<i64>,
    pub strict: bool,
}

impl Settings {
    /// ~/.config/feedsync/config.toml
    pub fn default_path() -> FeedSyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FeedSyncError::Config("Could not determine config directory".into()))?
            .join("feedsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` (or the default path) and the environment.
    ///
    /// The file is optional when every required value comes from the environment.
    pub fn load(path: Option<&Path>) -> FeedSyncResult<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()),
            None => Self::default_path()?,
        };

        let config = Config::builder()
            .add_source(File::from(path.as_path()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| FeedSyncError::Config(e.to_string()))?;

        Self::from_config(&config).map_err(|e| match e {
            FeedSyncError::Config(msg) => {
                FeedSyncError::Config(format!("{} (config file: {})", msg, path.display()))
            }
            other => other,
        })
    }

    fn from_config(config: &Config) -> FeedSyncResult<Self> {
        let timezone = match lookup::<String>(config, "timezone")? {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| FeedSyncError::Config(format!("Unknown timezone '{}'", name)))?,
            None => Tz::UTC,
        };

        Ok(Settings {
            ics_url: required(config, "ics_url")?,
            caldav_url: required(config, "caldav_url")?,
            username: lookup(config, "username")?,
            password: lookup(config, "password")?,
            target_calendar_name: required(config, "target_calendar_name")?,
            timezone,
            transparent: lookup(config, "transparent")?.unwrap_or(true),
            past_days: lookup(config, "past_days")?,
            future_days: lookup(config, "future_days")?,
            strict: lookup(config, "strict")?.unwrap_or(false),
        })
    }

    pub fn window(&self, now: DateTime<Utc>) -> FeedSyncResult<SyncWindow> {
        SyncWindow::with_days(now, self.past_days, self.future_days)
    }

    pub fn sync_options(&self, now: DateTime<Utc>) -> FeedSyncResult<SyncOptions> {
        Ok(SyncOptions {
            calendar_name: self.target_calendar_name.clone(),
            window: self.window(now)?,
            timezone: self.timezone,
            strict: self.strict,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            timezone: Some(self.timezone),
            transparent: self.transparent,
        }
    }
}

/// Find `key` at top level or under `[calendar]`, in lower or upper case.
/// Top-level keys win so environment overrides apply to either layout.
fn lookup<T: DeserializeOwned>(config: &Config, key: &str) -> FeedSyncResult<Option<T>> {
    let upper = key.to_uppercase();
    let candidates = [
        key.to_string(),
        upper.clone(),
        format!("{}.{}", SECTION, key),
        format!("{}.{}", SECTION, upper),
    ];

    for candidate in &candidates {
        match config.get::<T>(candidate) {
            Ok(value) => return Ok(Some(value)),
            Err(ConfigError::NotFound(_)) => continue,
            Err(e) => return Err(FeedSyncError::Config(format!("Invalid '{}': {}", key, e))),
        }
    }

    Ok(None)
}

fn required(config: &Config, key: &str) -> FeedSyncResult<String> {
    lookup::<String>(config, key)?
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FeedSyncError::Config(format!("Missing required setting '{}'", key)))
}
