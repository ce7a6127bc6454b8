//! Calendar discovery.
//!
//! Standard CalDAV flow:
//! 1. PROPFIND the configured URL for `current-user-principal`
//! 2. PROPFIND the principal for `calendar-home-set`
//! 3. Depth 1 PROPFIND on the home to list calendar collections
//!
//! Servers that expose no principal get step 3 on the configured URL itself.

use anyhow::Result;
use tracing::debug;
use url::Url;

use crate::client::CalDavClient;
use crate::xml::{PropertyNs, parse_calendar_collections, parse_href_property};

const PRINCIPAL_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:current-user-principal/>
  </d:prop>
</d:propfind>"#;

const HOME_SET_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-home-set/>
  </d:prop>
</d:propfind>"#;

const CALENDARS_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
  </d:prop>
</d:propfind>"#;

/// A calendar collection on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub name: String,
    pub url: Url,
}

/// List every calendar the configured account can see.
pub async fn discover_calendars(client: &CalDavClient) -> Result<Vec<CalendarEntry>> {
    let base = client.base_url().clone();
    let home = match find_calendar_home(client, &base).await? {
        Some(home) => home,
        None => {
            debug!(url = %base, "No principal exposed, listing configured URL");
            base
        }
    };

    let response = client.propfind(&home, 1, CALENDARS_BODY).await?;
    let mut calendars = Vec::new();

    for collection in parse_calendar_collections(&response.body)? {
        let url = CalDavClient::resolve(&response.url, &collection.href)?;
        let name = collection
            .display_name
            .unwrap_or_else(|| last_segment(&url));
        calendars.push(CalendarEntry { name, url });
    }

    debug!(home = %response.url, count = calendars.len(), "Discovered calendars");
    Ok(calendars)
}

async fn find_calendar_home(client: &CalDavClient, base: &Url) -> Result<Option<Url>> {
    let response = client.propfind(base, 0, PRINCIPAL_BODY).await?;
    let Some(principal) =
        parse_href_property(&response.body, PropertyNs::Dav, "current-user-principal")?
    else {
        return Ok(None);
    };
    let principal = CalDavClient::resolve(&response.url, &principal)?;
    debug!(principal = %principal, "Found principal");

    let response = client.propfind(&principal, 0, HOME_SET_BODY).await?;
    let home = parse_href_property(&response.body, PropertyNs::CalDav, "calendar-home-set")?
        .map(|href| CalDavClient::resolve(&response.url, &href))
        .transpose()?;

    Ok(home)
}

/// Pick the calendar for `name`: an exact display-name match if there is one,
/// else the first case-insensitive exact match, else the first whose name
/// contains `name`.
pub fn select_calendar<'a>(
    calendars: &'a [CalendarEntry],
    name: &str,
) -> Option<&'a CalendarEntry> {
    let wanted = name.to_lowercase();

    calendars
        .iter()
        .find(|c| c.name == name)
        .or_else(|| calendars.iter().find(|c| c.name.to_lowercase() == wanted))
        .or_else(|| {
            calendars
                .iter()
                .find(|c| c.name.to_lowercase().contains(&wanted))
        })
}

fn last_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or_default()
        .to_string()
}
