//! `RemoteStore` over CalDAV.

use anyhow::{Context, Result};
use feedsync_core::ics::{RenderOptions, generate_instance};
use feedsync_core::{
    CalendarHandle, EventInstance, FeedSyncError, FeedSyncResult, RemoteEvent, RemoteStore,
    SyncWindow,
};
use tracing::debug;
use url::Url;

use crate::client::{CalDavClient, CalDavConfig};
use crate::discovery::{discover_calendars, select_calendar};
use crate::xml::parse_event_resources;

pub struct CalDavStore {
    client: CalDavClient,
    render: RenderOptions,
}

impl CalDavStore {
    pub fn new(config: &CalDavConfig, render: RenderOptions) -> Result<Self> {
        Ok(CalDavStore {
            client: CalDavClient::new(config)?,
            render,
        })
    }

    async fn fetch_events(
        &self,
        calendar: &CalendarHandle,
        window: Option<&SyncWindow>,
    ) -> Result<Vec<RemoteEvent>> {
        let url = collection_url(calendar)?;
        let response = self.client.report(&url, &calendar_query(window)).await?;

        let events: Vec<RemoteEvent> = parse_event_resources(&response.body)?
            .into_iter()
            .map(|r| RemoteEvent {
                href: r.href,
                etag: r.etag,
                data: r.data,
            })
            .collect();

        debug!(calendar = %calendar.name, count = events.len(), "Fetched remote events");
        Ok(events)
    }
}

impl RemoteStore for CalDavStore {
    async fn find_calendar(&self, name: &str) -> FeedSyncResult<CalendarHandle> {
        let calendars = discover_calendars(&self.client)
            .await
            .map_err(|e| FeedSyncError::RemoteQuery(format!("{:#}", e)))?;

        select_calendar(&calendars, name)
            .map(|c| CalendarHandle {
                name: c.name.clone(),
                url: c.url.to_string(),
            })
            .ok_or_else(|| FeedSyncError::CalendarNotFound(name.to_string()))
    }

    async fn query_events(
        &self,
        calendar: &CalendarHandle,
        window: &SyncWindow,
    ) -> FeedSyncResult<Vec<RemoteEvent>> {
        self.fetch_events(calendar, Some(window))
            .await
            .map_err(|e| FeedSyncError::RemoteQuery(format!("{:#}", e)))
    }

    async fn list_events(&self, calendar: &CalendarHandle) -> FeedSyncResult<Vec<RemoteEvent>> {
        self.fetch_events(calendar, None)
            .await
            .map_err(|e| FeedSyncError::RemoteQuery(format!("{:#}", e)))
    }

    async fn create_event(
        &self,
        calendar: &CalendarHandle,
        instance: &EventInstance,
    ) -> FeedSyncResult<()> {
        let write = async {
            let url = event_url(calendar, &uuid::Uuid::new_v4().to_string())?;
            let ics = generate_instance(instance, &instance.remote_uid(), &self.render);
            self.client.put_new(&url, ics).await
        };

        write.await.map_err(|e| {
            FeedSyncError::RemoteWrite(format!("Could not create '{}': {:#}", instance, e))
        })
    }

    async fn delete_event(
        &self,
        calendar: &CalendarHandle,
        event: &RemoteEvent,
    ) -> FeedSyncResult<()> {
        let delete = async {
            let url = CalDavClient::resolve(&collection_url(calendar)?, &event.href)?;
            self.client.delete(&url).await
        };

        delete.await.map_err(|e| {
            FeedSyncError::RemoteWrite(format!("Could not delete {}: {:#}", event.href, e))
        })
    }
}

fn collection_url(calendar: &CalendarHandle) -> Result<Url> {
    let mut url = Url::parse(&calendar.url)
        .with_context(|| format!("Invalid calendar URL: {}", calendar.url))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// URL for a new event resource in the calendar.
fn event_url(calendar: &CalendarHandle, name: &str) -> Result<Url> {
    CalDavClient::resolve(&collection_url(calendar)?, &format!("{}.ics", name))
}

/// calendar-query REPORT body, with a VEVENT time-range filter when `window` is set.
fn calendar_query(window: Option<&SyncWindow>) -> String {
    let filter = match window {
        Some(window) => {
            let (start, end) = window.to_caldav_range();
            format!(
                r#"<C:comp-filter name="VEVENT">
                <C:time-range start="{}" end="{}"/>
            </C:comp-filter>"#,
                start, end
            )
        }
        None => r#"<C:comp-filter name="VEVENT"/>"#.to_string(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<C:calendar-query xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <prop>
        <getetag/>
        <C:calendar-data/>
    </prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR">
            {}
        </C:comp-filter>
    </C:filter>
</C:calendar-query>"#,
        filter
    )
}
