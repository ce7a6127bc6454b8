//! In-memory `RemoteStore` for engine tests.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{FeedSyncError, FeedSyncResult};
use crate::event::EventInstance;
use crate::ics::{RenderOptions, generate_instance};
use crate::remote::{CalendarHandle, RemoteEvent, RemoteStore};
use crate::window::SyncWindow;

pub const STANDUP_FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:standup@feed\r\n\
SUMMARY:Standup\r\n\
DTSTART:20240102T090000Z\r\n\
DTEND:20240102T091500Z\r\n\
RRULE:FREQ=WEEKLY;COUNT=4\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

pub fn january_2024() -> SyncWindow {
    SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

/// A UTC instance from RFC 3339 timestamps.
pub fn instance(summary: &str, start: &str, end: &str) -> EventInstance {
    let parse = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Tz::UTC)
    };
    EventInstance {
        uid: Some(format!("{}@test", summary.to_lowercase())),
        summary: summary.into(),
        start: parse(start),
        end: parse(end),
        all_day: false,
        occurrence: false,
        recurrence_id: None,
    }
}

/// One calendar held in memory. Failures can be injected per call number.
pub struct MemoryStore {
    handle: CalendarHandle,
    events: RefCell<Vec<RemoteEvent>>,
    created: RefCell<Vec<EventInstance>>,
    next_id: Cell<usize>,
    create_calls: Cell<usize>,
    delete_calls: Cell<usize>,
    query_calls: Cell<usize>,
    fail_create_on: Option<usize>,
    fail_delete_on: Option<usize>,
    fail_queries: bool,
}

impl MemoryStore {
    pub fn new(calendar_name: &str) -> Self {
        MemoryStore {
            handle: CalendarHandle {
                name: calendar_name.into(),
                url: format!("memory://{}/", calendar_name),
            },
            events: RefCell::new(Vec::new()),
            created: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            create_calls: Cell::new(0),
            delete_calls: Cell::new(0),
            query_calls: Cell::new(0),
            fail_create_on: None,
            fail_delete_on: None,
            fail_queries: false,
        }
    }

    /// Fail the create call with this zero-based index.
    pub fn fail_create_on(mut self, call: usize) -> Self {
        self.fail_create_on = Some(call);
        self
    }

    /// Fail the delete call with this zero-based index.
    pub fn fail_delete_on(mut self, call: usize) -> Self {
        self.fail_delete_on = Some(call);
        self
    }

    pub fn fail_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn handle(&self) -> CalendarHandle {
        self.handle.clone()
    }

    /// Put an event on the "server" without going through `create_event`.
    pub fn seed(&self, data: &str) {
        let href = self.next_href();
        self.events.borrow_mut().push(RemoteEvent {
            href,
            etag: None,
            data: data.into(),
        });
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.get()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.get()
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.get()
    }

    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn created_summaries(&self) -> Vec<String> {
        self.created.borrow().iter().map(|i| i.summary.clone()).collect()
    }

    pub fn created_starts(&self) -> Vec<String> {
        self.created
            .borrow()
            .iter()
            .map(|i| i.start.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .collect()
    }

    fn next_href(&self) -> String {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        format!("{}{}.ics", self.handle.url, id)
    }

    fn check_queries(&self) -> FeedSyncResult<()> {
        self.query_calls.set(self.query_calls.get() + 1);
        if self.fail_queries {
            return Err(FeedSyncError::RemoteQuery("connection refused".into()));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    async fn find_calendar(&self, name: &str) -> FeedSyncResult<CalendarHandle> {
        if self.handle.name == name {
            Ok(self.handle())
        } else {
            Err(FeedSyncError::CalendarNotFound(name.into()))
        }
    }

    // The index filters by window itself, so returning everything is fine
    async fn query_events(
        &self,
        calendar: &CalendarHandle,
        _window: &SyncWindow,
    ) -> FeedSyncResult<Vec<RemoteEvent>> {
        self.list_events(calendar).await
    }

    async fn list_events(&self, _calendar: &CalendarHandle) -> FeedSyncResult<Vec<RemoteEvent>> {
        self.check_queries()?;
        Ok(self.events.borrow().clone())
    }

    async fn create_event(
        &self,
        _calendar: &CalendarHandle,
        instance: &EventInstance,
    ) -> FeedSyncResult<()> {
        let call = self.create_calls.get();
        self.create_calls.set(call + 1);
        if self.fail_create_on == Some(call) {
            return Err(FeedSyncError::RemoteWrite(format!(
                "PUT failed for '{}'",
                instance.summary
            )));
        }

        let data = generate_instance(instance, &instance.remote_uid(), &RenderOptions::default());
        let href = self.next_href();
        self.events.borrow_mut().push(RemoteEvent {
            href,
            etag: None,
            data,
        });
        self.created.borrow_mut().push(instance.clone());
        Ok(())
    }

    async fn delete_event(
        &self,
        _calendar: &CalendarHandle,
        event: &RemoteEvent,
    ) -> FeedSyncResult<()> {
        let call = self.delete_calls.get();
        self.delete_calls.set(call + 1);
        if self.fail_delete_on == Some(call) {
            return Err(FeedSyncError::RemoteWrite(format!("DELETE {} failed", event.href)));
        }

        self.events.borrow_mut().retain(|e| e.href != event.href);
        Ok(())
    }
}
