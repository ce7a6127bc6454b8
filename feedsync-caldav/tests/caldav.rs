use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use feedsync_caldav::{CalDavConfig, CalDavStore};
use feedsync_core::erase::erase_all;
use feedsync_core::ics::RenderOptions;
use feedsync_core::sync::{SyncOptions, sync_feed};
use feedsync_core::{CalendarHandle, FeedSyncError, RemoteStore, SyncWindow};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STANDUP_FEED: &str = "BEGIN:VCALENDAR\r\n\
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

fn multistatus(responses: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_string(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">{}</d:multistatus>"#,
        responses
    ))
}

fn event_response(href: &str, summary: &str, start: &str, end: &str) -> String {
    format!(
        r#"<d:response>
  <d:href>{href}</d:href>
  <d:propstat>
    <d:prop>
      <d:getetag>"etag-{summary}"</d:getetag>
      <c:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:{href}
SUMMARY:{summary}
DTSTART:{start}
DTEND:{end}
END:VEVENT
END:VCALENDAR
</c:calendar-data>
    </d:prop>
    <d:status>HTTP/1.1 200 OK</d:status>
  </d:propstat>
</d:response>"#
    )
}

/// Principal, calendar home and a two-calendar listing.
async fn mount_discovery(server: &MockServer) {
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .and(header("Depth", "0"))
        .respond_with(multistatus(
            r#"<d:response><d:href>/</d:href><d:propstat><d:prop>
<d:current-user-principal><d:href>/principals/me/</d:href></d:current-user-principal>
</d:prop></d:propstat></d:response>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path("/principals/me/"))
        .respond_with(multistatus(
            r#"<d:response><d:href>/principals/me/</d:href><d:propstat><d:prop>
<c:calendar-home-set><d:href>/calendars/me/</d:href></c:calendar-home-set>
</d:prop></d:propstat></d:response>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path("/calendars/me/"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(
            r#"<d:response><d:href>/calendars/me/</d:href><d:propstat><d:prop>
<d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat></d:response>
<d:response><d:href>/calendars/me/personal/</d:href><d:propstat><d:prop>
<d:displayname>Personal</d:displayname>
<d:resourcetype><d:collection/><c:calendar/></d:resourcetype></d:prop></d:propstat></d:response>
<d:response><d:href>/calendars/me/work/</d:href><d:propstat><d:prop>
<d:displayname>Work Feed</d:displayname>
<d:resourcetype><d:collection/><c:calendar/></d:resourcetype></d:prop></d:propstat></d:response>"#,
        ))
        .mount(server)
        .await;
}

fn store(server: &MockServer) -> CalDavStore {
    let config = CalDavConfig {
        url: format!("{}/", server.uri()),
        username: Some("me".into()),
        password: Some("secret".into()),
    };
    CalDavStore::new(&config, RenderOptions::default()).unwrap()
}

fn work_calendar(server: &MockServer) -> CalendarHandle {
    CalendarHandle {
        name: "Work Feed".into(),
        url: format!("{}/calendars/me/work/", server.uri()),
    }
}

fn january_2024() -> SyncWindow {
    SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_find_calendar_by_name() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    let store = store(&server);

    let calendar = store.find_calendar("Work Feed").await.unwrap();
    assert_eq!(calendar, work_calendar(&server));

    let calendar = store.find_calendar("work").await.unwrap();
    assert_eq!(calendar.name, "Work Feed");

    let err = store.find_calendar("Holidays").await.unwrap_err();
    assert!(matches!(err, FeedSyncError::CalendarNotFound(name) if name == "Holidays"));
}

#[tokio::test]
async fn test_find_calendar_without_principal() {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/calendars/me/"))
        .and(header("Depth", "0"))
        .respond_with(multistatus(
            r#"<d:response><d:href>/calendars/me/</d:href><d:propstat><d:prop>
<d:current-user-principal/></d:prop></d:propstat></d:response>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/calendars/me/"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(
            r#"<d:response><d:href>/calendars/me/work/</d:href><d:propstat><d:prop>
<d:resourcetype><d:collection/><c:calendar/></d:resourcetype></d:prop></d:propstat></d:response>"#,
        ))
        .mount(&server)
        .await;

    let config = CalDavConfig {
        url: format!("{}/calendars/me/", server.uri()),
        username: None,
        password: None,
    };
    let store = CalDavStore::new(&config, RenderOptions::default()).unwrap();

    let calendar = store.find_calendar("work").await.unwrap();
    assert_eq!(calendar.url, format!("{}/calendars/me/work/", server.uri()));
}

#[tokio::test]
async fn test_query_events_sends_time_range() {
    let server = MockServer::start().await;
    Mock::given(method("REPORT"))
        .and(path("/calendars/me/work/"))
        .and(header("Depth", "1"))
        .and(body_string_contains(
            r#"<C:time-range start="20240101T000000Z" end="20240201T000000Z"/>"#,
        ))
        .respond_with(multistatus(&event_response(
            "/calendars/me/work/a.ics",
            "Standup",
            "20240109T090000Z",
            "20240109T091500Z",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let events = store(&server)
        .query_events(&work_calendar(&server), &january_2024())
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].href, "/calendars/me/work/a.ics");
    assert!(events[0].data.contains("SUMMARY:Standup"));
}

#[tokio::test]
async fn test_query_failure_is_remote_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("REPORT"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = store(&server)
        .query_events(&work_calendar(&server), &january_2024())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedSyncError::RemoteQuery(_)));
}

#[tokio::test]
async fn test_sync_against_server_skips_existing() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("REPORT"))
        .and(path("/calendars/me/work/"))
        .respond_with(multistatus(&event_response(
            "/calendars/me/work/a.ics",
            "Standup",
            "20240109T090000Z",
            "20240109T091500Z",
        )))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/calendars/me/work/[0-9a-f-]{36}\.ics$"))
        .and(header("If-None-Match", "*"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;

    let options = SyncOptions {
        calendar_name: "Work Feed".into(),
        window: january_2024(),
        timezone: Tz::UTC,
        strict: false,
    };
    let report = sync_feed(&store(&server), STANDUP_FEED, &options)
        .await
        .unwrap();

    assert_eq!(report.to_string(), "created=3 skipped=1 failed=0");

    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<String> = requests
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect();
    assert!(bodies[0].contains("UID:standup@feed-20240102T090000Z"));
    assert!(bodies[0].contains("TRANSP:TRANSPARENT"));
    assert!(bodies.iter().all(|b| !b.contains("DTSTART:20240109")));
}

#[tokio::test]
async fn test_failed_put_is_recorded() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("REPORT"))
        .respond_with(multistatus(""))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;

    let options = SyncOptions {
        calendar_name: "Work Feed".into(),
        window: january_2024(),
        timezone: Tz::UTC,
        strict: false,
    };
    let report = sync_feed(&store(&server), STANDUP_FEED, &options)
        .await
        .unwrap();

    assert_eq!(report.to_string(), "created=0 skipped=0 failed=4");
    assert!(matches!(report.failures[0], FeedSyncError::RemoteWrite(_)));
}

#[tokio::test]
async fn test_erase_all_deletes_every_event() {
    let server = MockServer::start().await;
    let events: String = (1..=3)
        .map(|i| {
            event_response(
                &format!("/calendars/me/work/{}.ics", i),
                &format!("Event{}", i),
                "20240109T090000Z",
                "20240109T091500Z",
            )
        })
        .collect();
    Mock::given(method("REPORT"))
        .and(path("/calendars/me/work/"))
        .respond_with(multistatus(&events))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/me/work/1.ics"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    // Already gone counts as deleted
    Mock::given(method("DELETE"))
        .and(path("/calendars/me/work/2.ics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/me/work/3.ics"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let report = erase_all(&store(&server), &work_calendar(&server), true)
        .await
        .unwrap();

    assert_eq!(report.to_string(), "deleted=2 failed=1");
}
