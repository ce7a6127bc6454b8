//! Feed parsing using the icalendar crate's parser.
//!
//! Every VEVENT goes through an explicit construction step that validates and
//! normalises it into an `EventDefinition`, so nothing downstream ever sees a
//! half-parsed event.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::{debug, warn};

use crate::error::{FeedSyncError, FeedSyncResult};
use crate::event::{DEFAULT_SUMMARY, EventDefinition};
use crate::ics::timezone::{localize, resolve_tzid};
use crate::recurrence::RecurrenceRule;

/// Result of parsing a feed.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub definitions: Vec<EventDefinition>,
    /// VEVENTs that could not be turned into a definition
    pub rejected: Vec<FeedSyncError>,
}

/// Outcome of parsing one VEVENT.
enum ParsedEvent {
    Definition(EventDefinition),
    /// STATUS:CANCELLED; only matters when it cancels one occurrence of a series
    Cancelled {
        uid: Option<String>,
        recurrence_id: Option<DateTime<Utc>>,
    },
}

/// Parse feed content into event definitions.
///
/// `default_tz` applies to floating times, all-day dates and unknown TZIDs.
/// Fails only when the content is not calendar data at all; individual bad
/// events end up in `ParsedFeed::rejected`.
pub fn parse_feed(content: &str, default_tz: Tz) -> FeedSyncResult<ParsedFeed> {
    let content = content.trim_start_matches('\u{feff}').trim_start();
    if !content
        .get(..15)
        .is_some_and(|h| h.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(FeedSyncError::Parse(
            "content does not start with BEGIN:VCALENDAR".into(),
        ));
    }

    // The parser needs every line terminated, including END:VCALENDAR
    let unfolded = if content.ends_with('\n') {
        unfold(content)
    } else {
        unfold(&format!("{}\r\n", content))
    };
    let calendar = read_calendar(&unfolded).map_err(|e| FeedSyncError::Parse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let mut feed = ParsedFeed::default();
    let mut cancelled = Vec::new();

    for vevent in vevents {
        match parse_vevent(vevent, default_tz) {
            Ok(ParsedEvent::Definition(definition)) => feed.definitions.push(definition),
            Ok(ParsedEvent::Cancelled { uid, recurrence_id }) => match (uid, recurrence_id) {
                (Some(uid), Some(id)) => cancelled.push((uid, id)),
                (uid, _) => debug!(uid = ?uid, "Dropping cancelled event"),
            },
            Err(e) => {
                warn!("{}", e);
                feed.rejected.push(e);
            }
        }
    }

    apply_overrides(&mut feed.definitions, cancelled);

    debug!(
        definitions = feed.definitions.len(),
        rejected = feed.rejected.len(),
        "Parsed feed"
    );

    Ok(feed)
}

fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

/// Construct a validated definition from one VEVENT.
fn parse_vevent(vevent: &Component<'_>, default_tz: Tz) -> FeedSyncResult<ParsedEvent> {
    let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| normalize_text(p.val.as_ref()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    let invalid = |message: String| FeedSyncError::InvalidEvent {
        summary: summary.clone(),
        message,
    };

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .map(|p| parse_time(p, default_tz).map(|(dt, _)| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(&invalid)?;

    let is_cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"));
    if is_cancelled {
        return Ok(ParsedEvent::Cancelled { uid, recurrence_id });
    }

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| invalid("missing DTSTART".into()))?;
    let (start, all_day) = parse_time(dtstart, default_tz).map_err(&invalid)?;

    let end = match vevent.find_prop("DTEND") {
        Some(dtend) => parse_time(dtend, default_tz).map_err(&invalid)?.0,
        None => {
            let duration = vevent
                .find_prop("DURATION")
                .map(|p| parse_duration(p.val.as_ref()))
                .transpose()
                .map_err(&invalid)?;
            match duration {
                Some(duration) if all_day => days_after(&start, whole_days(duration))
                    .ok_or_else(|| invalid("DURATION ends on no valid local midnight".into()))?,
                Some(duration) => start + duration,
                // RFC 5545: a DATE start without an end lasts one day,
                // a DATE-TIME start has no length
                None if all_day => days_after(&start, 1)
                    .ok_or_else(|| invalid("no valid local midnight after DTSTART".into()))?,
                None => start,
            }
        }
    };
    if end < start {
        return Err(invalid(format!(
            "ends ({}) before it starts ({})",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }

    let recurrence = vevent
        .find_prop("RRULE")
        .map(|p| RecurrenceRule::parse(p.val.as_ref(), start.timezone()))
        .transpose()
        .map_err(|message| FeedSyncError::Recurrence {
            summary: summary.clone(),
            start: start.to_rfc3339(),
            message,
        })?;

    let exceptions: BTreeSet<DateTime<Utc>> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(|p| parse_exdate_property(p, &summary, &start))
        .collect();

    Ok(ParsedEvent::Definition(EventDefinition {
        uid,
        summary,
        start,
        end,
        all_day,
        recurrence,
        exceptions,
        recurrence_id,
    }))
}

/// An override replaces its occurrence, a cancelled override removes it: either
/// way the series must no longer generate that occurrence itself.
fn apply_overrides(definitions: &mut [EventDefinition], cancelled: Vec<(String, DateTime<Utc>)>) {
    let mut replaced: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();

    for definition in definitions.iter() {
        if let (Some(uid), Some(id)) = (&definition.uid, definition.recurrence_id) {
            replaced.entry(uid.clone()).or_default().push(id);
        }
    }
    for (uid, id) in cancelled {
        replaced.entry(uid).or_default().push(id);
    }

    for definition in definitions.iter_mut().filter(|d| d.is_recurring()) {
        if let Some(ids) = definition.uid.as_ref().and_then(|uid| replaced.get(uid)) {
            definition.exceptions.extend(ids.iter().copied());
        }
    }
}

/// Midnight `days` calendar days after an all-day start, in the start's zone.
/// Day arithmetic on dates keeps the end on midnight across DST changes.
fn days_after(start: &DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    let date = start
        .date_naive()
        .checked_add_signed(Duration::try_days(days)?)?;
    localize(start.timezone(), date.and_time(chrono::NaiveTime::MIN))
}

/// Whole days covered by a duration, rounding any partial day up.
fn whole_days(duration: Duration) -> i64 {
    let days = duration.num_days();
    if duration > Duration::days(days) { days + 1 } else { days }
}

/// Resolve a DTSTART/DTEND/RECURRENCE-ID property to a zoned time.
/// Returns the time and whether it was a date-only value.
fn parse_time(prop: &Property<'_>, default_tz: Tz) -> Result<(DateTime<Tz>, bool), String> {
    let value = DatePerhapsTime::try_from(prop)
        .map_err(|_| format!("invalid {} '{}'", prop.name, prop.val.as_ref()))?;

    let unresolved = || format!("{} '{}' has no valid local time", prop.name, prop.val.as_ref());

    match value {
        DatePerhapsTime::Date(date) => localize(default_tz, date.and_time(chrono::NaiveTime::MIN))
            .map(|dt| (dt, true))
            .ok_or_else(unresolved),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => {
            Ok((dt.with_timezone(&Tz::UTC), false))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            localize(default_tz, naive)
                .map(|dt| (dt, false))
                .ok_or_else(unresolved)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz = resolve_tzid(&tzid).unwrap_or_else(|| {
                warn!(tzid = %tzid, fallback = %default_tz, "Unknown TZID, using default timezone");
                default_tz
            });
            localize(tz, date_time)
                .map(|dt| (dt, false))
                .ok_or_else(unresolved)
        }
    }
}

/// Parse an EXDATE property into excluded instants.
///
/// Handles:
/// - TZID parameter: `EXDATE;TZID=America/New_York:20240108T100000`
/// - VALUE=DATE: `EXDATE;VALUE=DATE:20240108` (the occurrence on that date)
/// - UTC: `EXDATE:20240108T100000Z`
/// - Floating: `EXDATE:20240108T100000` (in the series' zone)
/// - Comma-separated values: `EXDATE;TZID=...:20240108T100000,20240115T100000`
fn parse_exdate_property(
    prop: &Property<'_>,
    summary: &str,
    start: &DateTime<Tz>,
) -> Vec<DateTime<Utc>> {
    let tz = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
        .and_then(|tzid| resolve_tzid(&tzid))
        .unwrap_or_else(|| start.timezone());

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    let parse_one = |s: &str| -> Option<DateTime<Utc>> {
        if is_date || s.len() == 8 {
            let date = NaiveDate::parse_from_str(s, "%Y%m%d").ok()?;
            localize(start.timezone(), date.and_time(start.time()))
                .map(|dt| dt.with_timezone(&Utc))
        } else if let Some(utc) = s.strip_suffix('Z') {
            NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .ok()
                .map(|dt| dt.and_utc())
        } else {
            let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()?;
            localize(tz, naive).map(|dt| dt.with_timezone(&Utc))
        }
    };

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let excluded = parse_one(s);
            if excluded.is_none() {
                warn!(summary = %summary, value = %s, "Ignoring unreadable EXDATE value");
            }
            excluded
        })
        .collect()
}

/// Parse an ISO-8601 DURATION value (`PT1H30M`, `P1D`).
fn parse_duration(value: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid DURATION '{}'", value);
    let trimmed = value.trim().trim_start_matches('+');
    if trimmed.starts_with('-') {
        return Err(invalid());
    }

    let duration = iso8601::duration(trimmed).map_err(|_| invalid())?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).map_err(|_| invalid())
}

/// Unescape an RFC 5545 TEXT value and flatten it to one line.
fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(escaped @ (',' | ';' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out.replace(['\r', '\n'], " ").trim().to_string()
}
