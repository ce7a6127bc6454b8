//! ICS generation for instances written to the remote calendar.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::event::EventInstance;

pub const PRODID: &str = "-//feedsync//EN";

/// How instances are rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Zone to express timed instances in; `None` keeps each instance's own zone
    pub timezone: Option<Tz>,
    /// Mark events TRANSP:TRANSPARENT so they don't block free/busy time
    pub transparent: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            timezone: None,
            transparent: true,
        }
    }
}

/// Generate a single-event .ics document for one instance.
pub fn generate_instance(instance: &EventInstance, uid: &str, options: &RenderOptions) -> String {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(uid);
    ics_event.summary(&instance.summary);
    ics_event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

    if instance.all_day {
        // Dates stay in the zone they were defined in
        add_date_property(&mut ics_event, "DTSTART", &instance.start);
        add_date_property(&mut ics_event, "DTEND", &instance.end);
    } else {
        let tz = options.timezone.unwrap_or_else(|| instance.start.timezone());
        add_datetime_property(&mut ics_event, "DTSTART", &instance.start.with_timezone(&tz));
        add_datetime_property(&mut ics_event, "DTEND", &instance.end.with_timezone(&tz));
    }

    if options.transparent {
        ics_event.add_property("TRANSP", "TRANSPARENT");
    }

    cal.push(ics_event.done());
    let cal = cal.done();

    strip_ics_bloat(&cal.to_string())
}

/// Replace the icalendar crate's PRODID with ours and drop the default CALSCALE.
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn add_date_property(ics_event: &mut icalendar::Event, name: &str, time: &DateTime<Tz>) {
    let mut prop = Property::new(name, time.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    ics_event.append_property(prop);
}

fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, time: &DateTime<Tz>) {
    if time.timezone() == Tz::UTC {
        ics_event.add_property(name, time.format("%Y%m%dT%H%M%SZ").to_string());
    } else {
        let mut prop = Property::new(name, time.format("%Y%m%dT%H%M%S").to_string());
        prop.add_parameter("TZID", time.timezone().name());
        ics_event.append_property(prop);
    }
}
