//! RRULE expansion for recurring definitions.
//!
//! Turns an `EventDefinition` into the concrete instances that overlap a
//! `SyncWindow`. Expansion is a pure function of its inputs.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::error::{FeedSyncError, FeedSyncResult};
use crate::event::{EventDefinition, EventInstance};
use crate::ics::localize;
use crate::recurrence::RecurrenceRule;
use crate::window::SyncWindow;

/// Upper bound on occurrences generated for one definition in one window.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// Instances expanded from a whole feed, plus the definitions that could not be expanded.
#[derive(Debug, Default)]
pub struct Expansion {
    pub instances: Vec<EventInstance>,
    pub rejected: Vec<FeedSyncError>,
}

/// Expand every definition, collecting failures instead of stopping at the first.
///
/// Instances are returned sorted by start time.
pub fn expand_all(definitions: &[EventDefinition], window: &SyncWindow) -> Expansion {
    let mut expansion = Expansion::default();

    for definition in definitions {
        match expand(definition, window) {
            Ok(instances) => expansion.instances.extend(instances),
            Err(e) => {
                warn!(summary = %definition.summary, start = %definition.start, "{}", e);
                expansion.rejected.push(e);
            }
        }
    }

    expansion.instances.sort_by_key(|i| i.start.with_timezone(&Utc));
    expansion
}

/// Expand one definition into the instances that overlap `window`.
///
/// - Non-recurring: the definition itself, if it overlaps the window.
/// - Recurring: every rule occurrence overlapping the window, minus `exceptions`,
///   each lasting as long as the definition. Generation never runs past
///   `window.to`, so rules without COUNT or UNTIL still terminate.
pub fn expand(
    definition: &EventDefinition,
    window: &SyncWindow,
) -> FeedSyncResult<Vec<EventInstance>> {
    let Some(rule) = &definition.recurrence else {
        if window.contains(&definition.start, &definition.end) {
            return Ok(vec![definition.as_instance()]);
        }
        return Ok(Vec::new());
    };

    let duration = definition.duration();
    if duration < Duration::zero() {
        return Err(definition.recurrence_error("event ends before it starts"));
    }

    // Occurrences starting up to one duration before the window can still overlap it.
    let lower = window.from - duration - Duration::seconds(1);
    let mut upper = window.to;
    if let Some(until) = rule.until {
        upper = upper.min(until + Duration::seconds(1));
    }
    if upper <= lower {
        return Ok(Vec::new());
    }

    let rule_set = build_rule_set(definition, rule)?;

    let utc: rrule::Tz = Utc.into();
    let result = rule_set
        .after(lower.with_timezone(&utc))
        .before(upper.with_timezone(&utc))
        .all(MAX_OCCURRENCES);

    if result.limited {
        warn!(
            summary = %definition.summary,
            limit = MAX_OCCURRENCES,
            "Recurrence produced too many occurrences; later ones were dropped"
        );
    }

    let tz = definition.start.timezone();
    let mut instances = Vec::new();

    for occurrence in &result.dates {
        let start = occurrence.with_timezone(&tz);
        let start_utc = start.with_timezone(&Utc);

        if definition.exceptions.contains(&start_utc) {
            debug!(summary = %definition.summary, start = %start, "Skipping excluded occurrence");
            continue;
        }
        if rule.until.is_some_and(|until| start_utc > until) {
            continue;
        }

        let end = occurrence_end(definition, start, duration)?;
        if !window.contains(&start, &end) {
            continue;
        }

        instances.push(EventInstance {
            uid: definition.uid.clone(),
            summary: definition.summary.clone(),
            start,
            end,
            all_day: definition.all_day,
            occurrence: true,
            recurrence_id: None,
        });
    }

    Ok(instances)
}

/// Build the `rrule` crate's input in the definition's own zone, so wall-clock
/// times stay fixed across DST changes.
fn build_rule_set(
    definition: &EventDefinition,
    rule: &RecurrenceRule,
) -> FeedSyncResult<RRuleSet> {
    let dtstart = match definition.start.timezone() {
        Tz::UTC => format!(
            "DTSTART:{}",
            definition.start.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ")
        ),
        tz => format!(
            "DTSTART;TZID={}:{}",
            tz.name(),
            definition.start.naive_local().format("%Y%m%dT%H%M%S")
        ),
    };

    let input = format!("{}\nRRULE:{}", dtstart, rule.to_rrule_string());

    input
        .parse::<RRuleSet>()
        .map_err(|e| definition.recurrence_error(e.to_string()))
}

/// End of one occurrence. All-day events keep their length in days so a DST
/// change in between does not move the end off midnight.
fn occurrence_end(
    definition: &EventDefinition,
    start: DateTime<Tz>,
    duration: Duration,
) -> FeedSyncResult<DateTime<Tz>> {
    if !definition.all_day {
        return Ok(start + duration);
    }

    let days = (definition.end.date_naive() - definition.start.date_naive()).num_days();
    let end_date = start.date_naive() + Duration::days(days);
    localize(start.timezone(), end_date.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| definition.recurrence_error(format!("no local midnight on {}", end_date)))
}
