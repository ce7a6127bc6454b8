//! Structured RRULE values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::ics::localize;

const WEEKDAYS: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

/// RRULE parts passed through to expansion without being modelled.
const PASSTHROUGH_PARTS: [&str; 8] = [
    "BYSECOND",
    "BYMINUTE",
    "BYHOUR",
    "BYMONTHDAY",
    "BYYEARDAY",
    "BYWEEKNO",
    "BYSETPOS",
    "WKST",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(format!("unknown FREQ '{}'", other)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated recurrence rule.
///
/// COUNT and UNTIL may both be present; generation stops at whichever is
/// reached first.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    /// Last allowed occurrence start (inclusive)
    pub until: Option<DateTime<Utc>>,
    /// Weekday tokens, e.g. `MO`, `-1FR`
    pub by_day: Vec<String>,
    pub by_month: Vec<u8>,
    /// Other standard parts (BYMONTHDAY, BYSETPOS, WKST, ...) kept verbatim
    pub extra: Vec<(String, String)>,
}

impl RecurrenceRule {
    /// Parse and validate an RRULE value such as `FREQ=WEEKLY;COUNT=4`.
    ///
    /// `tz` resolves floating and date-only UNTIL values.
    pub fn parse(value: &str, tz: Tz) -> Result<Self, String> {
        let mut frequency = None;
        let mut interval = None;
        let mut count = None;
        let mut until = None;
        let mut by_day = Vec::new();
        let mut by_month = Vec::new();
        let mut extra: Vec<(String, String)> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| format!("malformed RRULE part '{}'", part))?;
            let key = key.trim().to_ascii_uppercase();
            let val = val.trim();

            if key.starts_with("X-") {
                continue;
            }
            if seen.contains(&key) {
                return Err(format!("duplicate RRULE part '{}'", key));
            }
            seen.push(key.clone());

            match key.as_str() {
                "FREQ" => frequency = Some(val.to_ascii_uppercase().parse::<Frequency>()?),
                "INTERVAL" => interval = Some(parse_positive(&key, val)?),
                "COUNT" => count = Some(parse_positive(&key, val)?),
                "UNTIL" => until = Some(parse_until(val, tz)?),
                "BYDAY" => by_day = parse_by_day(val)?,
                "BYMONTH" => by_month = parse_by_month(val)?,
                k if PASSTHROUGH_PARTS.contains(&k) => {
                    if val.is_empty() {
                        return Err(format!("empty {} value", k));
                    }
                    extra.push((key.clone(), val.to_ascii_uppercase()));
                }
                other => return Err(format!("unsupported RRULE part '{}'", other)),
            }
        }

        let frequency = frequency.ok_or_else(|| "RRULE has no FREQ".to_string())?;

        Ok(RecurrenceRule {
            frequency,
            interval: interval.unwrap_or(1),
            count,
            until,
            by_day,
            by_month,
            extra,
        })
    }

    /// Render the rule for the `rrule` crate.
    ///
    /// UNTIL is left out: the expander clips at it directly so COUNT and UNTIL
    /// can coexist.
    pub fn to_rrule_string(&self) -> String {
        let mut parts = vec![
            format!("FREQ={}", self.frequency),
            format!("INTERVAL={}", self.interval),
        ];
        if let Some(count) = self.count {
            parts.push(format!("COUNT={}", count));
        }
        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", self.by_day.join(",")));
        }
        if !self.by_month.is_empty() {
            let months: Vec<String> = self.by_month.iter().map(|m| m.to_string()).collect();
            parts.push(format!("BYMONTH={}", months.join(",")));
        }
        for (key, val) in &self.extra {
            parts.push(format!("{}={}", key, val));
        }
        parts.join(";")
    }
}

fn parse_positive(key: &str, val: &str) -> Result<u32, String> {
    match val.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} must be a positive integer, got '{}'", key, val)),
    }
}

fn parse_until(val: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    let invalid = || format!("invalid UNTIL '{}'", val);

    if val.len() == 8 {
        // Date-only UNTIL includes the whole day
        let date = NaiveDate::parse_from_str(val, "%Y%m%d").map_err(|_| invalid())?;
        let end_of_day = date.and_hms_opt(23, 59, 59).ok_or_else(invalid)?;
        return localize(tz, end_of_day)
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(invalid);
    }

    if let Some(utc) = val.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok(naive.and_utc());
    }

    let naive = NaiveDateTime::parse_from_str(val, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    localize(tz, naive)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn parse_by_day(val: &str) -> Result<Vec<String>, String> {
    val.split(',')
        .map(|token| {
            let token = token.trim().to_ascii_uppercase();
            if token.len() < 2 {
                return Err(format!("invalid BYDAY '{}'", token));
            }
            let (ordinal, day) = token.split_at(token.len() - 2);
            if !WEEKDAYS.contains(&day) {
                return Err(format!("invalid BYDAY weekday '{}'", token));
            }
            if !ordinal.is_empty() {
                let digits = ordinal.trim_start_matches(['+', '-']);
                let valid = ordinal.len() - digits.len() <= 1
                    && matches!(digits.parse::<u8>(), Ok(1..=53));
                if !valid {
                    return Err(format!("invalid BYDAY ordinal '{}'", token));
                }
            }
            Ok(token)
        })
        .collect()
}

fn parse_by_month(val: &str) -> Result<Vec<u8>, String> {
    val.split(',')
        .map(|m| match m.trim().parse::<u8>() {
            Ok(n @ 1..=12) => Ok(n),
            _ => Err(format!("invalid BYMONTH '{}'", m.trim())),
        })
        .collect()
}
