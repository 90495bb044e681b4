//! Raw recurrence rule value type (RFC 5545 §3.3.10, §3.8.5.3).
//!
//! `Rule` is the unvalidated, plain-data shape a caller builds (or the
//! parser produces) before it is sanitized into a
//! [`RecurrenceRule`](crate::RecurrenceRule). Its `Display` impl emits the
//! canonical `FREQ=...;...` RRULE value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recurrence frequency (RFC 5545 §3.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
    /// Returns the RRULE token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency token (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }

    /// Whether the period is finer than a day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the two-letter RRULE token for a weekday.
#[must_use]
pub const fn weekday_token(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parses a two-letter weekday token (case-insensitive).
#[must_use]
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    Some(match s.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    })
}

/// A BYDAY entry: a weekday with an optional occurrence ordinal.
///
/// `MO` matches every Monday; `2FR` the second Friday of the period;
/// `-1SU` the last Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NthWeekday {
    /// Occurrence number within the period, negative counting from the
    /// end. `None` matches every such weekday.
    pub ordinal: Option<i32>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl NthWeekday {
    /// A weekday entry with no ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// A weekday entry with an ordinal. `ordinal` must be non-zero.
    #[must_use]
    pub const fn nth(ordinal: i32, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }

    /// Parses a BYDAY token such as `MO`, `2FR`, or `-1SU`.
    ///
    /// Returns `None` for malformed tokens; RFC 5545 consumers drop them
    /// rather than failing the whole rule.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 {
            return None;
        }
        let split = s.len() - 2;
        if !s.is_char_boundary(split) {
            return None;
        }
        let weekday = parse_weekday(&s[split..])?;
        let ordinal_str = &s[..split];
        let ordinal = if ordinal_str.is_empty() {
            None
        } else {
            let n: i32 = ordinal_str.parse().ok()?;
            if n == 0 {
                return None;
            }
            Some(n)
        };
        Some(Self { ordinal, weekday })
    }
}

impl fmt::Display for NthWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", weekday_token(self.weekday))
    }
}

/// UNTIL boundary for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Until {
    /// Date-only boundary; covers the whole day (inclusive).
    Date(NaiveDate),
    /// Wall-clock boundary interpreted in the rule's timezone (inclusive).
    Local(NaiveDateTime),
    /// Absolute instant boundary (inclusive).
    Instant(DateTime<Utc>),
}

/// Unvalidated recurrence rule.
///
/// All fields are optional or freely settable; validation and range
/// filtering happen once, when the rule is turned into a
/// [`RecurrenceRule`](crate::RecurrenceRule).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Recurrence frequency (required for a valid rule).
    pub freq: Option<Frequency>,

    /// Recurrence interval; defaults to 1 when unset.
    pub interval: Option<u32>,

    /// Number of occurrences in the final, merged sequence.
    pub count: Option<u32>,

    /// Upper bound on generated occurrences (inclusive).
    pub until: Option<Until>,

    /// Week start day (WKST); defaults to Monday.
    pub week_start: Option<Weekday>,

    /// BYSECOND list (0-59).
    pub by_second: Vec<u32>,

    /// BYMINUTE list (0-59).
    pub by_minute: Vec<u32>,

    /// BYHOUR list (0-23).
    pub by_hour: Vec<u32>,

    /// BYDAY list.
    pub by_day: Vec<NthWeekday>,

    /// BYMONTHDAY list (-31 to 31, excluding 0).
    pub by_month_day: Vec<i32>,

    /// BYYEARDAY list (-366 to 366, excluding 0).
    pub by_year_day: Vec<i32>,

    /// BYWEEKNO list (-53 to 53, excluding 0).
    pub by_week_no: Vec<i32>,

    /// BYMONTH list (1-12).
    pub by_month: Vec<u32>,

    /// BYSETPOS list (non-zero, unbounded magnitude).
    pub by_set_pos: Vec<i32>,
}

impl Rule {
    /// Creates an empty rule.
    #[must_use]
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }

    /// Sets the interval.
    #[must_use]
    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the occurrence count.
    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the UNTIL boundary.
    #[must_use]
    pub fn until(mut self, until: Until) -> Self {
        self.until = Some(until);
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub fn week_start(mut self, weekday: Weekday) -> Self {
        self.week_start = Some(weekday);
        self
    }

    /// Sets the BYDAY list.
    #[must_use]
    pub fn by_day(mut self, days: impl Into<Vec<NthWeekday>>) -> Self {
        self.by_day = days.into();
        self
    }

    /// Sets the BYMONTH list.
    #[must_use]
    pub fn by_month(mut self, months: impl Into<Vec<u32>>) -> Self {
        self.by_month = months.into();
        self
    }

    /// Sets the BYMONTHDAY list.
    #[must_use]
    pub fn by_month_day(mut self, days: impl Into<Vec<i32>>) -> Self {
        self.by_month_day = days.into();
        self
    }

    /// Sets the BYYEARDAY list.
    #[must_use]
    pub fn by_year_day(mut self, days: impl Into<Vec<i32>>) -> Self {
        self.by_year_day = days.into();
        self
    }

    /// Sets the BYWEEKNO list.
    #[must_use]
    pub fn by_week_no(mut self, weeks: impl Into<Vec<i32>>) -> Self {
        self.by_week_no = weeks.into();
        self
    }

    /// Sets the BYHOUR list.
    #[must_use]
    pub fn by_hour(mut self, hours: impl Into<Vec<u32>>) -> Self {
        self.by_hour = hours.into();
        self
    }

    /// Sets the BYMINUTE list.
    #[must_use]
    pub fn by_minute(mut self, minutes: impl Into<Vec<u32>>) -> Self {
        self.by_minute = minutes.into();
        self
    }

    /// Sets the BYSECOND list.
    #[must_use]
    pub fn by_second(mut self, seconds: impl Into<Vec<u32>>) -> Self {
        self.by_second = seconds.into();
        self
    }

    /// Sets the BYSETPOS list.
    #[must_use]
    pub fn by_set_pos(mut self, positions: impl Into<Vec<i32>>) -> Self {
        self.by_set_pos = positions.into();
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(freq) = self.freq {
            parts.push(format!("FREQ={freq}"));
        }
        if let Some(interval) = self.interval
            && interval != 1
        {
            parts.push(format!("INTERVAL={interval}"));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(until) = self.until {
            let formatted = match until {
                Until::Date(d) => d.format("%Y%m%d").to_string(),
                Until::Local(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
                Until::Instant(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            };
            parts.push(format!("UNTIL={formatted}"));
        }
        if let Some(wkst) = self.week_start {
            parts.push(format!("WKST={}", weekday_token(wkst)));
        }

        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYMONTHDAY", &self.by_month_day);
        push_list(&mut parts, "BYYEARDAY", &self.by_year_day);
        push_list(&mut parts, "BYWEEKNO", &self.by_week_no);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYSETPOS", &self.by_set_pos);

        write!(f, "{}", parts.join(";"))
    }
}

fn push_list<T: fmt::Display>(parts: &mut Vec<String>, key: &str, values: &[T]) {
    if !values.is_empty() {
        let joined: Vec<_> = values.iter().map(ToString::to_string).collect();
        parts.push(format!("{key}={}", joined.join(",")));
    }
}
