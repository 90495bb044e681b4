//! BY* constraint predicates (RFC 5545 §3.3.10 limit semantics).
//!
//! Each filter is an independent predicate over a candidate timestamp; an
//! unset filter always matches. `first_failing` reports the first failing
//! constraint in jump-priority order so generators can skip directly to
//! the next plausible candidate instead of stepping one unit at a time.

use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::core::Frequency;
use crate::rule::RecurrenceRule;
use cadence_core::{
    nth_weekday_in_month, resolve_month_day, resolve_year_day, to_zoned, week_of_year,
    weeks_in_year,
};

/// One of the BY* constraint classes, in jump-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Month,
    YearDay,
    WeekNo,
    MonthDay,
    Day,
    Hour,
    Minute,
    Second,
}

pub(crate) struct Matcher<'r> {
    rule: &'r RecurrenceRule,
}

impl<'r> Matcher<'r> {
    pub(crate) fn new(rule: &'r RecurrenceRule) -> Self {
        Self { rule }
    }

    pub(crate) fn month_matches(&self, date: NaiveDate) -> bool {
        self.rule.by_month.is_empty() || self.rule.by_month.contains(&date.month())
    }

    pub(crate) fn year_day_matches(&self, date: NaiveDate) -> bool {
        self.rule.by_year_day.is_empty()
            || self
                .rule
                .by_year_day
                .iter()
                .any(|&yd| resolve_year_day(date.year(), yd) == Some(date))
    }

    pub(crate) fn week_no_matches(&self, date: NaiveDate) -> bool {
        if self.rule.by_week_no.is_empty() {
            return true;
        }
        let (week_year, week) = week_of_year(date, self.rule.week_start);
        let total = weeks_in_year(week_year, self.rule.week_start);
        self.rule.by_week_no.iter().any(|&req| {
            let resolved = if req < 0 {
                i64::from(total) + i64::from(req) + 1
            } else {
                i64::from(req)
            };
            resolved == i64::from(week)
        })
    }

    pub(crate) fn month_day_matches(&self, date: NaiveDate) -> bool {
        self.rule.by_month_day.is_empty()
            || self
                .rule
                .by_month_day
                .iter()
                .any(|&md| resolve_month_day(date.year(), date.month(), md) == Some(date.day()))
    }

    /// BYDAY: bare tokens match the weekday; ordinal tokens resolve within
    /// the candidate's month. Under DAILY frequency only the weekday
    /// comparison applies, with no month bucketing.
    pub(crate) fn day_matches(&self, date: NaiveDate) -> bool {
        if self.rule.by_day.is_empty() {
            return true;
        }
        self.rule.by_day.iter().any(|token| {
            match token.ordinal {
                Some(ord) if self.rule.freq != Frequency::Daily => {
                    nth_weekday_in_month(date.year(), date.month(), token.weekday, ord)
                        == Some(date)
                }
                _ => token.weekday == date.weekday(),
            }
        })
    }

    /// BYHOUR with DST tolerance: a candidate hour also matches when
    /// setting the hour to a requested value is a no-op, the signature of
    /// a spring-forward gap having absorbed that hour.
    pub(crate) fn hour_matches(&self, dt: &DateTime<Tz>) -> bool {
        if self.rule.by_hour.is_empty() || self.rule.by_hour.contains(&dt.hour()) {
            return true;
        }
        let local = dt.naive_local();
        self.rule.by_hour.iter().any(|&h| {
            local
                .with_hour(h)
                .and_then(|shifted| to_zoned(shifted, self.rule.tz).ok())
                .is_some_and(|resolved| resolved.hour() == dt.hour())
        })
    }

    pub(crate) fn minute_matches(&self, dt: &DateTime<Tz>) -> bool {
        self.rule.by_minute.is_empty() || self.rule.by_minute.contains(&dt.minute())
    }

    pub(crate) fn second_matches(&self, dt: &DateTime<Tz>) -> bool {
        self.rule.by_second.is_empty() || self.rule.by_second.contains(&dt.second())
    }

    /// Conjunction of the date-level filters.
    pub(crate) fn date_ok(&self, date: NaiveDate) -> bool {
        self.first_failing_date(date).is_none()
    }

    /// First failing date-level constraint in jump-priority order.
    pub(crate) fn first_failing_date(&self, date: NaiveDate) -> Option<Constraint> {
        if !self.month_matches(date) {
            return Some(Constraint::Month);
        }
        if !self.year_day_matches(date) {
            return Some(Constraint::YearDay);
        }
        if !self.week_no_matches(date) {
            return Some(Constraint::WeekNo);
        }
        if !self.month_day_matches(date) {
            return Some(Constraint::MonthDay);
        }
        if !self.day_matches(date) {
            return Some(Constraint::Day);
        }
        None
    }

    /// Conjunction of the time-level filters over a resolved instant.
    pub(crate) fn time_ok(&self, dt: &DateTime<Tz>) -> bool {
        self.hour_matches(dt) && self.minute_matches(dt) && self.second_matches(dt)
    }

    /// First failing constraint across all filters, date-level first.
    pub(crate) fn first_failing(&self, dt: &DateTime<Tz>) -> Option<Constraint> {
        if let Some(c) = self.first_failing_date(dt.date_naive()) {
            return Some(c);
        }
        if !self.hour_matches(dt) {
            return Some(Constraint::Hour);
        }
        if !self.minute_matches(dt) {
            return Some(Constraint::Minute);
        }
        if !self.second_matches(dt) {
            return Some(Constraint::Second);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NthWeekday, Rule};
    use chrono::{TimeZone, Weekday};

    fn rule_with(raw: Rule) -> RecurrenceRule {
        let dtstart = chrono_tz::UTC
            .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
            .single()
            .unwrap();
        RecurrenceRule::new(raw, dtstart).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn negative_month_day_resolves_from_end() {
        let rule = rule_with(Rule::new(Frequency::Monthly).by_month_day(vec![-1]));
        let m = Matcher::new(&rule);
        assert!(m.month_day_matches(date(2025, 4, 30)));
        assert!(!m.month_day_matches(date(2025, 4, 29)));
        assert!(m.month_day_matches(date(2025, 5, 31)));
    }

    #[test]
    fn ordinal_byday_buckets_by_month() {
        let rule = rule_with(Rule::new(Frequency::Monthly).by_day(vec![NthWeekday::nth(2, Weekday::Fri)]));
        let m = Matcher::new(&rule);
        // Second Friday of June 2025 is the 13th.
        assert!(m.day_matches(date(2025, 6, 13)));
        assert!(!m.day_matches(date(2025, 6, 6)));
        assert!(!m.day_matches(date(2025, 6, 20)));
    }

    #[test]
    fn daily_frequency_ignores_ordinals() {
        let rule = rule_with(Rule::new(Frequency::Daily).by_day(vec![NthWeekday::nth(2, Weekday::Fri)]));
        let m = Matcher::new(&rule);
        // Every Friday matches under DAILY, ordinal notwithstanding.
        assert!(m.day_matches(date(2025, 6, 6)));
        assert!(m.day_matches(date(2025, 6, 20)));
        assert!(!m.day_matches(date(2025, 6, 12)));
    }

    #[test]
    fn negative_week_no_resolves_from_last_week() {
        let rule = rule_with(Rule::new(Frequency::Yearly).by_week_no(vec![-1]));
        let m = Matcher::new(&rule);
        // 2020 has 53 ISO weeks; Dec 31 2020 is in week 53.
        assert!(m.week_no_matches(date(2020, 12, 31)));
        assert!(!m.week_no_matches(date(2020, 12, 20)));
    }

    #[test]
    fn year_day_negative_index() {
        let rule = rule_with(Rule::new(Frequency::Yearly).by_year_day(vec![-1, 1]));
        let m = Matcher::new(&rule);
        assert!(m.year_day_matches(date(2025, 12, 31)));
        assert!(m.year_day_matches(date(2025, 1, 1)));
        assert!(!m.year_day_matches(date(2025, 6, 1)));
    }

    #[test]
    fn hour_tolerance_accepts_gap_absorbed_hour() {
        let raw = Rule::new(Frequency::Daily).by_hour(vec![2]);
        let dtstart = chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 3, 8, 2, 30, 0)
            .single()
            .unwrap();
        let rule = RecurrenceRule::new(raw, dtstart).unwrap();
        let m = Matcher::new(&rule);
        // 2025-03-09 02:30 does not exist in New York; the resolved 03:30
        // instant still satisfies BYHOUR=2 because setting hour 2 is a
        // no-op on that day.
        let shifted = to_zoned(
            date(2025, 3, 9).and_hms_opt(2, 30, 0).unwrap(),
            chrono_tz::America::New_York,
        )
        .unwrap();
        assert_eq!(shifted.hour(), 3);
        assert!(m.hour_matches(&shifted));
        // On an ordinary day hour 3 does not satisfy BYHOUR=2.
        let plain = to_zoned(
            date(2025, 3, 10).and_hms_opt(3, 30, 0).unwrap(),
            chrono_tz::America::New_York,
        )
        .unwrap();
        assert!(!m.hour_matches(&plain));
    }
}
