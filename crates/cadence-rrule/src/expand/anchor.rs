//! Forward-jump targets for failed constraints.
//!
//! Stepping one frequency unit at a time is intractable for fine
//! frequencies spanning years, so when a candidate fails a BY* filter
//! the generators jump straight to the next date or time that could
//! plausibly satisfy the failing constraint, then realign to the
//! interval grid anchored at dtstart.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;

use crate::core::Frequency;
use crate::expand::matcher::{Constraint, Matcher};
use crate::rule::RecurrenceRule;
use cadence_core::{add_months, resolve_month_day, resolve_year_day, week_start_date};

/// Scan horizon for BYDAY ordinal jumps; generous enough to cross any
/// BYMONTH gap plus a leap cycle's worth of slack.
const DAY_SCAN_HORIZON: u64 = 400;

/// Interval step of a sub-daily frequency, in seconds.
pub(crate) fn step_seconds(rule: &RecurrenceRule) -> i64 {
    let unit = match rule.freq {
        Frequency::Hourly => 3600,
        Frequency::Minutely => 60,
        _ => 1,
    };
    unit * i64::from(rule.interval)
}

/// Smallest instant on the interval grid anchored at `origin` that is
/// at or after `target`.
pub(crate) fn align_after(
    origin: DateTime<Tz>,
    target: DateTime<Tz>,
    step_secs: i64,
) -> DateTime<Tz> {
    let delta = (target - origin).num_seconds();
    if delta <= 0 {
        return origin;
    }
    let whole = delta / step_secs;
    let steps = if delta % step_secs == 0 { whole } else { whole + 1 };
    origin + Duration::seconds(steps * step_secs)
}

/// Smallest date strictly after `from` that could satisfy the given
/// date-level constraint. `None` only when the search exhausts its
/// horizon (the step budget is the backstop for rules that never
/// converge, so callers treat `None` as end of generation).
pub(crate) fn next_date_for(
    rule: &RecurrenceRule,
    constraint: Constraint,
    from: NaiveDate,
) -> Option<NaiveDate> {
    match constraint {
        Constraint::Month => next_month_start(&rule.by_month, from),
        Constraint::YearDay => next_year_day(&rule.by_year_day, from),
        Constraint::WeekNo => next_week_day(rule, from),
        Constraint::MonthDay => next_month_day(&rule.by_month_day, from),
        Constraint::Day => next_weekday_scan(rule, from),
        Constraint::Hour | Constraint::Minute | Constraint::Second => from.succ_opt(),
    }
}

fn next_month_start(by_month: &[u32], from: NaiveDate) -> Option<NaiveDate> {
    let mut cursor = NaiveDate::from_ymd_opt(from.year(), from.month(), 1)?;
    for _ in 0..12 {
        cursor = add_months(cursor, 1);
        if by_month.contains(&cursor.month()) {
            return Some(cursor);
        }
    }
    None
}

fn next_year_day(by_year_day: &[i32], from: NaiveDate) -> Option<NaiveDate> {
    // Eight years covers any leap-dependent ordinal (366 / -366).
    for year in from.year()..=from.year().checked_add(8)? {
        let best = by_year_day
            .iter()
            .filter_map(|&yd| resolve_year_day(year, yd))
            .filter(|&d| d > from)
            .min();
        if best.is_some() {
            return best;
        }
    }
    None
}

fn next_week_day(rule: &RecurrenceRule, from: NaiveDate) -> Option<NaiveDate> {
    for year in from.year()..=from.year().checked_add(1)? {
        let best = rule
            .by_week_no
            .iter()
            .filter_map(|&w| week_start_date(year, w, rule.week_start))
            .filter_map(|ws| {
                if ws > from {
                    Some(ws)
                } else if from < ws.checked_add_days(Days::new(6))? {
                    // Landed mid-week; the rest of the week still counts.
                    from.succ_opt()
                } else {
                    None
                }
            })
            .min();
        if best.is_some() {
            return best;
        }
    }
    None
}

fn next_month_day(by_month_day: &[i32], from: NaiveDate) -> Option<NaiveDate> {
    let mut cursor = NaiveDate::from_ymd_opt(from.year(), from.month(), 1)?;
    // 24 months crosses any month that lacks a requested day (Feb 30).
    for _ in 0..=24 {
        let best = by_month_day
            .iter()
            .filter_map(|&md| resolve_month_day(cursor.year(), cursor.month(), md))
            .filter_map(|day| NaiveDate::from_ymd_opt(cursor.year(), cursor.month(), day))
            .filter(|&d| d > from)
            .min();
        if best.is_some() {
            return best;
        }
        cursor = add_months(cursor, 1);
    }
    None
}

fn next_weekday_scan(rule: &RecurrenceRule, from: NaiveDate) -> Option<NaiveDate> {
    let matcher = Matcher::new(rule);
    let mut date = from.succ_opt()?;
    for _ in 0..DAY_SCAN_HORIZON {
        if matcher.day_matches(date) {
            return Some(date);
        }
        date = date.succ_opt()?;
    }
    None
}

/// Smallest wall-clock time strictly after `local` that could satisfy
/// the given time-level constraint, rolling into the next hour or day
/// when the current period's allowed values are exhausted.
pub(crate) fn next_time_for(
    rule: &RecurrenceRule,
    constraint: Constraint,
    local: NaiveDateTime,
) -> Option<NaiveDateTime> {
    match constraint {
        Constraint::Hour => {
            if let Some(&h) = rule.by_hour.iter().find(|&&h| h > local.hour()) {
                local.date().and_hms_opt(h, 0, 0)
            } else {
                let next_day = local.date().succ_opt()?;
                next_day.and_hms_opt(*rule.by_hour.first()?, 0, 0)
            }
        }
        Constraint::Minute => {
            if let Some(&m) = rule.by_minute.iter().find(|&&m| m > local.minute()) {
                local.date().and_hms_opt(local.hour(), m, 0)
            } else {
                let next_hour = local.date().and_hms_opt(local.hour(), 0, 0)?
                    + Duration::hours(1);
                next_hour.with_minute(*rule.by_minute.first()?)
            }
        }
        Constraint::Second => {
            if let Some(&s) = rule.by_second.iter().find(|&&s| s > local.second()) {
                local.date().and_hms_opt(local.hour(), local.minute(), s)
            } else {
                let next_minute = local
                    .date()
                    .and_hms_opt(local.hour(), local.minute(), 0)?
                    + Duration::minutes(1);
                next_minute.with_second(*rule.by_second.first()?)
            }
        }
        _ => Some(local + Duration::seconds(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Frequency, Rule};
    use chrono::{TimeZone, Weekday};

    fn rule_with(raw: Rule) -> RecurrenceRule {
        let dtstart = chrono_tz::UTC
            .with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
            .single()
            .unwrap();
        RecurrenceRule::new(raw, dtstart).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_jump_lands_on_first_of_next_allowed_month() {
        let rule = rule_with(Rule::new(Frequency::Secondly).by_month(vec![3, 11]));
        assert_eq!(
            next_date_for(&rule, Constraint::Month, date(2025, 4, 10)),
            Some(date(2025, 11, 1))
        );
        assert_eq!(
            next_date_for(&rule, Constraint::Month, date(2025, 12, 5)),
            Some(date(2026, 3, 1))
        );
    }

    #[test]
    fn month_day_jump_skips_months_lacking_the_day() {
        let rule = rule_with(Rule::new(Frequency::Secondly).by_month_day(vec![30]));
        assert_eq!(
            next_date_for(&rule, Constraint::MonthDay, date(2025, 1, 30)),
            Some(date(2025, 3, 30))
        );
    }

    #[test]
    fn year_day_jump_waits_for_a_leap_year() {
        let rule = rule_with(Rule::new(Frequency::Secondly).by_year_day(vec![366]));
        assert_eq!(
            next_date_for(&rule, Constraint::YearDay, date(2025, 1, 1)),
            Some(date(2028, 12, 31))
        );
    }

    #[test]
    fn week_no_jump_targets_the_week_start() {
        let rule = rule_with(Rule::new(Frequency::Secondly).by_week_no(vec![20]));
        // Week 20 of 2025 (Monday start) begins 2025-05-12.
        assert_eq!(
            next_date_for(&rule, Constraint::WeekNo, date(2025, 2, 1)),
            Some(date(2025, 5, 12))
        );
    }

    #[test]
    fn hour_jump_rolls_to_next_day_when_exhausted() {
        let rule = rule_with(Rule::new(Frequency::Secondly).by_hour(vec![6, 18]));
        let at = date(2025, 1, 15).and_hms_opt(19, 30, 0).unwrap();
        assert_eq!(
            next_time_for(&rule, Constraint::Hour, at),
            date(2025, 1, 16).and_hms_opt(6, 0, 0)
        );
        let noon = date(2025, 1, 15).and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(
            next_time_for(&rule, Constraint::Hour, noon),
            date(2025, 1, 15).and_hms_opt(18, 0, 0)
        );
    }

    #[test]
    fn alignment_stays_on_the_interval_grid() {
        let origin = chrono_tz::UTC
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap();
        let target = chrono_tz::UTC
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 50)
            .single()
            .unwrap();
        // 15-second grid: first slot at or after :50 is :60.
        let aligned = align_after(origin, target, 15);
        assert_eq!((aligned - origin).num_seconds(), 60);
        assert_eq!(align_after(origin, origin, 15), origin);
        // A target already on the grid stays put.
        let on_grid = origin + Duration::seconds(30);
        assert_eq!(align_after(origin, on_grid, 15), on_grid);
    }

    #[test]
    fn weekday_scan_finds_an_ordinal_weekday() {
        let rule = rule_with(
            Rule::new(Frequency::Minutely)
                .by_day(vec![crate::core::NthWeekday::nth(2, Weekday::Fri)]),
        );
        // Second Friday of February 2025 is the 14th.
        assert_eq!(
            next_date_for(&rule, Constraint::Day, date(2025, 1, 31)),
            Some(date(2025, 2, 14))
        );
    }
}
