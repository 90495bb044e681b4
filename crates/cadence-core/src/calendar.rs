//! Gregorian calendar queries used by recurrence expansion.
//!
//! All functions operate on civil dates (`chrono::NaiveDate`); nothing here
//! touches timezones. Week numbering follows the ISO 8601 rule generalized
//! over the week-start day: a week belongs to the year containing its pivot
//! day (the fourth day of the week, Thursday when weeks start on Monday).

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Returns whether `year` is a Gregorian leap year.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Returns the number of days in the given month (1-12).
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Returns the number of days in the given year (365 or 366).
#[must_use]
pub const fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// Signed whole-month distance from `(from_year, from_month)` to
/// `(to_year, to_month)`.
#[must_use]
#[expect(clippy::cast_possible_wrap, reason = "months are 1-12")]
pub const fn month_delta(from_year: i32, from_month: u32, to_year: i32, to_month: u32) -> i32 {
    (to_year - from_year) * 12 + (to_month as i32 - from_month as i32)
}

/// Adds a signed number of months to a date, clamping the day to the last
/// day of the target month (Jan 31 + 1 month = Feb 28/29).
#[must_use]
#[expect(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    reason = "month index math stays within i32 range for representable dates"
)]
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Resolves a BYMONTHDAY-style ordinal (negative counts from the end of the
/// month) to a concrete day number, or `None` if the month has no such day.
#[must_use]
#[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss, reason = "day numbers fit in i32")]
pub fn resolve_month_day(year: i32, month: u32, ordinal: i32) -> Option<u32> {
    let max = days_in_month(year, month) as i32;
    let day = if ordinal < 0 { max + ordinal + 1 } else { ordinal };
    (1..=max).contains(&day).then_some(day as u32)
}

/// Resolves a BYYEARDAY-style ordinal (negative counts from the end of the
/// year) to a concrete date, or `None` if the year has no such day.
#[must_use]
#[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss, reason = "year days fit in i32")]
pub fn resolve_year_day(year: i32, ordinal: i32) -> Option<NaiveDate> {
    let max = days_in_year(year) as i32;
    let ord = if ordinal < 0 { max + ordinal + 1 } else { ordinal };
    if (1..=max).contains(&ord) {
        NaiveDate::from_yo_opt(year, ord as u32)
    } else {
        None
    }
}

/// Returns every date in the month falling on `weekday`, in ascending order.
#[must_use]
pub fn weekday_dates_in_month(year: i32, month: u32, weekday: Weekday) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let offset = weekday.days_since(first.weekday());
    let mut dates = Vec::with_capacity(5);
    let mut day = offset + 1;
    let max = days_in_month(year, month);
    while day <= max {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            dates.push(date);
        }
        day += 7;
    }
    dates
}

/// Resolves an ordinal weekday within a month (`2` = second, `-1` = last).
#[must_use]
pub fn nth_weekday_in_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: i32,
) -> Option<NaiveDate> {
    let dates = weekday_dates_in_month(year, month, weekday);
    index_ordinal(&dates, ordinal)
}

/// Resolves an ordinal weekday spanning the whole year (`20` = twentieth
/// such weekday, `-1` = last).
#[must_use]
pub fn nth_weekday_in_year(year: i32, weekday: Weekday, ordinal: i32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let offset = weekday.days_since(first.weekday());
    let start = first + Duration::days(i64::from(offset));
    let count = (days_in_year(year) - offset).div_ceil(7);
    let idx = ordinal_position(ordinal, count.try_into().ok()?)?;
    let idx = i64::try_from(idx).ok()?;
    Some(start + Duration::days(idx * 7))
}

/// Returns the date of `week_start` in the week containing `date`.
#[must_use]
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().days_since(week_start)))
}

/// Returns `(year, week)` for the week containing `date`, where the week's
/// identity year is the year containing its pivot day.
#[must_use]
pub fn week_of_year(date: NaiveDate, week_start: Weekday) -> (i32, u32) {
    let pivot = start_of_week(date, week_start) + Duration::days(3);
    (pivot.year(), pivot.ordinal0() / 7 + 1)
}

/// Number of numbered weeks in a year: 53 iff January 1 or December 31
/// falls on the pivot weekday, otherwise 52.
#[must_use]
pub fn weeks_in_year(year: i32, week_start: Weekday) -> u32 {
    let pivot_weekday = week_start.succ().succ().succ();
    let has_53 = NaiveDate::from_ymd_opt(year, 1, 1)
        .is_some_and(|d| d.weekday() == pivot_weekday)
        || NaiveDate::from_ymd_opt(year, 12, 31).is_some_and(|d| d.weekday() == pivot_weekday);
    if has_53 { 53 } else { 52 }
}

/// Returns the first day of week `week` (1-based, negative counts from the
/// last week) of `year`, or `None` if the year has no such week.
#[must_use]
#[expect(clippy::cast_possible_wrap, reason = "week counts fit in i32")]
pub fn week_start_date(year: i32, week: i32, week_start: Weekday) -> Option<NaiveDate> {
    let total = weeks_in_year(year, week_start) as i32;
    let week = if week < 0 { total + week + 1 } else { week };
    if !(1..=total).contains(&week) {
        return None;
    }
    let pivot_weekday = week_start.succ().succ().succ();
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let first_pivot = jan1 + Duration::days(i64::from(pivot_weekday.days_since(jan1.weekday())));
    let week1_start = first_pivot - Duration::days(3);
    Some(week1_start + Duration::days(i64::from(week - 1) * 7))
}

/// Resolves an ordinal into a slice the RFC 5545 way: `n-1` for positive
/// `n`, `len+n` for negative, out-of-range yields `None`.
fn index_ordinal(dates: &[NaiveDate], ordinal: i32) -> Option<NaiveDate> {
    let idx = ordinal_position(ordinal, dates.len())?;
    dates.get(idx).copied()
}

/// Resolves a 1-based RFC 5545 ordinal into an index over a list of
/// `len` candidates: `n-1` for positive `n`, `len+n` for negative;
/// out-of-range and zero yield `None`.
#[must_use]
pub fn ordinal_position(ordinal: i32, len: usize) -> Option<usize> {
    if ordinal == 0 {
        return None;
    }
    let len = i32::try_from(len).ok()?;
    let idx = if ordinal > 0 { ordinal - 1 } else { len + ordinal };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}
