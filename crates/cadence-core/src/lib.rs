//! Civil-calendar arithmetic and timezone resolution primitives.
//!
//! This crate is the trusted time layer underneath the recurrence engine:
//! Gregorian calendar queries (days in month/year, nth-weekday resolution,
//! week numbering), clamped calendar-unit addition, and DST-aware
//! resolution of wall-clock times to zoned instants.

pub mod calendar;
pub mod zone;

pub use calendar::{
    add_months, days_in_month, days_in_year, is_leap_year, month_delta, nth_weekday_in_month,
    nth_weekday_in_year, ordinal_position, resolve_month_day, resolve_year_day, start_of_week,
    week_of_year, week_start_date, weekday_dates_in_month, weeks_in_year,
};
pub use zone::{ZoneError, resolve_tzid, to_zoned};
