//! Per-frequency generation strategies.
//!
//! One strategy is selected per traversal call from `(frequency, which
//! BY* filters are set)`, in priority order; strategies never call each
//! other mid-generation. Each one drives a period cursor, builds the
//! period's sorted candidate batch, applies BYSETPOS, and feeds the
//! sink until it signals stop or the budget runs out.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use chrono_tz::Tz;

use crate::core::Frequency;
use crate::error::EvaluationError;
use crate::expand::matcher::{Constraint, Matcher};
use crate::expand::{Budget, Flow, Sink, anchor, minute_second_grid, second_grid, setpos, time_grid};
use crate::rule::RecurrenceRule;
use cadence_core::{
    add_months, days_in_month, month_delta, nth_weekday_in_year, resolve_year_day, start_of_week,
    to_zoned,
};

/// The selected generation loop for one traversal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// MONTHLY with BYDAY and/or BYMONTHDAY: per-month day batches.
    MonthlyOnDays,
    /// WEEKLY (without BYYEARDAY): WKST-aligned week batches.
    WeeklyByWeekdays,
    /// MONTHLY with BYMONTH only: linear month-index walk.
    MonthlyInMonths,
    /// YEARLY with BYMONTH only: one day per selected month per year.
    YearlyInMonths,
    /// YEARLY with day-level expansion, or WEEKLY with BYYEARDAY:
    /// whole-year batches.
    YearlyExpanded,
    /// MINUTELY/SECONDLY limited by date-level filters: jump scan.
    SubDailyScan,
    /// MONTHLY with BYYEARDAY only: year-day dates on the month grid.
    MonthlyOnYearDays,
    /// MINUTELY/HOURLY/DAILY with BYSETPOS: per-period selection.
    PeriodSetPos,
    Generic,
}

impl Strategy {
    pub(crate) fn select(rule: &RecurrenceRule) -> Self {
        let date_filtered = !rule.by_month.is_empty()
            || !rule.by_week_no.is_empty()
            || !rule.by_year_day.is_empty()
            || !rule.by_month_day.is_empty()
            || !rule.by_day.is_empty();
        match rule.freq {
            Frequency::Monthly
                if !rule.by_day.is_empty() || !rule.by_month_day.is_empty() =>
            {
                Self::MonthlyOnDays
            }
            Frequency::Weekly if rule.by_year_day.is_empty() => Self::WeeklyByWeekdays,
            Frequency::Monthly
                if !rule.by_month.is_empty() && rule.by_year_day.is_empty() =>
            {
                Self::MonthlyInMonths
            }
            Frequency::Yearly
                if !rule.by_month.is_empty()
                    && rule.by_day.is_empty()
                    && rule.by_month_day.is_empty()
                    && rule.by_year_day.is_empty()
                    && rule.by_week_no.is_empty() =>
            {
                Self::YearlyInMonths
            }
            Frequency::Yearly
                if !rule.by_day.is_empty()
                    || !rule.by_month_day.is_empty()
                    || !rule.by_year_day.is_empty()
                    || !rule.by_week_no.is_empty() =>
            {
                Self::YearlyExpanded
            }
            Frequency::Weekly => Self::YearlyExpanded,
            Frequency::Minutely | Frequency::Secondly if date_filtered => Self::SubDailyScan,
            Frequency::Monthly if !rule.by_year_day.is_empty() => Self::MonthlyOnYearDays,
            Frequency::Minutely | Frequency::Hourly | Frequency::Daily
                if !rule.by_set_pos.is_empty() =>
            {
                Self::PeriodSetPos
            }
            _ => Self::Generic,
        }
    }
}

pub(crate) fn generate<F>(
    rule: &RecurrenceRule,
    strategy: Strategy,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    match strategy {
        Strategy::MonthlyOnDays => monthly_on_days(rule, sink, budget),
        Strategy::WeeklyByWeekdays => weekly_by_weekdays(rule, sink, budget),
        Strategy::MonthlyInMonths => monthly_in_months(rule, sink, budget),
        Strategy::YearlyInMonths => yearly_in_months(rule, sink, budget),
        Strategy::YearlyExpanded => yearly_expanded(rule, sink, budget),
        Strategy::SubDailyScan => sub_daily_scan(rule, sink, budget),
        Strategy::MonthlyOnYearDays => monthly_on_year_days(rule, sink, budget),
        Strategy::PeriodSetPos => period_set_pos(rule, sink, budget),
        Strategy::Generic => match rule.freq {
            Frequency::Yearly => yearly_plain(rule, sink, budget),
            Frequency::Monthly => monthly_plain(rule, sink, budget),
            Frequency::Weekly => weekly_by_weekdays(rule, sink, budget),
            Frequency::Daily => daily_scan(rule, sink, budget),
            _ => sub_daily_scan(rule, sink, budget),
        },
    }
}

/// Applies BYSETPOS to a period batch and feeds the survivors through.
fn offer_batch<F>(sink: &mut Sink<F>, batch: Vec<NaiveDateTime>, positions: &[i32]) -> Flow
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    for local in setpos::select(batch, positions) {
        if sink.offer(local) == Flow::Stop {
            return Flow::Stop;
        }
    }
    Flow::Continue
}

/// Whether a period starting at `date` lies wholly past UNTIL; lets the
/// periodic loops terminate on rules whose filters stop matching long
/// before the boundary.
fn past_until(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    rule.until.is_some_and(|u| date > u.date_naive())
}

/// The interval as a signed step for month/year cursor arithmetic.
fn interval_step(rule: &RecurrenceRule) -> i32 {
    i32::try_from(rule.interval).unwrap_or(i32::MAX)
}

fn monthly_on_days<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let step = interval_step(rule);
    let Some(mut month) = NaiveDate::from_ymd_opt(ds_local.date().year(), ds_local.date().month(), 1)
    else {
        return Ok(());
    };
    let mut first_period = true;

    loop {
        budget.tick()?;
        if past_until(rule, month) {
            return Ok(());
        }
        let mut batch = Vec::new();
        for day in 1..=days_in_month(month.year(), month.month()) {
            let Some(date) = NaiveDate::from_ymd_opt(month.year(), month.month(), day) else {
                continue;
            };
            if matcher.date_ok(date) {
                for &t in &times {
                    batch.push(date.and_time(t));
                }
            }
        }
        batch.sort_unstable();
        // A batch straddling dtstart mid-month would re-emit dtstart after
        // earlier same-month candidates were dropped; skip the month.
        let skip = first_period
            && batch.iter().any(|&t| t < ds_local)
            && batch.contains(&ds_local);
        first_period = false;
        if !skip && offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
            return Ok(());
        }
        month = add_months(month, step);
    }
}

fn weekly_by_weekdays<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_date = rule.dtstart.date_naive();

    let targets: Vec<Weekday> = if rule.by_day.is_empty() {
        if rule.by_month_day.is_empty() {
            vec![ds_date.weekday()]
        } else {
            // BYMONTHDAY without BYDAY: any weekday can qualify.
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]
        }
    } else {
        rule.by_day.iter().map(|t| t.weekday).collect()
    };

    let first_qualifying = (0..7)
        .filter_map(|i| ds_date.checked_add_days(Days::new(i)))
        .find(|d| targets.contains(&d.weekday()))
        .unwrap_or(ds_date);
    let mut week = start_of_week(first_qualifying, rule.week_start);
    let step_days = u64::from(rule.interval) * 7;

    loop {
        budget.tick()?;
        if past_until(rule, week) {
            return Ok(());
        }
        let mut batch = Vec::new();
        for i in 0..7 {
            let Some(date) = week.checked_add_days(Days::new(i)) else {
                return Ok(());
            };
            if targets.contains(&date.weekday())
                && matcher.month_matches(date)
                && matcher.week_no_matches(date)
                && matcher.month_day_matches(date)
            {
                for &t in &times {
                    batch.push(date.and_time(t));
                }
            }
        }
        batch.sort_unstable();
        if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
            return Ok(());
        }
        let Some(next) = week.checked_add_days(Days::new(step_days)) else {
            return Ok(());
        };
        week = next;
    }
}

/// Linear month-index walk: `months[index % len]` in year
/// `base + index / len`, preserving the requested month ordering across
/// year boundaries. The interval is not consulted, matching the RFC's
/// treatment of BYMONTH as an explicit month list.
fn monthly_in_months<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let months = &rule.by_month;
    let len = months.len();
    let base_year = ds_local.date().year();
    let day = ds_local.date().day();

    let mut idx = months
        .iter()
        .position(|&m| m >= ds_local.date().month())
        .unwrap_or(len);

    loop {
        budget.tick()?;
        let Ok(span) = i32::try_from(idx / len) else {
            return Ok(());
        };
        let Some(year) = base_year.checked_add(span) else {
            return Ok(());
        };
        let month = months[idx % len];
        if let Some(period) = NaiveDate::from_ymd_opt(year, month, 1) {
            if past_until(rule, period) {
                return Ok(());
            }
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let batch: Vec<NaiveDateTime> = times.iter().map(|&t| date.and_time(t)).collect();
            if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
                return Ok(());
            }
        }
        idx += 1;
    }
}

fn yearly_in_months<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let day = ds_local.date().day();
    let step = interval_step(rule);
    let mut year = ds_local.date().year();

    loop {
        budget.tick()?;
        if NaiveDate::from_ymd_opt(year, 1, 1).is_some_and(|jan| past_until(rule, jan)) {
            return Ok(());
        }
        let mut batch = Vec::new();
        for &month in &rule.by_month {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                for &t in &times {
                    batch.push(date.and_time(t));
                }
            }
        }
        if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
            return Ok(());
        }
        let Some(next) = year.checked_add(step) else {
            return Ok(());
        };
        year = next;
    }
}

fn yearly_expanded<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    // WEEKLY with BYYEARDAY walks years one at a time; the interval is a
    // week count, not a year count.
    let step = if rule.freq == Frequency::Weekly {
        1
    } else {
        interval_step(rule)
    };
    // Ordinal BYDAY with no BYMONTH resolves over the whole year rather
    // than month buckets.
    let year_scope = rule.by_month.is_empty() && rule.by_day.iter().any(|t| t.ordinal.is_some());
    let mut year = ds_local.date().year();

    loop {
        budget.tick()?;
        if NaiveDate::from_ymd_opt(year, 1, 1).is_some_and(|jan| past_until(rule, jan)) {
            return Ok(());
        }
        let mut dates: Vec<NaiveDate> = Vec::new();
        if year_scope {
            for token in &rule.by_day {
                match token.ordinal {
                    Some(ord) => {
                        if let Some(d) = nth_weekday_in_year(year, token.weekday, ord) {
                            dates.push(d);
                        }
                    }
                    None => dates.extend(weekdays_of_year(year, token.weekday)),
                }
            }
            dates.retain(|&d| {
                matcher.year_day_matches(d)
                    && matcher.week_no_matches(d)
                    && matcher.month_day_matches(d)
            });
        } else {
            let months: Vec<u32> = if rule.by_month.is_empty() {
                (1..=12).collect()
            } else {
                rule.by_month.clone()
            };
            for &month in &months {
                for day in 1..=days_in_month(year, month) {
                    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                        continue;
                    };
                    if matcher.date_ok(date) {
                        dates.push(date);
                    }
                }
            }
        }
        dates.sort_unstable();
        dates.dedup();

        let mut batch = Vec::with_capacity(dates.len() * times.len());
        for date in dates {
            for &t in &times {
                batch.push(date.and_time(t));
            }
        }
        batch.sort_unstable();
        if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
            return Ok(());
        }
        let Some(next) = year.checked_add(step) else {
            return Ok(());
        };
        year = next;
    }
}

fn weekdays_of_year(year: i32, weekday: Weekday) -> Vec<NaiveDate> {
    let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let offset = weekday.days_since(jan1.weekday());
    let mut dates = Vec::with_capacity(53);
    let mut date = jan1.checked_add_days(Days::new(u64::from(offset)));
    while let Some(d) = date {
        if d.year() != year {
            break;
        }
        dates.push(d);
        date = d.checked_add_days(Days::new(7));
    }
    dates
}

/// Interval-grid scan for sub-daily frequencies: test each grid instant
/// against the full filter conjunction, and on failure jump straight to
/// the next plausible candidate for the first failing constraint,
/// realigned to the grid.
fn sub_daily_scan<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let step = anchor::step_seconds(rule);
    let mut cur = rule.dtstart;

    loop {
        budget.tick()?;
        if rule.until.is_some_and(|u| cur > u) {
            return Ok(());
        }
        match matcher.first_failing(&cur) {
            None => {
                if sink.push(cur) == Flow::Stop {
                    return Ok(());
                }
                cur += Duration::seconds(step);
            }
            Some(
                c @ (Constraint::Month
                | Constraint::YearDay
                | Constraint::WeekNo
                | Constraint::MonthDay
                | Constraint::Day),
            ) => {
                let Some(date) = anchor::next_date_for(rule, c, cur.date_naive()) else {
                    return Ok(());
                };
                let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
                    return Ok(());
                };
                cur = jump_to(rule, cur, midnight, step);
            }
            Some(c) => {
                let Some(target) = anchor::next_time_for(rule, c, cur.naive_local()) else {
                    return Ok(());
                };
                cur = jump_to(rule, cur, target, step);
            }
        }
    }
}

/// Resolves a jump target and realigns it onto the interval grid,
/// guaranteeing forward progress even across DST folds.
fn jump_to(rule: &RecurrenceRule, cur: DateTime<Tz>, target: NaiveDateTime, step: i64) -> DateTime<Tz> {
    match to_zoned(target, rule.tz) {
        Ok(t) => {
            let aligned = anchor::align_after(rule.dtstart, t, step);
            if aligned > cur {
                aligned
            } else {
                cur + Duration::seconds(step)
            }
        }
        Err(_) => cur + Duration::seconds(step),
    }
}

fn monthly_on_year_days<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let (ds_year, ds_month) = (ds_local.date().year(), ds_local.date().month());
    let step = interval_step(rule);
    let mut year = ds_year;

    loop {
        budget.tick()?;
        if NaiveDate::from_ymd_opt(year, 1, 1).is_some_and(|jan| past_until(rule, jan)) {
            return Ok(());
        }
        let mut dates: Vec<NaiveDate> = rule
            .by_year_day
            .iter()
            .filter_map(|&yd| resolve_year_day(year, yd))
            .filter(|d| {
                month_delta(ds_year, ds_month, d.year(), d.month()).rem_euclid(step) == 0
                    && (rule.by_month.is_empty() || rule.by_month.contains(&d.month()))
            })
            .collect();
        dates.sort_unstable();
        dates.dedup();

        let mut batch = Vec::with_capacity(dates.len() * times.len());
        for date in dates {
            for &t in &times {
                batch.push(date.and_time(t));
            }
        }
        if offer_batch(sink, batch, &[]) == Flow::Stop {
            return Ok(());
        }
        let Some(next) = year.checked_add(1) else {
            return Ok(());
        };
        year = next;
    }
}

fn period_set_pos<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    if rule.freq == Frequency::Daily {
        daily_scan(rule, sink, budget)
    } else {
        sub_daily_periods(rule, sink, budget)
    }
}

/// HOURLY/MINUTELY with BYSETPOS: the period is one interval step; the
/// finer time fields expand within it before selection.
fn sub_daily_periods<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let step = anchor::step_seconds(rule);
    let hourly_combos = minute_second_grid(rule);
    let minutely_combos = second_grid(rule);
    let mut cur = rule.dtstart;

    loop {
        budget.tick()?;
        if rule.until.is_some_and(|u| cur > u) {
            return Ok(());
        }
        let date = cur.date_naive();
        if let Some(c) = matcher.first_failing_date(date) {
            let Some(target) = anchor::next_date_for(rule, c, date) else {
                return Ok(());
            };
            let Some(midnight) = target.and_hms_opt(0, 0, 0) else {
                return Ok(());
            };
            cur = jump_to(rule, cur, midnight, step);
            continue;
        }

        let mut batch: Vec<DateTime<Tz>> = Vec::new();
        if rule.freq == Frequency::Hourly {
            for &(minute, second) in &hourly_combos {
                if let Some(local) = date.and_hms_opt(cur.hour(), minute, second) {
                    if let Ok(t) = to_zoned(local, rule.tz) {
                        if matcher.time_ok(&t) {
                            batch.push(t);
                        }
                    }
                }
            }
        } else {
            for &second in &minutely_combos {
                if let Some(local) = date.and_hms_opt(cur.hour(), cur.minute(), second) {
                    if let Ok(t) = to_zoned(local, rule.tz) {
                        if matcher.time_ok(&t) {
                            batch.push(t);
                        }
                    }
                }
            }
        }
        batch.sort_unstable();
        batch.dedup();
        if batch.is_empty() {
            // The whole period is filtered out; jump past the excluded
            // hours instead of grinding through them one step at a time.
            cur = match matcher.first_failing(&cur) {
                Some(c @ (Constraint::Hour | Constraint::Minute | Constraint::Second)) => {
                    match anchor::next_time_for(rule, c, cur.naive_local()) {
                        Some(target) => jump_to(rule, cur, target, step),
                        None => cur + Duration::seconds(step),
                    }
                }
                _ => cur + Duration::seconds(step),
            };
            continue;
        }
        for occ in setpos::select(batch, &rule.by_set_pos) {
            if sink.push(occ) == Flow::Stop {
                return Ok(());
            }
        }
        cur += Duration::seconds(step);
    }
}

fn daily_scan<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_date = rule.dtstart.date_naive();
    let interval_days = i64::from(rule.interval);
    let mut date = ds_date;

    loop {
        budget.tick()?;
        if past_until(rule, date) {
            return Ok(());
        }
        if let Some(c) = matcher.first_failing_date(date) {
            let Some(target) = anchor::next_date_for(rule, c, date) else {
                return Ok(());
            };
            // Realign the jump target onto the interval grid from dtstart.
            let delta = (target - ds_date).num_days();
            let rem = delta.rem_euclid(interval_days);
            let advance = if rem == 0 {
                delta
            } else {
                delta + interval_days - rem
            };
            let Some(next) = ds_date.checked_add_signed(Duration::days(advance)) else {
                return Ok(());
            };
            date = if next > date {
                next
            } else {
                match date.checked_add_signed(Duration::days(interval_days)) {
                    Some(d) => d,
                    None => return Ok(()),
                }
            };
        } else {
            let batch: Vec<NaiveDateTime> = times.iter().map(|&t| date.and_time(t)).collect();
            if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
                return Ok(());
            }
            let Some(next) = date.checked_add_signed(Duration::days(interval_days)) else {
                return Ok(());
            };
            date = next;
        }
    }
}

/// MONTHLY with no day-level filters: dtstart's day-of-month each
/// period, skipping months that lack it.
fn monthly_plain<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let day = ds_local.date().day();
    let step = interval_step(rule);
    let Some(mut month) = NaiveDate::from_ymd_opt(ds_local.date().year(), ds_local.date().month(), 1)
    else {
        return Ok(());
    };

    loop {
        budget.tick()?;
        if past_until(rule, month) {
            return Ok(());
        }
        if let Some(date) = NaiveDate::from_ymd_opt(month.year(), month.month(), day) {
            if matcher.date_ok(date) {
                let batch: Vec<NaiveDateTime> = times.iter().map(|&t| date.and_time(t)).collect();
                if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
                    return Ok(());
                }
            }
        }
        month = add_months(month, step);
    }
}

/// YEARLY with no BY* expansion: dtstart's month and day each period,
/// skipping years where the date does not exist (Feb 29).
fn yearly_plain<F>(
    rule: &RecurrenceRule,
    sink: &mut Sink<F>,
    budget: &mut Budget,
) -> Result<(), EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let matcher = Matcher::new(rule);
    let times = time_grid(rule);
    let ds_local = rule.dtstart.naive_local();
    let (month, day) = (ds_local.date().month(), ds_local.date().day());
    let step = interval_step(rule);
    let mut year = ds_local.date().year();

    loop {
        budget.tick()?;
        if NaiveDate::from_ymd_opt(year, 1, 1).is_some_and(|jan| past_until(rule, jan)) {
            return Ok(());
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            if matcher.date_ok(date) {
                let batch: Vec<NaiveDateTime> = times.iter().map(|&t| date.and_time(t)).collect();
                if offer_batch(sink, batch, &rule.by_set_pos) == Flow::Stop {
                    return Ok(());
                }
            }
        }
        let Some(next) = year.checked_add(step) else {
            return Ok(());
        };
        year = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NthWeekday, Rule};
    use chrono::TimeZone;

    fn rule_with(raw: Rule) -> RecurrenceRule {
        let dtstart = chrono_tz::UTC
            .with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
            .single()
            .unwrap();
        RecurrenceRule::new(raw, dtstart).unwrap()
    }

    #[test]
    fn dispatch_follows_priority_order() {
        let cases = [
            (
                Rule::new(Frequency::Monthly).by_month_day(vec![15]),
                Strategy::MonthlyOnDays,
            ),
            (
                Rule::new(Frequency::Monthly)
                    .by_day(vec![NthWeekday::every(Weekday::Mon)])
                    .by_month(vec![3]),
                Strategy::MonthlyOnDays,
            ),
            (Rule::new(Frequency::Weekly), Strategy::WeeklyByWeekdays),
            (
                Rule::new(Frequency::Monthly).by_month(vec![3, 6]),
                Strategy::MonthlyInMonths,
            ),
            (
                Rule::new(Frequency::Yearly).by_month(vec![4]),
                Strategy::YearlyInMonths,
            ),
            (
                Rule::new(Frequency::Yearly).by_week_no(vec![20]),
                Strategy::YearlyExpanded,
            ),
            (
                Rule::new(Frequency::Weekly).by_year_day(vec![100]),
                Strategy::YearlyExpanded,
            ),
            (
                Rule::new(Frequency::Secondly).by_month(vec![2]),
                Strategy::SubDailyScan,
            ),
            (
                Rule::new(Frequency::Monthly).by_year_day(vec![100]),
                Strategy::MonthlyOnYearDays,
            ),
            (
                Rule::new(Frequency::Daily).by_set_pos(vec![1]),
                Strategy::PeriodSetPos,
            ),
            (Rule::new(Frequency::Daily), Strategy::Generic),
            (Rule::new(Frequency::Hourly), Strategy::Generic),
        ];
        for (raw, expected) in cases {
            let rule = rule_with(raw);
            assert_eq!(Strategy::select(&rule), expected, "freq {}", rule.freq);
        }
    }

    #[test]
    fn weekdays_of_year_covers_every_monday() {
        let mondays = weekdays_of_year(2025, Weekday::Mon);
        assert_eq!(mondays.len(), 52);
        assert_eq!(mondays[0], NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert!(mondays.iter().all(|d| d.weekday() == Weekday::Mon));
    }
}
