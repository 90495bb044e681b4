//! Occurrence generation: strategy dispatch, emission, and bookkeeping.
//!
//! A traversal call selects one generation strategy, then pumps batches of
//! wall-clock candidates through a [`Sink`] that resolves them to zoned
//! instants, enforces the dtstart/UNTIL/COUNT bounds, and feeds the
//! caller's iterator callback. A [`Budget`] caps internal loop steps as
//! the backstop against constraint combinations with no reachable date.

pub(crate) mod anchor;
pub(crate) mod matcher;
pub(crate) mod reconcile;
pub(crate) mod setpos;
pub(crate) mod strategy;

pub(crate) use reconcile::reconcile;

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;

use crate::error::EvaluationError;
use crate::rule::RecurrenceRule;
use cadence_core::to_zoned;
use strategy::Strategy;

/// Runs the raw-rule phase: strategy generation bounded by dtstart, UNTIL,
/// COUNT, the iterator callback, and the step budget. RDATE/EXDATE
/// reconciliation happens on the returned sequence, not here.
pub(crate) fn run<F>(
    rule: &RecurrenceRule,
    callback: F,
) -> Result<Vec<DateTime<Tz>>, EvaluationError>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    let selected = Strategy::select(rule);
    tracing::debug!(strategy = ?selected, freq = %rule.freq, "expanding recurrence rule");

    let mut budget = Budget::new(rule.max_iterations);
    let mut sink = Sink::new(rule, callback);
    strategy::generate(rule, selected, &mut sink, &mut budget)?;
    sink.finish();
    Ok(sink.out)
}

/// Whether generation should keep going after an emission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Deterministic step cap shared by every strategy loop.
pub(crate) struct Budget {
    steps: usize,
    limit: usize,
}

impl Budget {
    fn new(limit: usize) -> Self {
        Self { steps: 0, limit }
    }

    pub(crate) fn tick(&mut self) -> Result<(), EvaluationError> {
        self.steps += 1;
        if self.steps > self.limit {
            Err(EvaluationError::IterationLimitExceeded { limit: self.limit })
        } else {
            Ok(())
        }
    }
}

/// Accepts candidates in ascending wall-clock order and applies the raw
/// emission rules: drop anything before dtstart, stop past UNTIL or at
/// COUNT, keep the emitted instants strictly ascending, and honor the
/// callback's stop signal.
pub(crate) struct Sink<F> {
    tz: Tz,
    dtstart: DateTime<Tz>,
    until: Option<DateTime<Tz>>,
    count: Option<usize>,
    pending_dtstart: bool,
    emitted: usize,
    callback: F,
    out: Vec<DateTime<Tz>>,
}

impl<F> Sink<F>
where
    F: FnMut(&DateTime<Tz>, usize) -> bool,
{
    fn new(rule: &RecurrenceRule, callback: F) -> Self {
        Self {
            tz: rule.tz,
            dtstart: rule.dtstart,
            until: rule.until,
            count: rule.count.map(|c| usize::try_from(c).unwrap_or(usize::MAX)),
            pending_dtstart: rule.include_dtstart,
            emitted: 0,
            callback,
            out: Vec::new(),
        }
    }

    /// Resolves a wall-clock candidate in the rule's zone and pushes it.
    /// Unresolvable times are silently absent, like calendar-invalid
    /// composite dates.
    pub(crate) fn offer(&mut self, local: NaiveDateTime) -> Flow {
        match to_zoned(local, self.tz) {
            Ok(dt) => self.push(dt),
            Err(err) => {
                tracing::trace!(%local, %err, "skipping unresolvable candidate");
                Flow::Continue
            }
        }
    }

    /// Pushes an already-resolved candidate.
    pub(crate) fn push(&mut self, occurrence: DateTime<Tz>) -> Flow {
        if occurrence < self.dtstart {
            return Flow::Continue;
        }
        if self.pending_dtstart {
            self.pending_dtstart = false;
            if occurrence > self.dtstart && self.emit(self.dtstart) == Flow::Stop {
                return Flow::Stop;
            }
        }
        self.emit(occurrence)
    }

    fn emit(&mut self, occurrence: DateTime<Tz>) -> Flow {
        if self.until.is_some_and(|u| occurrence > u) {
            return Flow::Stop;
        }
        if self.count.is_some_and(|c| self.emitted >= c) {
            return Flow::Stop;
        }
        // DST gap resolution can collapse wall-clock candidates onto one
        // instant or shift one past a later candidate; the raw sequence
        // must stay strictly ascending.
        if self.out.last().is_some_and(|last| *last >= occurrence) {
            return Flow::Continue;
        }
        if !(self.callback)(&occurrence, self.emitted) {
            return Flow::Stop;
        }
        self.out.push(occurrence);
        self.emitted += 1;
        if self.count == Some(self.emitted) {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// Flushes a pending dtstart for rules that stopped before producing
    /// any candidate at or after it.
    fn finish(&mut self) {
        if self.pending_dtstart {
            self.pending_dtstart = false;
            let _unused = self.emit(self.dtstart);
        }
    }
}

/// Time-of-day expansion grid for day-or-coarser frequencies: the sorted
/// cartesian product of BYHOUR x BYMINUTE x BYSECOND, with unset lists
/// defaulting to dtstart's field.
pub(crate) fn time_grid(rule: &RecurrenceRule) -> Vec<NaiveTime> {
    let hours = list_or(&rule.by_hour, rule.dtstart.hour());
    let minutes = list_or(&rule.by_minute, rule.dtstart.minute());
    let seconds = list_or(&rule.by_second, rule.dtstart.second());

    let mut grid = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
    for &h in &hours {
        for &m in &minutes {
            for &s in &seconds {
                if let Some(t) = NaiveTime::from_hms_opt(h, m, s) {
                    grid.push(t);
                }
            }
        }
    }
    grid
}

/// Minute/second expansion for an HOURLY cursor.
pub(crate) fn minute_second_grid(rule: &RecurrenceRule) -> Vec<(u32, u32)> {
    let minutes = list_or(&rule.by_minute, rule.dtstart.minute());
    let seconds = list_or(&rule.by_second, rule.dtstart.second());
    let mut grid = Vec::with_capacity(minutes.len() * seconds.len());
    for &m in &minutes {
        for &s in &seconds {
            grid.push((m, s));
        }
    }
    grid
}

/// Second expansion for a MINUTELY cursor.
pub(crate) fn second_grid(rule: &RecurrenceRule) -> Vec<u32> {
    list_or(&rule.by_second, rule.dtstart.second())
}

fn list_or(list: &[u32], default: u32) -> Vec<u32> {
    if list.is_empty() {
        vec![default]
    } else {
        list.to_vec()
    }
}
