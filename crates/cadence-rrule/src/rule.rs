//! Validated recurrence rule and the public traversal API.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::core::{Frequency, NthWeekday, Rule, Until};
use crate::error::{EvaluationError, ValidationError};
use crate::expand;
use cadence_core::to_zoned;

/// Default cap on internal generation steps.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// A sanitized, immutable recurrence rule anchored at a DTSTART.
///
/// Construction performs one-shot validation and range filtering; after
/// that the rule never changes, so a single instance can be traversed
/// concurrently from multiple threads. Each traversal call
/// ([`all`](Self::all), [`between`](Self::between), [`next`](Self::next),
/// [`previous`](Self::previous)) keeps its cursor state on the stack and
/// discards it on return.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    pub(crate) freq: Frequency,
    pub(crate) interval: u32,
    pub(crate) count: Option<u32>,
    pub(crate) until: Option<DateTime<Tz>>,
    pub(crate) week_start: Weekday,
    pub(crate) by_second: Vec<u32>,
    pub(crate) by_minute: Vec<u32>,
    pub(crate) by_hour: Vec<u32>,
    pub(crate) by_day: Vec<NthWeekday>,
    pub(crate) by_month_day: Vec<i32>,
    pub(crate) by_year_day: Vec<i32>,
    pub(crate) by_week_no: Vec<i32>,
    pub(crate) by_month: Vec<u32>,
    pub(crate) by_set_pos: Vec<i32>,
    pub(crate) dtstart: DateTime<Tz>,
    pub(crate) tz: Tz,
    pub(crate) rdates: Vec<DateTime<Tz>>,
    pub(crate) exdates: Vec<DateTime<Tz>>,
    pub(crate) max_iterations: usize,
    pub(crate) include_dtstart: bool,
}

impl RecurrenceRule {
    /// ## Summary
    /// Sanitizes a raw [`Rule`] into a validated recurrence rule anchored
    /// at `dtstart`. Occurrences are generated in `dtstart`'s timezone.
    ///
    /// Out-of-range numeric BY* entries are silently dropped per RFC 5545;
    /// a list that becomes empty is treated as unset.
    ///
    /// ## Errors
    /// - [`ValidationError::MissingFrequency`] when the rule has no FREQ.
    /// - [`ValidationError::InvalidInterval`] when INTERVAL is 0.
    /// - [`ValidationError::ZeroBySetPos`] when BYSETPOS contains 0.
    /// - [`ValidationError::Zone`] when UNTIL cannot be resolved in the
    ///   rule's timezone.
    pub fn new(rule: Rule, dtstart: DateTime<Tz>) -> Result<Self, ValidationError> {
        let freq = rule.freq.ok_or(ValidationError::MissingFrequency)?;
        let interval = match rule.interval {
            Some(0) => return Err(ValidationError::InvalidInterval(0)),
            Some(n) => n,
            None => 1,
        };
        if rule.by_set_pos.contains(&0) {
            return Err(ValidationError::ZeroBySetPos);
        }

        let tz = dtstart.timezone();
        let until = rule.until.map(|u| resolve_until(u, tz)).transpose()?;

        Ok(Self {
            freq,
            interval,
            count: rule.count,
            until,
            week_start: rule.week_start.unwrap_or(Weekday::Mon),
            by_second: sanitize_range(rule.by_second, 59),
            by_minute: sanitize_range(rule.by_minute, 59),
            by_hour: sanitize_range(rule.by_hour, 23),
            by_day: rule.by_day,
            by_month_day: sanitize_signed(rule.by_month_day, 31),
            by_year_day: sanitize_signed(rule.by_year_day, 366),
            by_week_no: sanitize_signed(rule.by_week_no, 53),
            by_month: {
                let mut months: Vec<u32> = rule
                    .by_month
                    .into_iter()
                    .filter(|m| (1..=12).contains(m))
                    .collect();
                months.sort_unstable();
                months.dedup();
                months
            },
            by_set_pos: rule.by_set_pos,
            dtstart,
            tz,
            rdates: Vec::new(),
            exdates: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            include_dtstart: false,
        })
    }

    /// Adds RDATE entries (exact-instant semantics, taken verbatim).
    #[must_use]
    pub fn with_rdates(mut self, rdates: impl Into<Vec<DateTime<Tz>>>) -> Self {
        self.rdates = rdates.into();
        self
    }

    /// Adds EXDATE entries (exact-instant semantics).
    #[must_use]
    pub fn with_exdates(mut self, exdates: impl Into<Vec<DateTime<Tz>>>) -> Self {
        self.exdates = exdates.into();
        self
    }

    /// Overrides the internal step cap (default 10000).
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Emits `dtstart` as the first occurrence even when it does not
    /// itself satisfy the rule.
    #[must_use]
    pub fn with_include_dtstart(mut self, include: bool) -> Self {
        self.include_dtstart = include;
        self
    }

    /// The rule's frequency.
    #[must_use]
    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    /// The rule's interval (>= 1).
    #[must_use]
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// The anchor timestamp.
    #[must_use]
    pub fn dtstart(&self) -> DateTime<Tz> {
        self.dtstart
    }

    /// The zone all occurrences are expressed in.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// ## Summary
    /// Computes the full occurrence sequence: the raw rule expansion
    /// merged with RDATE entries, minus EXDATE entries, trimmed to COUNT.
    ///
    /// ## Errors
    /// - [`EvaluationError::UnboundedQuery`] when the rule has neither
    ///   COUNT nor UNTIL; use [`all_with`](Self::all_with) to supply a
    ///   stopping callback instead.
    /// - [`EvaluationError::IterationLimitExceeded`] when generation
    ///   exceeds the configured step cap.
    pub fn all(&self) -> Result<Vec<DateTime<Tz>>, EvaluationError> {
        if self.count.is_none() && self.until.is_none() {
            return Err(EvaluationError::UnboundedQuery);
        }
        self.all_with(|_, _| true)
    }

    /// ## Summary
    /// Like [`all`](Self::all), but invokes `iterator` once per raw
    /// candidate (before the RDATE merge) with the candidate and its
    /// zero-based index; returning `false` stops generation without
    /// emitting that candidate.
    ///
    /// ## Errors
    /// Returns [`EvaluationError::IterationLimitExceeded`] when generation
    /// exceeds the configured step cap.
    pub fn all_with<F>(&self, iterator: F) -> Result<Vec<DateTime<Tz>>, EvaluationError>
    where
        F: FnMut(&DateTime<Tz>, usize) -> bool,
    {
        let raw = expand::run(self, iterator)?;
        Ok(expand::reconcile(raw, &self.rdates, &self.exdates, self.count))
    }

    /// ## Summary
    /// Occurrences between two absolute instants. Boundary occurrences
    /// are included only when `inclusive` is set.
    ///
    /// Operates on a derived transient rule with UNTIL clamped to
    /// `before` and COUNT cleared; the original rule is untouched.
    ///
    /// ## Errors
    /// Returns [`EvaluationError::IterationLimitExceeded`] when generation
    /// exceeds the configured step cap.
    pub fn between(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
        inclusive: bool,
    ) -> Result<Vec<DateTime<Tz>>, EvaluationError> {
        let clamp = before.with_timezone(&self.tz);
        let mut derived = self.clone();
        derived.count = None;
        derived.until = Some(match self.until {
            Some(u) if u < clamp => u,
            _ => clamp,
        });

        let occurrences = derived.all()?;
        Ok(occurrences
            .into_iter()
            .filter(|occ| {
                let t = occ.with_timezone(&Utc);
                if inclusive {
                    t >= after && t <= before
                } else {
                    t > after && t < before
                }
            })
            .collect())
    }

    /// ## Summary
    /// The first occurrence strictly after `after` (or at-or-after when
    /// `inclusive`), or `None` if the rule ends before then.
    ///
    /// ## Errors
    /// Returns [`EvaluationError::IterationLimitExceeded`] when generation
    /// exceeds the configured step cap.
    pub fn next(
        &self,
        after: DateTime<Utc>,
        inclusive: bool,
    ) -> Result<Option<DateTime<Tz>>, EvaluationError> {
        let mut found = None;
        expand::run(self, |occ, _| {
            let t = occ.with_timezone(&Utc);
            let hit = if inclusive { t >= after } else { t > after };
            if hit {
                found = Some(*occ);
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }

    /// ## Summary
    /// The last occurrence strictly before `before` (or at-or-before when
    /// `inclusive`), or `None` if the rule starts after then.
    ///
    /// Generation ascends monotonically, so the scan keeps the latest
    /// candidate seen and stops as soon as one crosses the boundary.
    ///
    /// ## Errors
    /// Returns [`EvaluationError::IterationLimitExceeded`] when generation
    /// exceeds the configured step cap.
    pub fn previous(
        &self,
        before: DateTime<Utc>,
        inclusive: bool,
    ) -> Result<Option<DateTime<Tz>>, EvaluationError> {
        let mut kept = None;
        expand::run(self, |occ, _| {
            let t = occ.with_timezone(&Utc);
            let within = if inclusive { t <= before } else { t < before };
            if within {
                kept = Some(*occ);
                true
            } else {
                false
            }
        })?;
        Ok(kept)
    }
}

/// Keeps in-range values, sorted ascending and deduplicated.
fn sanitize_range(values: Vec<u32>, max: u32) -> Vec<u32> {
    let mut values: Vec<u32> = values.into_iter().filter(|v| *v <= max).collect();
    values.sort_unstable();
    values.dedup();
    values
}

/// Keeps non-zero values within `[-max, max]`, sorted and deduplicated.
fn sanitize_signed(values: Vec<i32>, max: i32) -> Vec<i32> {
    let mut values: Vec<i32> = values
        .into_iter()
        .filter(|v| *v != 0 && (-max..=max).contains(v))
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn resolve_until(until: Until, tz: Tz) -> Result<DateTime<Tz>, ValidationError> {
    match until {
        // A date-only boundary covers the whole day.
        Until::Date(d) => {
            let end_of_day = d.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default());
            Ok(to_zoned(end_of_day, tz)?)
        }
        Until::Local(dt) => Ok(to_zoned(dt, tz)?),
        Until::Instant(dt) => Ok(dt.with_timezone(&tz)),
    }
}
