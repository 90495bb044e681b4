//! RFC 5545 recurrence rule expansion.
//!
//! Turns a recurrence rule (`FREQ`/`INTERVAL`/`COUNT`/`UNTIL`/`WKST`, the
//! nine BY* filters, BYSETPOS) anchored at a DTSTART into an ordered
//! sequence of zoned occurrences, with RDATE/EXDATE reconciliation and
//! bounded traversal (`all`, `between`, `next`, `previous`).
//!
//! ```
//! use cadence_rrule::parse_block;
//!
//! let rule = parse_block(
//!     "DTSTART;TZID=America/New_York:20250106T093000\n\
//!      RRULE:FREQ=WEEKLY;BYDAY=MO,WE;COUNT=4",
//!     None,
//! )?;
//! let occurrences = rule.all()?;
//! assert_eq!(occurrences.len(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Construction validates and sanitizes once; a [`RecurrenceRule`] is
//! immutable afterward and safe to traverse from multiple threads.

pub mod core;
pub mod error;
mod expand;
pub mod parse;
mod rule;

pub use crate::core::{Frequency, NthWeekday, Rule, Until, parse_weekday, weekday_token};
pub use crate::error::{EvaluationError, ValidationError};
pub use crate::parse::parse_block;
pub use crate::rule::{DEFAULT_MAX_ITERATIONS, RecurrenceRule};
