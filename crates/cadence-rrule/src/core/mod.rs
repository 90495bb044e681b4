//! Plain-data recurrence rule model (RFC 5545 §3.3.10).

mod rrule;

pub use rrule::{Frequency, NthWeekday, Rule, Until, parse_weekday, weekday_token};
