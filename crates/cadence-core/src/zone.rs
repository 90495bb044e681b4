//! Timezone resolution and wall-clock to instant conversion.
//!
//! Resolves TZID strings against the IANA database (`chrono-tz`) and turns
//! wall-clock times into zoned instants with RFC 5545 DST handling: a time
//! falling in a spring-forward gap is shifted forward to the next valid
//! wall-clock time, and an ambiguous time in a fall-back fold takes the
//! first (pre-transition) occurrence.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::str::FromStr;

/// Error during timezone resolution or conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Wall-clock time could not be resolved to an instant in the zone.
    #[error("Unresolvable local time: {0}")]
    UnresolvableTime(NaiveDateTime),
}

/// ## Summary
/// Resolves a TZID string to an IANA timezone.
///
/// Legacy vendor prefixes (`/mozilla.org/`, `/softwarestudio.org/`) seen in
/// calendar data in the wild are stripped before lookup.
///
/// ## Errors
/// Returns `ZoneError::UnknownTimezone` if the TZID is not an IANA name.
pub fn resolve_tzid(tzid: &str) -> Result<Tz, ZoneError> {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);
    Tz::from_str(stripped).map_err(|_e| ZoneError::UnknownTimezone(tzid.to_string()))
}

/// ## Summary
/// Converts a wall-clock time to a zoned instant.
///
/// Unambiguous times convert directly. A time inside a DST fold resolves to
/// the first occurrence (RFC 5545 §3.3.5). A time inside a DST gap is
/// shifted forward in one-hour steps until it lands on a valid wall-clock
/// time, so an occurrence scheduled at a skipped hour surfaces at the hour
/// the transition jumped to.
///
/// ## Errors
/// Returns `ZoneError::UnresolvableTime` if no valid time is found within a
/// day of the input, which no real timezone transition produces.
pub fn to_zoned(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, ZoneError> {
    let mut candidate = local;
    for _ in 0..24 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => return Ok(dt),
            LocalResult::None => candidate += Duration::hours(1),
        }
    }
    Err(ZoneError::UnresolvableTime(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Offset, Timelike};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn resolve_iana_name() {
        assert_eq!(
            resolve_tzid("America/New_York").unwrap(),
            Tz::America__New_York
        );
        assert!(resolve_tzid("Not/A_Zone").is_err());
    }

    #[test]
    fn resolve_strips_vendor_prefix() {
        assert_eq!(
            resolve_tzid("/mozilla.org/Europe/Berlin").unwrap(),
            Tz::Europe__Berlin
        );
    }

    #[test]
    fn to_zoned_unambiguous() {
        let dt = to_zoned(local(2025, 1, 15, 9, 0), Tz::America__New_York).unwrap();
        assert_eq!(dt.hour(), 9);
    }

    #[test_log::test]
    fn to_zoned_gap_shifts_forward() {
        // 2025-03-09 02:30 does not exist in New York; the clock jumps
        // from 02:00 to 03:00.
        let dt = to_zoned(local(2025, 3, 9, 2, 30), Tz::America__New_York).unwrap();
        assert_eq!(dt.hour(), 3);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn to_zoned_fold_takes_first() {
        // 2025-11-02 01:30 happens twice in New York; the first occurrence
        // is still on EDT (UTC-4).
        let dt = to_zoned(local(2025, 11, 2, 1, 30), Tz::America__New_York).unwrap();
        assert_eq!(dt.offset().fix().local_minus_utc(), -4 * 3600);
    }
}
