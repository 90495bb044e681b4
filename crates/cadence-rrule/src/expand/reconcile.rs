//! RDATE/EXDATE merge on top of the raw rule expansion.

use chrono::DateTime;
use chrono_tz::Tz;

/// Merges RDATE entries into the raw expansion, drops EXDATE instants,
/// and applies the COUNT trim last. COUNT bounds the number of emitted,
/// merged occurrences, not raw rule matches.
pub(crate) fn reconcile(
    raw: Vec<DateTime<Tz>>,
    rdates: &[DateTime<Tz>],
    exdates: &[DateTime<Tz>],
    count: Option<u32>,
) -> Vec<DateTime<Tz>> {
    let mut merged = raw;
    merged.extend_from_slice(rdates);
    merged.sort_unstable();
    merged.dedup();

    if !exdates.is_empty() {
        merged.retain(|occ| !exdates.iter().any(|ex| ex == occ));
    }

    if let Some(count) = count {
        merged.truncate(usize::try_from(count).unwrap_or(usize::MAX));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    fn at(day: u32, hour: u32) -> DateTime<Tz> {
        UTC.with_ymd_and_hms(2025, 6, day, hour, 0, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn rdates_merge_in_sorted_position_without_duplicates() {
        let raw = vec![at(1, 9), at(3, 9)];
        let merged = reconcile(raw, &[at(2, 9), at(3, 9)], &[], None);
        assert_eq!(merged, vec![at(1, 9), at(2, 9), at(3, 9)]);
    }

    #[test]
    fn exdates_remove_exact_instants_only() {
        let raw = vec![at(1, 9), at(2, 9), at(3, 9)];
        let merged = reconcile(raw, &[], &[at(2, 9), at(2, 10)], None);
        assert_eq!(merged, vec![at(1, 9), at(3, 9)]);
    }

    #[test]
    fn count_trims_after_the_merge() {
        // An RDATE earlier than every rule match displaces the last rule
        // match once COUNT is applied.
        let raw = vec![at(10, 9), at(11, 9), at(12, 9)];
        let merged = reconcile(raw, &[at(5, 9)], &[], Some(3));
        assert_eq!(merged, vec![at(5, 9), at(10, 9), at(11, 9)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let rdates = vec![at(2, 9)];
        let once = reconcile(vec![at(1, 9), at(3, 9)], &rdates, &[], None);
        let twice = reconcile(once.clone(), &rdates, &[], None);
        assert_eq!(once, twice);
    }
}
