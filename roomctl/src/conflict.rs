//! Half-open time ranges and the reservation overlap test.
//!
//! Every reservation occupies `[start, end)`: the end instant is excluded, so a booking ending at
//! 11:00 and one starting at 11:00 do not conflict. The same predicate is used by the in-memory
//! store and, expressed in SQL, by the Postgres repository and the `reservations_no_overlap`
//! exclusion constraint.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rejected range construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("start_time ({start}) must be before end_time ({end})")]
pub struct InvalidRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A non-empty half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidRange { start, end })
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Standard half-open overlap test: `self.start < other.end && self.end > other.start`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.overlaps_span(other.start, other.end)
    }

    /// Overlap test against a raw `[start, end)` pair, e.g. a stored row.
    pub fn overlaps_span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// Anything that occupies a time range and may or may not block other bookings.
pub trait Booking {
    type Id: Copy + PartialEq;

    fn id(&self) -> Self::Id;
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
    /// Only blocking (confirmed) bookings take part in conflict checks.
    fn is_blocking(&self) -> bool;
}

/// Find the first blocking booking overlapping `candidate`, ignoring `exclude` (the booking
/// being edited, if any).
pub fn find_conflict<'a, B, I>(candidate: &TimeRange, existing: I, exclude: Option<B::Id>) -> Option<&'a B>
where
    B: Booking + 'a,
    I: IntoIterator<Item = &'a B>,
{
    existing
        .into_iter()
        .filter(|b| b.is_blocking())
        .filter(|b| exclude != Some(b.id()))
        .find(|b| candidate.overlaps_span(b.start(), b.end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, hour, minute, 0).unwrap()
    }

    fn range(from: (u32, u32), to: (u32, u32)) -> TimeRange {
        TimeRange::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    struct Slot {
        id: i64,
        range: TimeRange,
        confirmed: bool,
    }

    impl Booking for Slot {
        type Id = i64;

        fn id(&self) -> i64 {
            self.id
        }

        fn start(&self) -> DateTime<Utc> {
            self.range.start()
        }

        fn end(&self) -> DateTime<Utc> {
            self.range.end()
        }

        fn is_blocking(&self) -> bool {
            self.confirmed
        }
    }

    #[test]
    fn test_rejects_empty_and_inverted_ranges() {
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());

        let err = TimeRange::new(at(11, 0), at(10, 0)).unwrap_err();
        assert_eq!(err.start, at(11, 0));
        assert_eq!(err.end, at(10, 0));
    }

    #[test]
    fn test_partial_overlap() {
        let a = range((10, 0), (11, 0));
        let b = range((10, 30), (11, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_touching_boundaries_do_not_overlap() {
        let a = range((10, 0), (11, 0));
        let b = range((11, 0), (12, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = range((9, 0), (17, 0));
        let inner = range((12, 0), (12, 15));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&outer));
    }

    #[test]
    fn test_find_conflict_skips_canceled_and_excluded() {
        let existing = vec![
            Slot {
                id: 1,
                range: range((10, 0), (11, 0)),
                confirmed: false,
            },
            Slot {
                id: 2,
                range: range((10, 30), (11, 30)),
                confirmed: true,
            },
        ];
        let candidate = range((10, 15), (10, 45));

        assert_eq!(find_conflict(&candidate, &existing, None).map(|s| s.id), Some(2));
        assert!(find_conflict(&candidate, &existing, Some(2)).is_none());
        assert!(find_conflict(&range((11, 30), (12, 0)), &existing, None).is_none());
    }
}
