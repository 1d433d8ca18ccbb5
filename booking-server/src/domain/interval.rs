//! Half-open route intervals over stop sequence numbers.

use std::fmt;

/// Error returned when an interval would be empty or reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("route interval must start before it ends (got [{start}, {end}))")]
pub struct EmptyInterval {
    pub start: u32,
    pub end: u32,
}

/// The portion of a journey a ticket occupies: `[start, end)` over stop
/// sequence numbers.
///
/// A passenger occupies the seat from the boarding stop up to, but not
/// including, the alighting stop. Two intervals that merely touch (one ends
/// where the other starts) therefore do not overlap.
///
/// # Invariants
///
/// - `start < end`
///
/// # Examples
///
/// ```
/// use booking_server::domain::RouteInterval;
///
/// let b_to_d = RouteInterval::new(2, 4).unwrap();
/// let a_to_c = RouteInterval::new(1, 3).unwrap();
/// let d_to_e = RouteInterval::new(4, 5).unwrap();
///
/// assert!(b_to_d.overlaps(&a_to_c));
/// assert!(!b_to_d.overlaps(&d_to_e));
/// assert!(RouteInterval::new(3, 3).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteInterval {
    start: u32,
    end: u32,
}

impl RouteInterval {
    /// Build an interval from boarding and alighting sequence numbers.
    pub fn new(start: u32, end: u32) -> Result<Self, EmptyInterval> {
        if start >= end {
            return Err(EmptyInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Sequence number of the boarding stop.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Sequence number of the alighting stop (exclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Returns true if the two intervals share at least one leg.
    pub fn overlaps(&self, other: &RouteInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Debug for RouteInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl fmt::Display for RouteInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn interval() -> impl Strategy<Value = RouteInterval> {
        (0u32..50, 1u32..20).prop_map(|(start, len)| RouteInterval::new(start, start + len).unwrap())
    }

    proptest! {
        /// Overlap is symmetric
        #[test]
        fn overlap_symmetric(a in interval(), b in interval()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        /// Every interval overlaps itself
        #[test]
        fn overlap_reflexive(a in interval()) {
            prop_assert!(a.overlaps(&a));
        }

        /// Overlap agrees with "some leg is shared" computed by brute force
        #[test]
        fn overlap_matches_shared_legs(a in interval(), b in interval()) {
            let shared = (a.start()..a.end()).any(|leg| b.start() <= leg && leg < b.end());
            prop_assert_eq!(a.overlaps(&b), shared);
        }

        /// An interval ending where another starts never overlaps it
        #[test]
        fn boundary_law(start in 0u32..50, mid_len in 1u32..20, tail_len in 1u32..20) {
            let first = RouteInterval::new(start, start + mid_len).unwrap();
            let second = RouteInterval::new(start + mid_len, start + mid_len + tail_len).unwrap();
            prop_assert!(!first.overlaps(&second));
        }
    }
}
