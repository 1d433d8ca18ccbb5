//! Seat-segment availability and booking.
//!
//! Requests flow through these components in order:
//!
//! 1. `JourneyStopIndex` loads a journey's ordered stops.
//! 2. `SegmentResolver` turns a station pair into a `ResolvedSegment`
//!    (a half-open interval over stop sequences).
//! 3. Either `SeatAvailabilityEngine` lists the seats taken on that
//!    segment, or `BookingCoordinator` books one seat for it.
//!
//! Touching segments never conflict: a passenger may board where another
//! alights.

mod availability;
mod coordinator;
mod error;
mod section;
mod segment;
mod stops;

pub use availability::SeatAvailabilityEngine;
pub use coordinator::{Booking, BookingCoordinator};
pub use error::BookingError;
pub use segment::{ResolvedSegment, SegmentResolver};
pub use stops::{JourneyStopIndex, JourneyStops};
