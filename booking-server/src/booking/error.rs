//! Booking error types.
//!
//! These are expected outcomes of a request (an unknown station, a lost
//! booking race) rather than faults. The router turns each one into a
//! structured error response.

use crate::domain::{JourneyId, SeatId, StationId, TicketId};
use crate::store::StoreError;

/// Errors from the stop index, segment resolver, availability engine and
/// booking coordinator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    /// A journey, station, seat or ticket does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The station exists but the journey does not call there
    #[error("station {station} is not on the route of journey {journey}")]
    StationNotOnRoute {
        journey: JourneyId,
        station: StationId,
    },

    /// The seat exists but belongs to a different train
    #[error("seat {seat} is not on the train operating journey {journey}")]
    SeatNotOnJourney { journey: JourneyId, seat: SeatId },

    /// Departure is not strictly before arrival along the route
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// An active ticket already covers part of the requested segment
    #[error("seat {seat} on journey {journey} is already booked by ticket {holder}")]
    SeatTaken {
        journey: JourneyId,
        seat: SeatId,
        holder: TicketId,
    },

    /// The seat's exclusive section could not be entered in time
    #[error("timed out waiting for seat {seat} on journey {journey}; retry later")]
    SectionTimeout { journey: JourneyId, seat: SeatId },

    /// Stored data contradicts itself (e.g. a ticket whose stop is gone)
    #[error("inconsistent data: {0}")]
    Inconsistent(String),

    /// The store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true if the request lost a race and may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            BookingError::SeatTaken { .. } | BookingError::SectionTimeout { .. }
        )
    }
}
