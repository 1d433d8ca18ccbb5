//! Seat availability engine.
//!
//! Read-only: answers which seats of a journey's train are taken on a
//! requested segment. It takes no booking locks, so an answer may be stale by
//! one in-flight booking; the coordinator re-checks before committing.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{RouteInterval, SeatId, Ticket};
use crate::store::{SeatRepository, TicketRepository};

use super::BookingError;
use super::segment::ResolvedSegment;
use super::stops::JourneyStops;

/// First active ticket whose interval overlaps `interval`, if any.
///
/// Shared by the availability engine and the booking coordinator so both
/// apply the same boundary rule.
pub(crate) fn first_overlap<'a>(
    stops: &JourneyStops,
    tickets: &'a [Ticket],
    interval: RouteInterval,
) -> Result<Option<&'a Ticket>, BookingError> {
    for ticket in tickets.iter().filter(|t| t.status.holds_seat()) {
        if stops.interval_of(ticket)?.overlaps(&interval) {
            return Ok(Some(ticket));
        }
    }
    Ok(None)
}

/// Computes the seats unavailable on a segment.
pub struct SeatAvailabilityEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for SeatAvailabilityEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SeatRepository + TicketRepository> SeatAvailabilityEngine<S> {
    /// Create an engine reading from `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Seats of the journey's train that hold an active ticket overlapping
    /// the segment.
    ///
    /// Returns an empty set when the train has no seats or nothing is
    /// booked. A ticket ending where the segment starts (or starting where
    /// it ends) does not make the seat unavailable.
    pub fn unavailable_seats(
        &self,
        segment: &ResolvedSegment,
    ) -> Result<BTreeSet<SeatId>, BookingError> {
        let journey = segment.journey();
        let interval = segment.interval();
        let seats = self.store.seats_of_train(&journey.train)?;

        let mut taken = BTreeSet::new();
        for seat in &seats {
            let tickets = self.store.active_tickets_for_seat(&journey.id, seat.id)?;
            if first_overlap(segment.journey_stops(), &tickets, interval)?.is_some() {
                taken.insert(seat.id);
            }
        }

        debug!(
            journey = %journey.id,
            %interval,
            seats = seats.len(),
            taken = taken.len(),
            "computed unavailable seats"
        );
        Ok(taken)
    }
}
