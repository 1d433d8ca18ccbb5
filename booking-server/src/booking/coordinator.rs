//! Booking coordinator.
//!
//! The only component that writes tickets. Every write for a given
//! (journey, seat) runs inside that key's exclusive section, and the overlap
//! check is repeated inside the section against a fresh read, so two
//! concurrent requests can never both see the seat free and both commit.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    JourneyId, NewTicket, OrderId, PassengerId, SeatId, Ticket, TicketId, TicketStatus,
};
use crate::store::{JourneyRepository, SeatRepository, TicketRepository};

use super::BookingError;
use super::availability::first_overlap;
use super::section::{SectionGuard, SectionTable};
use super::segment::ResolvedSegment;
use super::stops::JourneyStopIndex;

/// Who a booking is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub seat: SeatId,
    pub passenger: PassengerId,
    pub order: OrderId,
}

/// Serializes ticket writes per (journey, seat).
pub struct BookingCoordinator<S> {
    store: Arc<S>,
    index: JourneyStopIndex<S>,
    sections: SectionTable,
    lock_timeout: Duration,
}

impl<S> BookingCoordinator<S>
where
    S: JourneyRepository + SeatRepository + TicketRepository,
{
    /// Create a coordinator. `lock_timeout` bounds how long a request waits
    /// for another booking on the same seat to finish.
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self {
            index: JourneyStopIndex::new(Arc::clone(&store)),
            store,
            sections: SectionTable::new(),
            lock_timeout,
        }
    }

    /// Book `booking.seat` for the resolved segment.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the seat does not exist
    /// - `SeatNotOnJourney` if the seat belongs to another train
    /// - `SeatTaken` if an active ticket overlaps the segment
    /// - `SectionTimeout` if the seat stayed locked past the timeout
    pub async fn book(
        &self,
        segment: &ResolvedSegment,
        booking: Booking,
    ) -> Result<Ticket, BookingError> {
        let journey = segment.journey();
        let seat = booking.seat;

        let owner = self
            .store
            .train_of_seat(seat)?
            .ok_or_else(|| BookingError::not_found("seat", seat))?;
        if owner != journey.train {
            return Err(BookingError::SeatNotOnJourney {
                journey: journey.id.clone(),
                seat,
            });
        }

        let _section = self.enter(&journey.id, seat).await?;

        let tickets = self.store.active_tickets_for_seat(&journey.id, seat)?;
        let overlap = first_overlap(segment.journey_stops(), &tickets, segment.interval())?;
        if let Some(holder) = overlap {
            warn!(
                journey = %journey.id,
                seat = %seat,
                requested = %segment.interval(),
                holder = %holder.id,
                "booking rejected: seat already taken"
            );
            return Err(BookingError::SeatTaken {
                journey: journey.id.clone(),
                seat,
                holder: holder.id.clone(),
            });
        }

        let ticket = self.store.insert_ticket(NewTicket {
            journey: journey.id.clone(),
            seat,
            passenger: booking.passenger,
            order: booking.order,
            boarding: segment.boarding().id.clone(),
            alighting: segment.alighting().id.clone(),
        })?;

        info!(
            ticket = %ticket.id,
            journey = %journey.id,
            seat = %seat,
            interval = %segment.interval(),
            "ticket booked"
        );
        Ok(ticket)
    }

    /// Change a ticket's status under its seat's section.
    ///
    /// Moving a ticket out of `active` frees its interval. Moving it back to
    /// `active` is a booking in its own right and fails with `SeatTaken` if
    /// the seat has been resold in the meantime.
    pub async fn set_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket, BookingError> {
        let ticket = self
            .store
            .ticket(id)?
            .ok_or_else(|| BookingError::not_found("ticket", id))?;

        let _section = self.enter(&ticket.journey, ticket.seat).await?;

        // Re-read inside the section; another status change may have won.
        let current = self
            .store
            .ticket(id)?
            .ok_or_else(|| BookingError::not_found("ticket", id))?;

        if status.holds_seat() && !current.status.holds_seat() {
            let stops = self.index.stops_of(&current.journey)?;
            let interval = stops.interval_of(&current)?;
            let others = self
                .store
                .active_tickets_for_seat(&current.journey, current.seat)?;
            if let Some(holder) = first_overlap(&stops, &others, interval)? {
                return Err(BookingError::SeatTaken {
                    journey: current.journey.clone(),
                    seat: current.seat,
                    holder: holder.id.clone(),
                });
            }
        }

        let updated = self
            .store
            .update_ticket_status(id, status)?
            .ok_or_else(|| BookingError::not_found("ticket", id))?;

        info!(
            ticket = %id,
            from = %current.status,
            to = %status,
            "ticket status changed"
        );
        Ok(updated)
    }

    async fn enter(
        &self,
        journey: &JourneyId,
        seat: SeatId,
    ) -> Result<SectionGuard<'_>, BookingError> {
        debug!(journey = %journey, seat = %seat, "entering seat section");
        self.sections
            .enter((journey.clone(), seat), self.lock_timeout)
            .await
            .map_err(|_| {
                warn!(
                    journey = %journey,
                    seat = %seat,
                    timeout = ?self.lock_timeout,
                    "seat section timed out"
                );
                BookingError::SectionTimeout {
                    journey: journey.clone(),
                    seat,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::SegmentResolver;
    use crate::domain::StationId;
    use crate::store::MemoryStore;
    use crate::store::seed::fixtures;

    struct Harness {
        store: Arc<MemoryStore>,
        resolver: SegmentResolver<MemoryStore>,
        coordinator: Arc<BookingCoordinator<MemoryStore>>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::from_seed(fixtures::network()).unwrap());
            Self {
                resolver: SegmentResolver::new(JourneyStopIndex::new(store.clone())),
                coordinator: Arc::new(BookingCoordinator::new(
                    store.clone(),
                    Duration::from_secs(2),
                )),
                store,
            }
        }

        fn segment(&self, journey: &str, from: &str, to: &str) -> ResolvedSegment {
            self.resolver
                .resolve(
                    &JourneyId::parse(journey).unwrap(),
                    &StationId::parse(from).unwrap(),
                    &StationId::parse(to).unwrap(),
                )
                .unwrap()
        }
    }

    fn booking(seat: u32, passenger: &str) -> Booking {
        Booking {
            seat: SeatId(seat),
            passenger: PassengerId::parse(passenger).unwrap(),
            order: OrderId::parse("O7").unwrap(),
        }
    }

    #[tokio::test]
    async fn books_free_seat() {
        let h = Harness::new();
        let segment = h.segment("TJ1", "A", "C");
        let ticket = h.coordinator.book(&segment, booking(2, "P1")).await.unwrap();

        assert_eq!(ticket.seat, SeatId(2));
        assert_eq!(ticket.boarding.as_str(), "S1");
        assert_eq!(ticket.alighting.as_str(), "S3");
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(h.store.ticket(&ticket.id).unwrap(), Some(ticket));
    }

    #[tokio::test]
    async fn overlapping_booking_conflicts() {
        let h = Harness::new();
        // Seat 1 holds [B, D).
        let err = h
            .coordinator
            .book(&h.segment("TJ1", "A", "C"), booking(1, "P2"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SeatTaken { ref holder, .. } if holder.as_str() == "TK000001"));
        assert!(err.is_conflict());
        assert_eq!(h.store.ticket_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn touching_bookings_coexist() {
        let h = Harness::new();
        h.coordinator
            .book(&h.segment("TJ1", "A", "B"), booking(1, "P2"))
            .await
            .unwrap();
        h.coordinator
            .book(&h.segment("TJ1", "D", "E"), booking(1, "P3"))
            .await
            .unwrap();
        assert_eq!(
            h.store
                .active_tickets_for_seat(&JourneyId::parse("TJ1").unwrap(), SeatId(1))
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn unknown_seat_is_not_found() {
        let h = Harness::new();
        let err = h
            .coordinator
            .book(&h.segment("TJ1", "A", "B"), booking(77, "P1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { kind: "seat", .. }));
    }

    #[tokio::test]
    async fn seat_of_another_train_is_rejected() {
        let h = Harness::new();
        let err = h
            .coordinator
            .book(&h.segment("TJ3", "A", "B"), booking(1, "P1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SeatNotOnJourney { .. }));
    }

    #[tokio::test]
    async fn refund_releases_interval() {
        let h = Harness::new();
        let seeded = TicketId::parse("TK000001").unwrap();
        let refunded = h
            .coordinator
            .set_status(&seeded, TicketStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.status, TicketStatus::Refunded);

        h.coordinator
            .book(&h.segment("TJ1", "A", "C"), booking(1, "P2"))
            .await
            .unwrap();

        // The refunded ticket cannot come back now that [A, C) is resold.
        let err = h
            .coordinator
            .set_status(&seeded, TicketStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SeatTaken { .. }));
    }

    #[tokio::test]
    async fn set_status_on_unknown_ticket() {
        let h = Harness::new();
        let err = h
            .coordinator
            .set_status(&TicketId::parse("TK404").unwrap(), TicketStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { kind: "ticket", .. }));
    }

    #[tokio::test]
    async fn held_section_times_out() {
        let store = Arc::new(MemoryStore::from_seed(fixtures::network()).unwrap());
        let coordinator = BookingCoordinator::new(store.clone(), Duration::from_millis(20));
        let resolver = SegmentResolver::new(JourneyStopIndex::new(store));
        let segment = resolver
            .resolve(
                &JourneyId::parse("TJ1").unwrap(),
                &StationId::parse("A").unwrap(),
                &StationId::parse("B").unwrap(),
            )
            .unwrap();

        let _held = coordinator
            .enter(&JourneyId::parse("TJ1").unwrap(), SeatId(3))
            .await
            .unwrap();
        let err = coordinator
            .book(&segment, booking(3, "P1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SectionTimeout { .. }));
        assert!(err.is_conflict());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_bookings_admit_one() {
        let h = Harness::new();
        let attempts = 16;

        let handles: Vec<_> = (0..attempts)
            .map(|i| {
                let coordinator = Arc::clone(&h.coordinator);
                // Every attempt overlaps [A, C) on seat 2.
                let segment = match i % 3 {
                    0 => h.segment("TJ1", "A", "C"),
                    1 => h.segment("TJ1", "B", "D"),
                    _ => h.segment("TJ1", "A", "E"),
                };
                tokio::spawn(async move {
                    coordinator
                        .book(&segment, booking(2, &format!("P{i}")))
                        .await
                })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let booked = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| r.as_ref().is_err_and(BookingError::is_conflict))
            .count();
        assert_eq!(booked, 1);
        assert_eq!(conflicts, attempts - 1);
        assert_eq!(
            h.store
                .active_tickets_for_seat(&JourneyId::parse("TJ1").unwrap(), SeatId(2))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(h.coordinator.sections.active_keys(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_on_different_seats_all_succeed() {
        let h = Harness::new();
        let handles: Vec<_> = [2u32, 3, 4]
            .into_iter()
            .map(|seat| {
                let coordinator = Arc::clone(&h.coordinator);
                let segment = h.segment("TJ1", "A", "E");
                tokio::spawn(async move { coordinator.book(&segment, booking(seat, "P1")).await })
            })
            .collect();

        for joined in futures::future::join_all(handles).await {
            assert!(joined.unwrap().is_ok());
        }
    }
}
