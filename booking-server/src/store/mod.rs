//! Persistence contracts consumed by the booking core.
//!
//! The core never talks to a concrete database. It is handed an `Arc<S>`
//! where `S` implements the three repository traits below; `MemoryStore`
//! is the single-process implementation used by the server binary and the
//! tests.
//!
//! Every method is a short, self-contained call: guards on the underlying
//! storage are acquired and released inside the call, so no lock outlives
//! the operation that needed it.

mod memory;
pub(crate) mod seed;

pub use memory::MemoryStore;
pub use seed::{Seed, SeedError};

use crate::domain::{
    Coach, JourneyId, NewTicket, OrderId, Seat, SeatId, Station, StationId, Stop, Ticket,
    TicketId, TicketStatus, Train, TrainId, TrainJourney,
};

/// Errors raised by a store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A writer panicked while holding the ticket table lock.
    #[error("ticket table lock poisoned")]
    Poisoned,
}

/// Journeys, their stops, and stations.
pub trait JourneyRepository: Send + Sync {
    /// Look up a journey.
    fn journey(&self, id: &JourneyId) -> Result<Option<TrainJourney>, StoreError>;

    /// All journeys, ordered by id.
    fn journeys(&self) -> Result<Vec<TrainJourney>, StoreError>;

    /// All stops of a journey, in no particular order.
    ///
    /// Returns an empty list for an unknown journey.
    fn stops_of(&self, id: &JourneyId) -> Result<Vec<Stop>, StoreError>;

    /// Look up a station.
    fn station(&self, id: &StationId) -> Result<Option<Station>, StoreError>;

    /// All stations, ordered by id.
    fn stations(&self) -> Result<Vec<Station>, StoreError>;
}

/// Trains, coaches and seats.
pub trait SeatRepository: Send + Sync {
    /// Look up a train.
    fn train(&self, id: &TrainId) -> Result<Option<Train>, StoreError>;

    /// Coaches of a train, ordered by coach number.
    fn coaches_of_train(&self, id: &TrainId) -> Result<Vec<Coach>, StoreError>;

    /// Every seat in every coach of a train, ordered by seat id.
    fn seats_of_train(&self, id: &TrainId) -> Result<Vec<Seat>, StoreError>;

    /// The train a seat belongs to (seat → coach → train).
    fn train_of_seat(&self, id: SeatId) -> Result<Option<TrainId>, StoreError>;
}

/// Issued tickets.
pub trait TicketRepository: Send + Sync {
    /// Look up a ticket.
    fn ticket(&self, id: &TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Active tickets for one seat on one journey.
    ///
    /// A read made after `insert_ticket` returns observes the inserted
    /// ticket.
    fn active_tickets_for_seat(
        &self,
        journey: &JourneyId,
        seat: SeatId,
    ) -> Result<Vec<Ticket>, StoreError>;

    /// Tickets belonging to an order, in any status, ordered by id.
    fn tickets_of_order(&self, order: &OrderId) -> Result<Vec<Ticket>, StoreError>;

    /// Store a new active ticket and return it with its assigned id.
    ///
    /// The store does not check for overlaps; callers serialize inserts per
    /// (journey, seat) and check before inserting.
    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    /// Change a ticket's status. Returns `None` for an unknown ticket.
    fn update_ticket_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Move a ticket to another order. Returns `None` for an unknown ticket.
    fn reassign_order(&self, id: &TicketId, order: OrderId)
    -> Result<Option<Ticket>, StoreError>;
}

/// Everything the booking core needs from persistence.
pub trait Store: JourneyRepository + SeatRepository + TicketRepository {}

impl<T> Store for T where T: JourneyRepository + SeatRepository + TicketRepository {}
