//! Domain types for the booking server.
//!
//! Identifiers, reference data (stations, trains, coaches, seats, journeys
//! and their stops), tickets, and the route interval a ticket occupies.
//! Constructors reject invalid values, so the rest of the crate never
//! re-validates them.

mod ids;
mod interval;
mod journey;
mod stop;
mod ticket;

pub use ids::{
    CoachId, InvalidId, JourneyId, LineId, OrderId, PassengerId, SeatId, StationId, StopId,
    TicketId, TrainId,
};
pub use interval::{EmptyInterval, RouteInterval};
pub use journey::{Coach, Seat, Station, Train, TrainJourney};
pub use stop::Stop;
pub use ticket::{InvalidTicketStatus, NewTicket, Ticket, TicketStatus};
