//! Tickets and ticket status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{JourneyId, OrderId, PassengerId, SeatId, StopId, TicketId};

/// Error returned when parsing an unknown ticket status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ticket status: {0:?} (expected active, refunded or cancelled)")]
pub struct InvalidTicketStatus(String);

/// Lifecycle state of a ticket.
///
/// Only `Active` tickets occupy their seat; any other status releases the
/// route interval for future bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Refunded,
    Cancelled,
}

impl TicketStatus {
    /// Returns true if a ticket in this state holds its seat.
    pub fn holds_seat(self) -> bool {
        matches!(self, TicketStatus::Active)
    }

    /// Returns the wire spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Refunded => "refunded",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = InvalidTicketStatus;

    /// Parse case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TicketStatus::Active),
            "refunded" => Ok(TicketStatus::Refunded),
            "cancelled" | "canceled" => Ok(TicketStatus::Cancelled),
            _ => Err(InvalidTicketStatus(s.to_string())),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued ticket: one passenger on one seat between two stops.
///
/// # Invariants
///
/// - `boarding` and `alighting` are stops of `journey`
/// - `boarding.sequence < alighting.sequence`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub journey: JourneyId,
    pub seat: SeatId,
    pub passenger: PassengerId,
    pub order: OrderId,
    pub status: TicketStatus,
    pub boarding: StopId,
    pub alighting: StopId,
}

/// Fields of a ticket before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub journey: JourneyId,
    pub seat: SeatId,
    pub passenger: PassengerId,
    pub order: OrderId,
    pub boarding: StopId,
    pub alighting: StopId,
}

impl NewTicket {
    /// Attach an id, producing an active ticket.
    pub fn issue(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            journey: self.journey,
            seat: self.seat,
            passenger: self.passenger,
            order: self.order,
            status: TicketStatus::Active,
            boarding: self.boarding,
            alighting: self.alighting,
        }
    }
}
