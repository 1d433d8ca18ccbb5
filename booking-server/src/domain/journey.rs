//! Reference data: stations, trains, coaches, seats and journeys.
//!
//! These records are maintained by administrative tooling and only read by
//! the booking core.

use serde::{Deserialize, Serialize};

use super::{CoachId, JourneyId, LineId, SeatId, StationId, TrainId};

/// A station served by one or more lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

/// A train (a fixed set of coaches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    pub train_number: String,
    pub status: String,
}

/// A coach belonging to exactly one train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    pub coach_number: u32,
    pub coach_type: String,
    pub capacity: u32,
    pub train: TrainId,
}

/// A seat within a coach.
///
/// A seat is usable on every journey operated by its coach's train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub seat_number: u32,
    pub coach: CoachId,
}

/// A scheduled run of a train along a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainJourney {
    pub id: JourneyId,
    pub name: String,
    pub train: TrainId,
    pub line: LineId,
    pub base_price: f64,
}
