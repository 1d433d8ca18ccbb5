//! Stops: one station visit within a journey.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{JourneyId, StationId, StopId};

/// A station visit within a journey.
///
/// `sequence` orders the stops of one journey from origin to terminus. The
/// store guarantees sequences are unique per journey and that a station
/// appears at most once, so a station resolves to exactly one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub journey: JourneyId,
    pub station: StationId,
    pub sequence: u32,
    /// Distance from the journey's origin, in kilometres.
    pub distance: u32,
    pub departure_date: NaiveDate,
    /// Absent at the origin.
    #[serde(default)]
    pub arrival_time: Option<NaiveTime>,
    /// Absent at the terminus.
    #[serde(default)]
    pub departure_time: Option<NaiveTime>,
}

impl Stop {
    /// Returns true if this stop is at the given station.
    pub fn is_at(&self, station: &StationId) -> bool {
        &self.station == station
    }
}
