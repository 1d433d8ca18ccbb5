//! Wire schema for requests and responses.
//!
//! Each connection carries one request line and one response line of JSON.
//! The records below are the only shapes that cross the wire; domain types
//! are converted into them explicitly so that internal refactors cannot
//! change the protocol by accident.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Coach, Station, Stop, Ticket, Train, TrainJourney};

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

/// A request as received: a category, an operation and flat string params.
///
/// ```json
/// {"version": 1, "category": "trainjourney", "operation": "getStops",
///  "params": {"trainJourneyID": "TJ1", "departureStationID": "A", "arrivalStationID": "C"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_version")]
    pub version: u32,
    pub category: String,
    pub operation: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Envelope {
    /// Build a current-version envelope.
    pub fn new<'a>(
        category: &str,
        operation: &str,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            category: category.to_string(),
            operation: operation.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or missing request fields
    ValidationError,
    /// Unknown journey, station, seat or ticket
    NotFound,
    /// Departure not strictly before arrival
    InvalidSegment,
    /// Lost a booking race or timed out waiting for the seat; retryable
    Conflict,
    /// Unrecognized category or operation
    UnknownOperation,
    /// The connection failed before a request could be read.
    ///
    /// Reserved so clients can name every failure class. The server never
    /// sends it: a transport fault is logged and the connection is closed.
    TransportFault,
    /// The server could not complete the request
    Internal,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Ok { result: serde_json::Value },
    Error { error: ErrorBody },
}

/// A response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub version: u32,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// A successful response carrying `result`.
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            outcome: Outcome::Ok { result },
        }
    }

    /// A failed response.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            outcome: Outcome::Error {
                error: ErrorBody {
                    kind,
                    message: message.into(),
                },
            },
        }
    }

    /// The error kind, if this is an error response.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Ok { .. } => None,
            Outcome::Error { error } => Some(error.kind),
        }
    }

    /// The result value, if this is a successful response.
    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            Outcome::Ok { result } => Some(result),
            Outcome::Error { .. } => None,
        }
    }
}

/// A stop on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    #[serde(rename = "stopID")]
    pub stop_id: String,
    #[serde(rename = "stationID")]
    pub station_id: String,
    pub stop_order: u32,
    pub distance: u32,
    pub departure_date: String,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
}

impl From<&Stop> for StopRecord {
    fn from(stop: &Stop) -> Self {
        Self {
            stop_id: stop.id.to_string(),
            station_id: stop.station.to_string(),
            stop_order: stop.sequence,
            distance: stop.distance,
            departure_date: stop.departure_date.format("%Y-%m-%d").to_string(),
            arrival_time: stop.arrival_time.map(|t| t.format("%H:%M").to_string()),
            departure_time: stop.departure_time.map(|t| t.format("%H:%M").to_string()),
        }
    }
}

/// A ticket on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    #[serde(rename = "ticketID")]
    pub ticket_id: String,
    #[serde(rename = "trainJourneyID")]
    pub train_journey_id: String,
    #[serde(rename = "seatID")]
    pub seat_id: u32,
    #[serde(rename = "passengerID")]
    pub passenger_id: String,
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub status: String,
    #[serde(rename = "boardingStopID")]
    pub boarding_stop_id: String,
    #[serde(rename = "alightingStopID")]
    pub alighting_stop_id: String,
}

impl From<&Ticket> for TicketRecord {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id.to_string(),
            train_journey_id: ticket.journey.to_string(),
            seat_id: ticket.seat.0,
            passenger_id: ticket.passenger.to_string(),
            order_id: ticket.order.to_string(),
            status: ticket.status.to_string(),
            boarding_stop_id: ticket.boarding.to_string(),
            alighting_stop_id: ticket.alighting.to_string(),
        }
    }
}

/// A station on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    #[serde(rename = "stationID")]
    pub station_id: String,
    pub station_name: String,
}

impl From<&Station> for StationRecord {
    fn from(station: &Station) -> Self {
        Self {
            station_id: station.id.to_string(),
            station_name: station.name.clone(),
        }
    }
}

/// A train on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRecord {
    #[serde(rename = "trainID")]
    pub train_id: String,
    pub train_number: String,
    pub status: String,
}

impl From<&Train> for TrainRecord {
    fn from(train: &Train) -> Self {
        Self {
            train_id: train.id.to_string(),
            train_number: train.train_number.clone(),
            status: train.status.clone(),
        }
    }
}

/// A coach on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachRecord {
    #[serde(rename = "coachID")]
    pub coach_id: u32,
    pub coach_number: u32,
    pub coach_type: String,
    pub capacity: u32,
    #[serde(rename = "trainID")]
    pub train_id: String,
}

impl From<&Coach> for CoachRecord {
    fn from(coach: &Coach) -> Self {
        Self {
            coach_id: coach.id.0,
            coach_number: coach.coach_number,
            coach_type: coach.coach_type.clone(),
            capacity: coach.capacity,
            train_id: coach.train.to_string(),
        }
    }
}

/// A journey on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    #[serde(rename = "trainJourneyID")]
    pub train_journey_id: String,
    pub train_journey_name: String,
    #[serde(rename = "trainID")]
    pub train_id: String,
    #[serde(rename = "lineID")]
    pub line_id: String,
    pub base_price: f64,
}

impl From<&TrainJourney> for JourneyRecord {
    fn from(journey: &TrainJourney) -> Self {
        Self {
            train_journey_id: journey.id.to_string(),
            train_journey_name: journey.name.clone(),
            train_id: journey.train.to_string(),
            line_id: journey.line.to_string(),
            base_price: journey.base_price,
        }
    }
}
