//! Typed requests.
//!
//! An `Envelope` is decoded exactly once, here, into a `Request` with
//! validated ids. Handlers never look at raw parameter maps.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::{
    InvalidId, JourneyId, OrderId, PassengerId, SeatId, StationId, TicketId, TicketStatus, TrainId,
};

use super::protocol::{Envelope, ErrorKind, PROTOCOL_VERSION};

/// Errors decoding a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("unknown operation {operation:?} in category {category:?}")]
    UnknownOperation { category: String, operation: String },

    #[error("missing parameter {0:?}")]
    MissingParam(&'static str),

    #[error("invalid parameter {name:?}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl RouterError {
    /// The wire error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::UnknownCategory(_) | RouterError::UnknownOperation { .. } => {
                ErrorKind::UnknownOperation
            }
            _ => ErrorKind::ValidationError,
        }
    }
}

/// A journey plus a departure/arrival station pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentQuery {
    pub journey: JourneyId,
    pub departure: StationId,
    pub arrival: StationId,
}

/// One decoded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    UnavailableSeats(SegmentQuery),
    DistanceBetweenStops(SegmentQuery),
    StopsBetween(SegmentQuery),
    AllStops(JourneyId),
    JourneyById(JourneyId),
    SearchJourneys {
        departure: StationId,
        arrival: StationId,
        date: NaiveDate,
    },
    AddTicket {
        segment: SegmentQuery,
        seat: SeatId,
        passenger: PassengerId,
        order: OrderId,
    },
    TicketById(TicketId),
    UpdateTicketStatus {
        ticket: TicketId,
        status: TicketStatus,
    },
    ReassignTicket {
        ticket: TicketId,
        order: OrderId,
    },
    /// With `refund` set, only the tickets that can still be refunded.
    TicketsOfOrder {
        order: OrderId,
        refund: bool,
    },
    StationById(StationId),
    StationsForTicket(TicketId),
    AllStations,
    CoachesOfTrain(TrainId),
    TrainById(TrainId),
}

impl Request {
    /// Decode an envelope.
    pub fn decode(envelope: &Envelope) -> Result<Self, RouterError> {
        if envelope.version != PROTOCOL_VERSION {
            return Err(RouterError::UnsupportedVersion(envelope.version));
        }

        let p = Params(&envelope.params);
        let category = envelope.category.as_str();
        let operation = envelope.operation.as_str();
        let unknown = || RouterError::UnknownOperation {
            category: category.to_string(),
            operation: operation.to_string(),
        };

        let request = match category {
            "trainjourney" => match operation {
                "getUnavailableSeats" => Request::UnavailableSeats(p.segment()?),
                "getDistanceBetweenTwoStops" => Request::DistanceBetweenStops(p.segment()?),
                "getStops" => Request::StopsBetween(p.segment()?),
                "getAllStops" => Request::AllStops(p.journey()?),
                "getTrainJourneyByID" => Request::JourneyById(p.journey()?),
                "searchTrainJourney" => Request::SearchJourneys {
                    departure: p.id("departureStation")?,
                    arrival: p.id("arrivalStation")?,
                    date: p.parse("departureDate")?,
                },
                _ => return Err(unknown()),
            },
            "ticket" => match operation {
                "addTicket" => Request::AddTicket {
                    segment: p.segment()?,
                    seat: p.parse("seatID")?,
                    passenger: p.id("passengerID")?,
                    order: p.id("orderID")?,
                },
                "getTicketByID" => Request::TicketById(p.id("ticketID")?),
                "updateTicketStatus" => Request::UpdateTicketStatus {
                    ticket: p.id("ticketID")?,
                    status: p.parse("status")?,
                },
                "reassignTicketToNewOrder" => Request::ReassignTicket {
                    ticket: p.id("ticketID")?,
                    order: p.id("newOrderID")?,
                },
                "fetchEligibleRefundTicketsForOrder" => Request::TicketsOfOrder {
                    order: p.id("orderID")?,
                    refund: p.optional("isRefund")?.unwrap_or(true),
                },
                _ => return Err(unknown()),
            },
            "station" => match operation {
                "getStationByID" => Request::StationById(p.id("stationID")?),
                "getAllStation" => Request::AllStations,
                "getStationsForTicket" => Request::StationsForTicket(p.id("ticketID")?),
                _ => return Err(unknown()),
            },
            "coach" => match operation {
                "getCoaches" => Request::CoachesOfTrain(p.id("trainID")?),
                _ => return Err(unknown()),
            },
            "train" => match operation {
                "getTrainByID" => Request::TrainById(p.id("trainID")?),
                _ => return Err(unknown()),
            },
            other => return Err(RouterError::UnknownCategory(other.to_string())),
        };
        Ok(request)
    }
}

/// Lookup helper over the raw parameter map.
struct Params<'a>(&'a BTreeMap<String, String>);

impl Params<'_> {
    fn raw(&self, name: &'static str) -> Result<&str, RouterError> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or(RouterError::MissingParam(name))
    }

    fn id<T>(&self, name: &'static str) -> Result<T, RouterError>
    where
        T: FromStr<Err = InvalidId>,
    {
        self.parse(name)
    }

    fn parse<T>(&self, name: &'static str) -> Result<T, RouterError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.raw(name)?
            .trim()
            .parse()
            .map_err(|e: T::Err| RouterError::InvalidParam {
                name,
                reason: e.to_string(),
            })
    }

    fn optional<T>(&self, name: &'static str) -> Result<Option<T>, RouterError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if self.0.contains_key(name) {
            self.parse(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// `trainJourneyID`, or its short alias `journeyID`.
    fn journey(&self) -> Result<JourneyId, RouterError> {
        if self.0.contains_key("trainJourneyID") {
            self.id("trainJourneyID")
        } else if self.0.contains_key("journeyID") {
            self.id("journeyID")
        } else {
            Err(RouterError::MissingParam("trainJourneyID"))
        }
    }

    fn segment(&self) -> Result<SegmentQuery, RouterError> {
        Ok(SegmentQuery {
            journey: self.journey()?,
            departure: self.id("departureStationID")?,
            arrival: self.id("arrivalStationID")?,
        })
    }
}
