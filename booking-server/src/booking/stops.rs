//! Journey stop index.
//!
//! Loads a journey's stops from the store and answers position queries
//! against them. A `JourneyStops` value lives for one request only; route
//! edits are therefore visible to the next request without invalidation.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{JourneyId, RouteInterval, StationId, Stop, StopId, Ticket, TrainJourney};
use crate::store::JourneyRepository;

use super::BookingError;

/// The stops of one journey, ascending by sequence.
#[derive(Debug, Clone)]
pub struct JourneyStops {
    journey: TrainJourney,
    stops: Vec<Stop>,
}

impl JourneyStops {
    /// Wrap a journey and its stops, sorting them into route order.
    pub fn new(journey: TrainJourney, mut stops: Vec<Stop>) -> Self {
        stops.sort_by_key(|s| s.sequence);
        Self { journey, stops }
    }

    /// The journey these stops belong to.
    pub fn journey(&self) -> &TrainJourney {
        &self.journey
    }

    /// All stops, origin first.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// The stop at which this journey calls at `station`.
    pub fn stop_at(&self, station: &StationId) -> Result<&Stop, BookingError> {
        self.stops
            .iter()
            .find(|s| s.is_at(station))
            .ok_or_else(|| BookingError::StationNotOnRoute {
                journey: self.journey.id.clone(),
                station: station.clone(),
            })
    }

    /// Position of `station` along the route.
    pub fn sequence_of(&self, station: &StationId) -> Result<u32, BookingError> {
        self.stop_at(station).map(|s| s.sequence)
    }

    /// Look up one of this journey's stops by id.
    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.iter().find(|s| &s.id == id)
    }

    /// Whether a passenger can board at `departure` on `date` and ride
    /// forward to `arrival`.
    pub fn serves(&self, departure: &StationId, arrival: &StationId, date: NaiveDate) -> bool {
        let (Ok(board), Ok(alight)) = (self.stop_at(departure), self.sequence_of(arrival)) else {
            return false;
        };
        board.departure_date == date && RouteInterval::new(board.sequence, alight).is_ok()
    }

    /// The route interval a ticket on this journey occupies.
    ///
    /// Derived from the same stop data the segment resolver uses, so a
    /// requested interval and a stored ticket are always compared on the
    /// same scale.
    pub fn interval_of(&self, ticket: &Ticket) -> Result<RouteInterval, BookingError> {
        let position = |id: &StopId| {
            self.stop(id).map(|s| s.sequence).ok_or_else(|| {
                BookingError::Inconsistent(format!(
                    "ticket {} refers to stop {id} which is not on journey {}",
                    ticket.id, self.journey.id
                ))
            })
        };
        let start = position(&ticket.boarding)?;
        let end = position(&ticket.alighting)?;
        RouteInterval::new(start, end)
            .map_err(|e| BookingError::Inconsistent(format!("ticket {}: {e}", ticket.id)))
    }
}

/// Resolves journeys to their ordered stops.
pub struct JourneyStopIndex<S> {
    store: Arc<S>,
}

impl<S> Clone for JourneyStopIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: JourneyRepository> JourneyStopIndex<S> {
    /// Create an index backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The ordered stops of a journey.
    pub fn stops_of(&self, journey: &JourneyId) -> Result<JourneyStops, BookingError> {
        let record = self
            .store
            .journey(journey)?
            .ok_or_else(|| BookingError::not_found("journey", journey))?;
        let stops = self.store.stops_of(journey)?;
        Ok(JourneyStops::new(record, stops))
    }

    /// Position of `station` on `journey`'s route.
    pub fn sequence_of(
        &self,
        journey: &JourneyId,
        station: &StationId,
    ) -> Result<u32, BookingError> {
        self.stops_of(journey)?.sequence_of(station)
    }

    /// Journeys leaving `departure` on `date` and later calling at
    /// `arrival`, ordered by journey id.
    pub fn journeys_between(
        &self,
        departure: &StationId,
        arrival: &StationId,
        date: NaiveDate,
    ) -> Result<Vec<JourneyStops>, BookingError> {
        let mut found = Vec::new();
        for journey in self.store.journeys()? {
            let stops = self.store.stops_of(&journey.id)?;
            let stops = JourneyStops::new(journey, stops);
            if stops.serves(departure, arrival, date) {
                found.push(stops);
            }
        }
        Ok(found)
    }
}
