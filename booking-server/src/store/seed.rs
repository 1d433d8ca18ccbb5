//! Loading reference data from a JSON seed file.
//!
//! The seed file holds everything the booking core reads but never writes
//! (stations, trains, coaches, seats, journeys and their stops) plus any
//! tickets sold before the server started. It is validated as a whole before
//! a store is built from it, so a malformed route can never reach the
//! availability engine.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{
    Coach, JourneyId, RouteInterval, Seat, SeatId, Station, Stop, StopId, Ticket, Train,
    TrainJourney,
};

/// Errors that can occur when loading a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The file could not be read
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid seed JSON
    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),

    /// The data violates a referential or ordering invariant
    #[error("invalid seed data: {0}")]
    Invalid(String),
}

/// Reference data and pre-existing tickets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub stations: Vec<Station>,
    pub trains: Vec<Train>,
    pub coaches: Vec<Coach>,
    pub seats: Vec<Seat>,
    pub journeys: Vec<TrainJourney>,
    pub stops: Vec<Stop>,
    pub tickets: Vec<Ticket>,
}

impl Seed {
    /// Read and parse a seed file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Parse seed JSON held in memory.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every invariant the booking core relies on.
    ///
    /// - ids are unique within each table
    /// - every reference points at an existing record
    /// - per journey, stop sequences are unique and no station repeats
    /// - tickets board strictly before they alight, on their own journey
    /// - active tickets on one (journey, seat) do not overlap
    pub fn validate(&self) -> Result<(), SeedError> {
        let stations = unique_ids(self.stations.iter().map(|s| &s.id), "station")?;
        let trains = unique_ids(self.trains.iter().map(|t| &t.id), "train")?;
        let coaches = unique_ids(self.coaches.iter().map(|c| &c.id), "coach")?;
        unique_ids(self.seats.iter().map(|s| &s.id), "seat")?;
        let journeys = unique_ids(self.journeys.iter().map(|j| &j.id), "journey")?;
        unique_ids(self.stops.iter().map(|s| &s.id), "stop")?;
        unique_ids(self.tickets.iter().map(|t| &t.id), "ticket")?;

        for coach in &self.coaches {
            if !trains.contains(&coach.train) {
                return Err(invalid(format!(
                    "coach {} references unknown train {}",
                    coach.id, coach.train
                )));
            }
        }
        for seat in &self.seats {
            if !coaches.contains(&seat.coach) {
                return Err(invalid(format!(
                    "seat {} references unknown coach {}",
                    seat.id, seat.coach
                )));
            }
        }
        for journey in &self.journeys {
            if !trains.contains(&journey.train) {
                return Err(invalid(format!(
                    "journey {} references unknown train {}",
                    journey.id, journey.train
                )));
            }
        }

        let mut seen_sequence = HashSet::new();
        let mut seen_station = HashSet::new();
        let mut stops_by_id: HashMap<&StopId, &Stop> = HashMap::new();
        for stop in &self.stops {
            if !journeys.contains(&stop.journey) {
                return Err(invalid(format!(
                    "stop {} references unknown journey {}",
                    stop.id, stop.journey
                )));
            }
            if !stations.contains(&stop.station) {
                return Err(invalid(format!(
                    "stop {} references unknown station {}",
                    stop.id, stop.station
                )));
            }
            if !seen_sequence.insert((&stop.journey, stop.sequence)) {
                return Err(invalid(format!(
                    "journey {} has two stops with sequence {}",
                    stop.journey, stop.sequence
                )));
            }
            if !seen_station.insert((&stop.journey, &stop.station)) {
                return Err(invalid(format!(
                    "journey {} visits station {} more than once",
                    stop.journey, stop.station
                )));
            }
            stops_by_id.insert(&stop.id, stop);
        }

        let seat_train: HashMap<SeatId, _> = self
            .seats
            .iter()
            .filter_map(|seat| {
                self.coaches
                    .iter()
                    .find(|c| c.id == seat.coach)
                    .map(|c| (seat.id, &c.train))
            })
            .collect();
        let journey_train: HashMap<&JourneyId, _> =
            self.journeys.iter().map(|j| (&j.id, &j.train)).collect();

        let mut active: HashMap<(&JourneyId, SeatId), Vec<(RouteInterval, &Ticket)>> =
            HashMap::new();
        for ticket in &self.tickets {
            let (Some(train), Some(owning_train)) =
                (journey_train.get(&ticket.journey), seat_train.get(&ticket.seat))
            else {
                return Err(invalid(format!(
                    "ticket {} references unknown journey or seat",
                    ticket.id
                )));
            };
            if train != owning_train {
                return Err(invalid(format!(
                    "ticket {}: seat {} is not on journey {}'s train",
                    ticket.id, ticket.seat, ticket.journey
                )));
            }

            let boarding = ticket_stop(&stops_by_id, ticket, &ticket.boarding)?;
            let alighting = ticket_stop(&stops_by_id, ticket, &ticket.alighting)?;
            let interval = RouteInterval::new(boarding.sequence, alighting.sequence)
                .map_err(|e| invalid(format!("ticket {}: {e}", ticket.id)))?;

            if !ticket.status.holds_seat() {
                continue;
            }
            let held = active.entry((&ticket.journey, ticket.seat)).or_default();
            if let Some((_, other)) = held.iter().find(|(i, _)| i.overlaps(&interval)) {
                return Err(invalid(format!(
                    "tickets {} and {} overlap on seat {}",
                    other.id, ticket.id, ticket.seat
                )));
            }
            held.push((interval, ticket));
        }

        Ok(())
    }
}

fn invalid(message: String) -> SeedError {
    SeedError::Invalid(message)
}

fn unique_ids<'a, T>(
    ids: impl Iterator<Item = &'a T>,
    kind: &str,
) -> Result<HashSet<&'a T>, SeedError>
where
    T: std::hash::Hash + Eq + std::fmt::Display + 'a,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(seen)
}

fn ticket_stop<'a>(
    stops: &HashMap<&StopId, &'a Stop>,
    ticket: &Ticket,
    stop: &StopId,
) -> Result<&'a Stop, SeedError> {
    match stops.get(stop) {
        Some(&s) if s.journey == ticket.journey => Ok(s),
        Some(_) => Err(invalid(format!(
            "ticket {}: stop {} is not on journey {}",
            ticket.id, stop, ticket.journey
        ))),
        None => Err(invalid(format!(
            "ticket {} references unknown stop {}",
            ticket.id, stop
        ))),
    }
}
