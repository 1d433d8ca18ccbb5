//! Segment resolution.
//!
//! Turns a (journey, departure station, arrival station) request into the
//! canonical route interval that both the availability engine and the
//! booking coordinator consume. The interval is built here and nowhere else.

use crate::domain::{JourneyId, RouteInterval, StationId, Stop, TrainJourney};
use crate::store::JourneyRepository;

use super::BookingError;
use super::stops::{JourneyStopIndex, JourneyStops};

/// A validated travel segment on one journey.
///
/// # Invariants
///
/// - `boarding` and `alighting` index into `stops`
/// - `interval` is `[boarding.sequence, alighting.sequence)` and non-empty
#[derive(Debug, Clone)]
pub struct ResolvedSegment {
    stops: JourneyStops,
    boarding: usize,
    alighting: usize,
    interval: RouteInterval,
}

impl ResolvedSegment {
    /// The journey travelled.
    pub fn journey(&self) -> &TrainJourney {
        self.stops.journey()
    }

    /// Shorthand for `journey().id`.
    pub fn journey_id(&self) -> &JourneyId {
        &self.stops.journey().id
    }

    /// The half-open interval of stop sequences occupied.
    pub fn interval(&self) -> RouteInterval {
        self.interval
    }

    /// The stop where the passenger boards.
    pub fn boarding(&self) -> &Stop {
        &self.stops.stops()[self.boarding]
    }

    /// The stop where the passenger alights.
    pub fn alighting(&self) -> &Stop {
        &self.stops.stops()[self.alighting]
    }

    /// Stops from boarding to alighting, both included.
    pub fn calls(&self) -> &[Stop] {
        &self.stops.stops()[self.boarding..=self.alighting]
    }

    /// Distance travelled, in kilometres.
    ///
    /// Saturates at zero if the distance table is not monotonic.
    pub fn distance(&self) -> u32 {
        self.alighting()
            .distance
            .saturating_sub(self.boarding().distance)
    }

    /// The journey's full stop list, for deriving ticket intervals.
    pub fn journey_stops(&self) -> &JourneyStops {
        &self.stops
    }
}

/// Resolves station pairs into route intervals.
pub struct SegmentResolver<S> {
    index: JourneyStopIndex<S>,
}

impl<S> Clone for SegmentResolver<S> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
        }
    }
}

impl<S: JourneyRepository> SegmentResolver<S> {
    /// Create a resolver on top of a stop index.
    pub fn new(index: JourneyStopIndex<S>) -> Self {
        Self { index }
    }

    /// Resolve a departure/arrival station pair on a journey.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the journey does not exist
    /// - `StationNotOnRoute` if either station is not called at
    /// - `InvalidSegment` if departure is not strictly before arrival
    pub fn resolve(
        &self,
        journey: &JourneyId,
        departure: &StationId,
        arrival: &StationId,
    ) -> Result<ResolvedSegment, BookingError> {
        let stops = self.index.stops_of(journey)?;
        let from = stops.sequence_of(departure)?;
        let to = stops.sequence_of(arrival)?;

        let interval = RouteInterval::new(from, to).map_err(|_| {
            BookingError::InvalidSegment(if from == to {
                format!("departure and arrival are both {departure}")
            } else {
                format!(
                    "{departure} (stop {from}) is after {arrival} (stop {to}) on journey {journey}"
                )
            })
        })?;

        let position = |sequence: u32| {
            stops
                .stops()
                .iter()
                .position(|s| s.sequence == sequence)
                .ok_or_else(|| {
                    BookingError::Inconsistent(format!(
                        "journey {journey} lost stop with sequence {sequence}"
                    ))
                })
        };
        let boarding = position(from)?;
        let alighting = position(to)?;

        Ok(ResolvedSegment {
            stops,
            boarding,
            alighting,
            interval,
        })
    }
}
