//! Single-process in-memory store.
//!
//! Reference data is immutable once loaded and is read without locking.
//! Tickets live behind one `RwLock`; each repository call takes the lock for
//! exactly the duration of the call.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::domain::{
    Coach, CoachId, JourneyId, NewTicket, OrderId, Seat, SeatId, Station, StationId, Stop,
    Ticket, TicketId, TicketStatus, Train, TrainId, TrainJourney,
};

use super::seed::{Seed, SeedError};
use super::{JourneyRepository, SeatRepository, StoreError, TicketRepository};

/// In-memory implementation of every repository trait.
#[derive(Debug)]
pub struct MemoryStore {
    stations: BTreeMap<StationId, Station>,
    trains: HashMap<TrainId, Train>,
    coaches: HashMap<CoachId, Coach>,
    seats: BTreeMap<SeatId, Seat>,
    journeys: HashMap<JourneyId, TrainJourney>,
    stops: HashMap<JourneyId, Vec<Stop>>,
    tickets: RwLock<TicketTable>,
}

#[derive(Debug, Default)]
struct TicketTable {
    by_id: HashMap<TicketId, Ticket>,
    /// Ticket ids per (journey, seat), in issue order.
    by_seat: HashMap<(JourneyId, SeatId), Vec<TicketId>>,
    next_serial: u64,
}

impl TicketTable {
    fn insert(&mut self, ticket: Ticket) {
        self.by_seat
            .entry((ticket.journey.clone(), ticket.seat))
            .or_default()
            .push(ticket.id.clone());
        self.by_id.insert(ticket.id.clone(), ticket);
    }

    /// Next unused id of the form `TK000042`.
    fn allocate_id(&mut self) -> TicketId {
        loop {
            self.next_serial += 1;
            let candidate = format!("TK{:06}", self.next_serial);
            // Formatted ids are never blank.
            if let Ok(id) = TicketId::parse(&candidate)
                && !self.by_id.contains_key(&id)
            {
                return id;
            }
        }
    }
}

impl MemoryStore {
    /// Build a store from validated seed data.
    pub fn from_seed(seed: Seed) -> Result<Self, SeedError> {
        seed.validate()?;

        let mut stops: HashMap<JourneyId, Vec<Stop>> = HashMap::new();
        for stop in seed.stops {
            stops.entry(stop.journey.clone()).or_default().push(stop);
        }

        let mut table = TicketTable::default();
        for ticket in seed.tickets {
            table.insert(ticket);
        }

        let store = Self {
            stations: seed.stations.into_iter().map(|s| (s.id.clone(), s)).collect(),
            trains: seed.trains.into_iter().map(|t| (t.id.clone(), t)).collect(),
            coaches: seed.coaches.into_iter().map(|c| (c.id, c)).collect(),
            seats: seed.seats.into_iter().map(|s| (s.id, s)).collect(),
            journeys: seed.journeys.into_iter().map(|j| (j.id.clone(), j)).collect(),
            stops,
            tickets: RwLock::new(table),
        };

        debug!(
            stations = store.stations.len(),
            journeys = store.journeys.len(),
            seats = store.seats.len(),
            "loaded in-memory store"
        );
        Ok(store)
    }

    /// Number of tickets ever issued or loaded, in any status.
    pub fn ticket_count(&self) -> Result<usize, StoreError> {
        Ok(self.read_tickets()?.by_id.len())
    }

    fn read_tickets(&self) -> Result<RwLockReadGuard<'_, TicketTable>, StoreError> {
        self.tickets.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_tickets(&self) -> Result<RwLockWriteGuard<'_, TicketTable>, StoreError> {
        self.tickets.write().map_err(|_| StoreError::Poisoned)
    }
}

impl JourneyRepository for MemoryStore {
    fn journey(&self, id: &JourneyId) -> Result<Option<TrainJourney>, StoreError> {
        Ok(self.journeys.get(id).cloned())
    }

    fn journeys(&self) -> Result<Vec<TrainJourney>, StoreError> {
        let mut journeys: Vec<TrainJourney> = self.journeys.values().cloned().collect();
        journeys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(journeys)
    }

    fn stops_of(&self, id: &JourneyId) -> Result<Vec<Stop>, StoreError> {
        Ok(self.stops.get(id).cloned().unwrap_or_default())
    }

    fn station(&self, id: &StationId) -> Result<Option<Station>, StoreError> {
        Ok(self.stations.get(id).cloned())
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(self.stations.values().cloned().collect())
    }
}

impl SeatRepository for MemoryStore {
    fn train(&self, id: &TrainId) -> Result<Option<Train>, StoreError> {
        Ok(self.trains.get(id).cloned())
    }

    fn coaches_of_train(&self, id: &TrainId) -> Result<Vec<Coach>, StoreError> {
        let mut coaches: Vec<Coach> = self
            .coaches
            .values()
            .filter(|c| &c.train == id)
            .cloned()
            .collect();
        coaches.sort_by_key(|c| (c.coach_number, c.id));
        Ok(coaches)
    }

    fn seats_of_train(&self, id: &TrainId) -> Result<Vec<Seat>, StoreError> {
        Ok(self
            .seats
            .values()
            .filter(|s| self.coaches.get(&s.coach).is_some_and(|c| &c.train == id))
            .cloned()
            .collect())
    }

    fn train_of_seat(&self, id: SeatId) -> Result<Option<TrainId>, StoreError> {
        Ok(self
            .seats
            .get(&id)
            .and_then(|s| self.coaches.get(&s.coach))
            .map(|c| c.train.clone()))
    }
}

impl TicketRepository for MemoryStore {
    fn ticket(&self, id: &TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.read_tickets()?.by_id.get(id).cloned())
    }

    fn active_tickets_for_seat(
        &self,
        journey: &JourneyId,
        seat: SeatId,
    ) -> Result<Vec<Ticket>, StoreError> {
        let table = self.read_tickets()?;
        let Some(ids) = table.by_seat.get(&(journey.clone(), seat)) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| table.by_id.get(id))
            .filter(|t| t.status.holds_seat())
            .cloned()
            .collect())
    }

    fn tickets_of_order(&self, order: &OrderId) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .read_tickets()?
            .by_id
            .values()
            .filter(|t| &t.order == order)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tickets)
    }

    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut table = self.write_tickets()?;
        let id = table.allocate_id();
        let ticket = ticket.issue(id);
        table.insert(ticket.clone());
        Ok(ticket)
    }

    fn update_ticket_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut table = self.write_tickets()?;
        Ok(table.by_id.get_mut(id).map(|t| {
            t.status = status;
            t.clone()
        }))
    }

    fn reassign_order(
        &self,
        id: &TicketId,
        order: OrderId,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut table = self.write_tickets()?;
        Ok(table.by_id.get_mut(id).map(|t| {
            t.order = order;
            t.clone()
        }))
    }
}
