//! Request routing.
//!
//! Decodes an envelope into a typed `Request`, runs it against the booking
//! core, and renders the outcome as a response. Every failure, including a
//! request that is not valid JSON, becomes an error response; nothing a
//! client sends can take the router down.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::booking::{
    Booking, BookingCoordinator, BookingError, JourneyStopIndex, ResolvedSegment,
    SeatAvailabilityEngine, SegmentResolver,
};
use crate::domain::{SeatId, Station, StationId, StopId, Ticket, TicketId, Train, TrainId};
use crate::store::Store;

use super::protocol::{
    CoachRecord, Envelope, ErrorKind, JourneyRecord, Response, StationRecord, StopRecord,
    TicketRecord, TrainRecord,
};
use super::request::{Request, RouterError, SegmentQuery};

/// Why a request failed.
#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Request(#[from] RouterError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("could not encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Failure {
    fn kind(&self) -> ErrorKind {
        match self {
            Failure::Request(e) => e.kind(),
            Failure::Booking(e) => booking_kind(e),
            Failure::Encode(_) => ErrorKind::Internal,
        }
    }
}

fn booking_kind(err: &BookingError) -> ErrorKind {
    match err {
        BookingError::NotFound { .. }
        | BookingError::StationNotOnRoute { .. }
        | BookingError::SeatNotOnJourney { .. } => ErrorKind::NotFound,
        BookingError::InvalidSegment(_) => ErrorKind::InvalidSegment,
        BookingError::SeatTaken { .. } | BookingError::SectionTimeout { .. } => {
            ErrorKind::Conflict
        }
        BookingError::Inconsistent(_) | BookingError::Store(_) => ErrorKind::Internal,
    }
}

fn encode(value: impl Serialize) -> Result<Value, Failure> {
    Ok(serde_json::to_value(value)?)
}

/// Dispatches requests to the booking core.
pub struct RequestRouter<S> {
    store: Arc<S>,
    index: JourneyStopIndex<S>,
    resolver: SegmentResolver<S>,
    engine: SeatAvailabilityEngine<S>,
    coordinator: BookingCoordinator<S>,
}

impl<S: Store> RequestRouter<S> {
    /// Wire the booking core onto `store`.
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        let index = JourneyStopIndex::new(Arc::clone(&store));
        Self {
            resolver: SegmentResolver::new(index.clone()),
            index,
            engine: SeatAvailabilityEngine::new(Arc::clone(&store)),
            coordinator: BookingCoordinator::new(Arc::clone(&store), lock_timeout),
            store,
        }
    }

    /// Handle one raw request line.
    pub async fn handle_bytes(&self, line: &[u8]) -> Response {
        match serde_json::from_slice::<Envelope>(line) {
            Ok(envelope) => self.handle(envelope).await,
            Err(e) => {
                debug!(error = %e, "malformed request");
                let err = RouterError::Malformed(e.to_string());
                Response::error(err.kind(), err.to_string())
            }
        }
    }

    /// Handle one decoded envelope.
    pub async fn handle(&self, envelope: Envelope) -> Response {
        let outcome = match Request::decode(&envelope) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(Failure::from(e)),
        };

        match outcome {
            Ok(result) => {
                debug!(
                    category = %envelope.category,
                    operation = %envelope.operation,
                    "request ok"
                );
                Response::ok(result)
            }
            Err(failure) => {
                let kind = failure.kind();
                match kind {
                    ErrorKind::Internal => error!(
                        category = %envelope.category,
                        operation = %envelope.operation,
                        error = %failure,
                        "request failed"
                    ),
                    ErrorKind::Conflict => info!(
                        category = %envelope.category,
                        operation = %envelope.operation,
                        error = %failure,
                        "request conflicted"
                    ),
                    _ => warn!(
                        category = %envelope.category,
                        operation = %envelope.operation,
                        kind = ?kind,
                        error = %failure,
                        "request rejected"
                    ),
                }
                Response::error(kind, failure.to_string())
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Value, Failure> {
        match request {
            Request::UnavailableSeats(query) => {
                let segment = self.resolve(&query)?;
                let seats: Vec<SeatId> =
                    self.engine.unavailable_seats(&segment)?.into_iter().collect();
                encode(seats)
            }
            Request::DistanceBetweenStops(query) => encode(self.resolve(&query)?.distance()),
            Request::StopsBetween(query) => {
                let segment = self.resolve(&query)?;
                encode(segment.calls().iter().map(StopRecord::from).collect::<Vec<_>>())
            }
            Request::AllStops(journey) => {
                let stops = self.index.stops_of(&journey)?;
                encode(stops.stops().iter().map(StopRecord::from).collect::<Vec<_>>())
            }
            Request::JourneyById(id) => {
                let journey = self
                    .store
                    .journey(&id)
                    .map_err(BookingError::from)?
                    .ok_or_else(|| BookingError::not_found("journey", &id))?;
                encode(JourneyRecord::from(&journey))
            }
            Request::SearchJourneys {
                departure,
                arrival,
                date,
            } => {
                let found = self.index.journeys_between(&departure, &arrival, date)?;
                encode(
                    found
                        .iter()
                        .map(|j| JourneyRecord::from(j.journey()))
                        .collect::<Vec<_>>(),
                )
            }
            Request::AddTicket {
                segment,
                seat,
                passenger,
                order,
            } => {
                let resolved = self.resolve(&segment)?;
                let booking = Booking {
                    seat,
                    passenger,
                    order,
                };
                let ticket = self.coordinator.book(&resolved, booking).await?;
                encode(&ticket.id)
            }
            Request::TicketById(id) => encode(TicketRecord::from(&self.require_ticket(&id)?)),
            Request::UpdateTicketStatus { ticket, status } => {
                let updated = self.coordinator.set_status(&ticket, status).await?;
                encode(TicketRecord::from(&updated))
            }
            Request::ReassignTicket { ticket, order } => {
                let updated = self
                    .store
                    .reassign_order(&ticket, order)
                    .map_err(BookingError::from)?
                    .ok_or_else(|| BookingError::not_found("ticket", &ticket))?;
                info!(ticket = %updated.id, order = %updated.order, "ticket reassigned");
                encode(TicketRecord::from(&updated))
            }
            Request::TicketsOfOrder { order, refund } => {
                let tickets = self
                    .store
                    .tickets_of_order(&order)
                    .map_err(BookingError::from)?;
                encode(
                    tickets
                        .iter()
                        .filter(|t| !refund || t.status.holds_seat())
                        .map(TicketRecord::from)
                        .collect::<Vec<_>>(),
                )
            }
            Request::StationById(id) => {
                let station = self
                    .store
                    .station(&id)
                    .map_err(BookingError::from)?
                    .ok_or_else(|| BookingError::not_found("station", &id))?;
                encode(StationRecord::from(&station))
            }
            Request::StationsForTicket(id) => {
                let ticket = self.require_ticket(&id)?;
                let boarding = self.station_of_stop(&ticket, &ticket.boarding)?;
                let alighting = self.station_of_stop(&ticket, &ticket.alighting)?;
                encode([
                    StationRecord::from(&boarding),
                    StationRecord::from(&alighting),
                ])
            }
            Request::AllStations => {
                let stations = self.store.stations().map_err(BookingError::from)?;
                encode(stations.iter().map(StationRecord::from).collect::<Vec<_>>())
            }
            Request::CoachesOfTrain(train) => {
                self.require_train(&train)?;
                let coaches = self
                    .store
                    .coaches_of_train(&train)
                    .map_err(BookingError::from)?;
                encode(coaches.iter().map(CoachRecord::from).collect::<Vec<_>>())
            }
            Request::TrainById(id) => encode(TrainRecord::from(&self.require_train(&id)?)),
        }
    }

    fn resolve(&self, query: &SegmentQuery) -> Result<ResolvedSegment, BookingError> {
        self.resolver
            .resolve(&query.journey, &query.departure, &query.arrival)
    }

    fn require_ticket(&self, id: &TicketId) -> Result<Ticket, BookingError> {
        self.store
            .ticket(id)?
            .ok_or_else(|| BookingError::not_found("ticket", id))
    }

    /// The station a ticket's stop is at. The stop and station were checked
    /// when the ticket was issued, so a miss here is a store fault.
    fn station_of_stop(&self, ticket: &Ticket, stop: &StopId) -> Result<Station, BookingError> {
        let stops = self.index.stops_of(&ticket.journey)?;
        let station: &StationId = &stops
            .stop(stop)
            .ok_or_else(|| {
                BookingError::Inconsistent(format!(
                    "ticket {} refers to stop {stop} which is not on journey {}",
                    ticket.id, ticket.journey
                ))
            })?
            .station;
        self.store.station(station)?.ok_or_else(|| {
            BookingError::Inconsistent(format!(
                "stop {stop} of ticket {} is at unknown station {station}",
                ticket.id
            ))
        })
    }

    fn require_train(&self, id: &TrainId) -> Result<Train, BookingError> {
        self.store
            .train(id)?
            .ok_or_else(|| BookingError::not_found("train", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::store::MemoryStore;
    use crate::store::seed::fixtures;

    fn router() -> RequestRouter<MemoryStore> {
        let store = Arc::new(MemoryStore::from_seed(fixtures::network()).unwrap());
        RequestRouter::new(store, Duration::from_secs(2))
    }

    async fn call(
        router: &RequestRouter<MemoryStore>,
        category: &str,
        operation: &str,
        params: &[(&str, &str)],
    ) -> Response {
        router
            .handle(Envelope::new(category, operation, params.iter().copied()))
            .await
    }

    fn segment<'a>(journey: &'a str, from: &'a str, to: &'a str) -> [(&'a str, &'a str); 3] {
        [
            ("trainJourneyID", journey),
            ("departureStationID", from),
            ("arrivalStationID", to),
        ]
    }

    #[tokio::test]
    async fn overlapping_ticket_makes_seat_unavailable() {
        let r = router();
        let response = call(
            &r,
            "trainjourney",
            "getUnavailableSeats",
            &segment("TJ1", "A", "C"),
        )
        .await;
        assert_eq!(response.result(), Some(&json!([1])));
    }

    #[tokio::test]
    async fn seat_free_after_ticket_alights() {
        let r = router();
        let response = call(
            &r,
            "trainjourney",
            "getUnavailableSeats",
            &segment("TJ1", "D", "E"),
        )
        .await;
        assert_eq!(response.result(), Some(&json!([])));
    }

    #[tokio::test]
    async fn reversed_segment_is_invalid() {
        let r = router();
        let response = call(
            &r,
            "trainjourney",
            "getUnavailableSeats",
            &segment("TJ1", "C", "A"),
        )
        .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidSegment));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_bookings_admit_one() {
        let r = Arc::new(router());
        let book = |passenger: &'static str| {
            let r = Arc::clone(&r);
            tokio::spawn(async move {
                let mut params = segment("TJ1", "A", "C").to_vec();
                params.extend([("seatID", "2"), ("passengerID", passenger), ("orderID", "O9")]);
                call(&r, "ticket", "addTicket", &params).await
            })
        };
        let (first, second) = tokio::join!(book("P1"), book("P2"));
        let responses = [first.unwrap(), second.unwrap()];

        let booked: Vec<_> = responses.iter().filter_map(Response::result).collect();
        assert_eq!(booked.len(), 1);
        assert!(booked[0].as_str().is_some_and(|id| id.starts_with("TK")));
        assert_eq!(
            responses
                .iter()
                .filter(|r| r.error_kind() == Some(ErrorKind::Conflict))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn booked_ticket_round_trip() {
        let r = router();
        let mut params = segment("TJ1", "B", "D").to_vec();
        params.extend([("seatID", "3"), ("passengerID", "P5"), ("orderID", "O5")]);
        let booked = call(&r, "ticket", "addTicket", &params).await;
        let id = booked.result().and_then(Value::as_str).unwrap().to_string();

        let fetched = call(&r, "ticket", "getTicketByID", &[("ticketID", id.as_str())]).await;
        let ticket = fetched.result().unwrap();
        assert_eq!(ticket["seatID"], json!(3));
        assert_eq!(ticket["boardingStopID"], json!("S2"));
        assert_eq!(ticket["alightingStopID"], json!("S4"));
        assert_eq!(ticket["status"], json!("active"));

        let moved = call(
            &r,
            "ticket",
            "reassignTicketToNewOrder",
            &[("ticketID", id.as_str()), ("newOrderID", "O6")],
        )
        .await;
        assert_eq!(moved.result().unwrap()["orderID"], json!("O6"));

        let refunded = call(
            &r,
            "ticket",
            "updateTicketStatus",
            &[("ticketID", id.as_str()), ("status", "refunded")],
        )
        .await;
        assert_eq!(refunded.result().unwrap()["status"], json!("refunded"));

        let seats = call(
            &r,
            "trainjourney",
            "getUnavailableSeats",
            &segment("TJ1", "B", "D"),
        )
        .await;
        assert_eq!(seats.result(), Some(&json!([1])));
    }

    #[tokio::test]
    async fn journey_queries() {
        let r = router();

        let distance = call(
            &r,
            "trainjourney",
            "getDistanceBetweenTwoStops",
            &segment("TJ1", "B", "E"),
        )
        .await;
        assert_eq!(distance.result(), Some(&json!(165)));

        let stops = call(&r, "trainjourney", "getStops", &segment("TJ1", "B", "D")).await;
        let stations: Vec<_> = stops
            .result()
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|s| s["stationID"].clone())
            .collect();
        assert_eq!(stations, vec![json!("B"), json!("C"), json!("D")]);

        let all = call(&r, "trainjourney", "getAllStops", &[("journeyID", "TJ2")]).await;
        assert_eq!(all.result().and_then(Value::as_array).map(Vec::len), Some(3));

        let journey = call(
            &r,
            "trainjourney",
            "getTrainJourneyByID",
            &[("trainJourneyID", "TJ3")],
        )
        .await;
        assert_eq!(journey.result().unwrap()["trainID"], json!("T2"));
    }

    fn ids(response: &Response, field: &str) -> Vec<Value> {
        response
            .result()
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|v| v[field].clone())
            .collect()
    }

    async fn search(
        r: &RequestRouter<MemoryStore>,
        from: &str,
        to: &str,
        date: &str,
    ) -> Response {
        call(
            r,
            "trainjourney",
            "searchTrainJourney",
            &[
                ("departureStation", from),
                ("arrivalStation", to),
                ("departureDate", date),
            ],
        )
        .await
    }

    #[tokio::test]
    async fn journey_search() {
        let r = router();

        let both = search(&r, "A", "C", "2026-10-20").await;
        assert_eq!(ids(&both, "trainJourneyID"), vec![json!("TJ1"), json!("TJ2")]);

        let off_route = search(&r, "B", "E", "2026-10-20").await;
        assert_eq!(ids(&off_route, "trainJourneyID"), vec![json!("TJ1")]);

        let reversed = search(&r, "C", "A", "2026-10-20").await;
        assert_eq!(reversed.result(), Some(&json!([])));

        let wrong_date = search(&r, "A", "C", "2026-10-21").await;
        assert_eq!(wrong_date.result(), Some(&json!([])));

        let bad_date = search(&r, "A", "C", "tomorrow").await;
        assert_eq!(bad_date.error_kind(), Some(ErrorKind::ValidationError));
    }

    #[tokio::test]
    async fn refund_eligible_tickets_of_order() {
        let r = router();
        let mut params = segment("TJ1", "A", "B").to_vec();
        params.extend([("seatID", "4"), ("passengerID", "P2"), ("orderID", "O1")]);
        let booked = call(&r, "ticket", "addTicket", &params).await;
        let id = booked.result().and_then(Value::as_str).unwrap().to_string();

        let eligible = call(
            &r,
            "ticket",
            "fetchEligibleRefundTicketsForOrder",
            &[("orderID", "O1"), ("isRefund", "true")],
        )
        .await;
        assert_eq!(
            ids(&eligible, "ticketID"),
            vec![json!("TK000001"), json!(id.as_str())]
        );

        let refunded = call(
            &r,
            "ticket",
            "updateTicketStatus",
            &[("ticketID", "TK000001"), ("status", "refunded")],
        )
        .await;
        assert!(refunded.result().is_some());

        let eligible = call(
            &r,
            "ticket",
            "fetchEligibleRefundTicketsForOrder",
            &[("orderID", "O1"), ("isRefund", "true")],
        )
        .await;
        assert_eq!(ids(&eligible, "ticketID"), vec![json!(id.as_str())]);

        let all = call(
            &r,
            "ticket",
            "fetchEligibleRefundTicketsForOrder",
            &[("orderID", "O1"), ("isRefund", "false")],
        )
        .await;
        assert_eq!(ids(&all, "status"), vec![json!("refunded"), json!("active")]);

        let none = call(
            &r,
            "ticket",
            "fetchEligibleRefundTicketsForOrder",
            &[("orderID", "O404")],
        )
        .await;
        assert_eq!(none.result(), Some(&json!([])));
    }

    #[tokio::test]
    async fn stations_for_ticket() {
        let r = router();

        let stations = call(
            &r,
            "station",
            "getStationsForTicket",
            &[("ticketID", "TK000001")],
        )
        .await;
        assert_eq!(ids(&stations, "stationID"), vec![json!("B"), json!("D")]);

        let unknown = call(
            &r,
            "station",
            "getStationsForTicket",
            &[("ticketID", "TK999999")],
        )
        .await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn reference_queries() {
        let r = router();

        let station = call(&r, "station", "getStationByID", &[("stationID", "Z")]).await;
        assert_eq!(station.result().unwrap()["stationID"], json!("Z"));

        let stations = call(&r, "station", "getAllStation", &[]).await;
        assert_eq!(stations.result().and_then(Value::as_array).map(Vec::len), Some(6));

        let coaches = call(&r, "coach", "getCoaches", &[("trainID", "T1")]).await;
        assert_eq!(coaches.result().and_then(Value::as_array).map(Vec::len), Some(1));

        let empty = call(&r, "coach", "getCoaches", &[("trainID", "T2")]).await;
        assert_eq!(empty.result(), Some(&json!([])));

        let train = call(&r, "train", "getTrainByID", &[("trainID", "T9")]).await;
        assert_eq!(train.error_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn lookup_failures() {
        let r = router();

        let unknown_journey = call(
            &r,
            "trainjourney",
            "getUnavailableSeats",
            &segment("TJ404", "A", "B"),
        )
        .await;
        assert_eq!(unknown_journey.error_kind(), Some(ErrorKind::NotFound));

        let off_route = call(&r, "trainjourney", "getStops", &segment("TJ1", "A", "Z")).await;
        assert_eq!(off_route.error_kind(), Some(ErrorKind::NotFound));

        let ticket = call(&r, "ticket", "getTicketByID", &[("ticketID", "TK999999")]).await;
        assert_eq!(ticket.error_kind(), Some(ErrorKind::NotFound));

        let coaches = call(&r, "coach", "getCoaches", &[("trainID", "T9")]).await;
        assert_eq!(coaches.error_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn bad_requests_are_answered() {
        let r = router();

        let unknown = call(&r, "ticket", "printTicket", &[]).await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::UnknownOperation));

        let missing = call(&r, "ticket", "getTicketByID", &[]).await;
        assert_eq!(missing.error_kind(), Some(ErrorKind::ValidationError));

        let garbage = r.handle_bytes(b"{not json").await;
        assert_eq!(garbage.error_kind(), Some(ErrorKind::ValidationError));

        let wrong_shape = r.handle_bytes(br#"{"category": 7}"#).await;
        assert_eq!(wrong_shape.error_kind(), Some(ErrorKind::ValidationError));
    }

    #[tokio::test]
    async fn raw_line_with_newline() {
        let r = router();
        let line = b"{\"category\":\"station\",\"operation\":\"getAllStation\"}\n";
        assert!(r.handle_bytes(line).await.result().is_some());
    }
}
