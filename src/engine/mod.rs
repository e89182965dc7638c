mod admission;
mod error;
mod store;

pub use admission::{check_no_overlap, validate, Admissible};
pub use error::{AdmissionError, EngineError, ErrorClass};
pub use store::{ReservationStore, SharedRoomState};

use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;
use crate::observability;

/// Owns the reservation store and applies admission policy to it.
pub struct Engine {
    pub store: ReservationStore,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            store: ReservationStore::new(),
        }
    }

    /// Decide without storing. See [`Engine::commit`].
    pub async fn evaluate(&self, candidate: &Candidate) -> Result<Reservation, AdmissionError> {
        self.evaluate_at(candidate, now_ms()).await
    }

    pub async fn evaluate_at(
        &self,
        candidate: &Candidate,
        now: Ms,
    ) -> Result<Reservation, AdmissionError> {
        admission::evaluate(candidate, &self.store, now).await
    }

    /// Store a reservation returned by [`Engine::evaluate`]. Between the two
    /// calls another writer may have taken the slot; use
    /// [`Engine::create_reservation`] when that matters.
    pub async fn commit(&self, reservation: Reservation) {
        self.store.insert(reservation).await;
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).increment(1.0);
    }

    /// Evaluate and commit under the room's write lock, so no concurrent
    /// admission can interleave between the overlap check and the insert.
    pub async fn create_reservation(&self, candidate: &Candidate) -> Result<Reservation, EngineError> {
        self.create_reservation_at(candidate, now_ms()).await
    }

    pub async fn create_reservation_at(
        &self,
        candidate: &Candidate,
        now: Ms,
    ) -> Result<Reservation, EngineError> {
        let admissible = admission::validate(candidate, now).inspect_err(record_rejection)?;

        let rs = self.store.room(admissible.room_id);
        let mut guard = rs.write().await;
        let reservation = admissible.admit(&guard).inspect_err(record_rejection)?;
        self.store.insert_locked(&mut guard, reservation.clone());
        drop(guard);

        info!(
            id = %reservation.id,
            room = %reservation.room_id,
            start = %format_timestamp(reservation.start),
            end = %format_timestamp(reservation.end),
            "reservation admitted"
        );
        metrics::counter!(observability::ADMISSIONS_TOTAL).increment(1);
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).increment(1.0);
        Ok(reservation)
    }

    /// Cancel by id. Ids that are unknown or not even well-formed are `NotFound`.
    pub async fn cancel_reservation(&self, id: &str) -> Result<Reservation, EngineError> {
        let not_found = || EngineError::NotFound(id.to_string());
        let ulid = parse_id(id).ok_or_else(not_found)?;
        let room_id = self.store.room_for(&ulid).ok_or_else(not_found)?;

        let rs = self.store.room(room_id);
        let mut guard = rs.write().await;
        let removed = self
            .store
            .remove_locked(&mut guard, ulid)
            .ok_or_else(not_found)?;
        drop(guard);

        info!(id = %removed.id, room = %removed.room_id, "reservation cancelled");
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).decrement(1.0);
        Ok(removed)
    }

    pub async fn get_reservation(&self, id: &str) -> Option<Reservation> {
        let ulid = parse_id(id)?;
        self.store.find_by_id(ulid).await
    }

    /// Reservations of one room, ascending by start time.
    pub async fn list_room(&self, room_id: &str) -> Result<Vec<Reservation>, EngineError> {
        let room_id = RoomId::parse(room_id)
            .ok_or_else(|| AdmissionError::InvalidRoom(room_id.to_string()))?;
        Ok(self.store.find_by_room(room_id).await)
    }

    pub async fn list_all(&self) -> Vec<Reservation> {
        self.store.find_all().await
    }

    pub fn reservation_count(&self) -> usize {
        self.store.len()
    }

    /// Drop every reservation. Reset/testing only.
    pub async fn clear(&self) {
        self.store.clear().await;
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).set(0.0);
    }
}

/// Ids are opaque: only the exact string handed out at admission matches.
/// Crockford decoding alone would also accept case variants of it.
fn parse_id(id: &str) -> Option<Ulid> {
    Ulid::from_string(id).ok().filter(|ulid| ulid.to_string() == id)
}

fn record_rejection(e: &AdmissionError) {
    debug!(rule = e.rule(), "reservation rejected: {e}");
    metrics::counter!(observability::REJECTIONS_TOTAL, "rule" => e.rule()).increment(1);
}
