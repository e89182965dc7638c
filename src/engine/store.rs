use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// In-memory reservation storage. Performs no validation: whatever is
/// inserted is assumed to have passed admission already.
pub struct ReservationStore {
    rooms: DashMap<RoomId, SharedRoomState>,
    /// Reverse lookup: reservation id → room id
    reservation_to_room: DashMap<Ulid, RoomId>,
}

impl Default for ReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore {
    /// One empty timeline per room in the fixed pool.
    pub fn new() -> Self {
        let rooms = DashMap::new();
        for room_id in RoomId::all() {
            rooms.insert(room_id, Arc::new(RwLock::new(RoomState::new(room_id))));
        }
        Self {
            rooms,
            reservation_to_room: DashMap::new(),
        }
    }

    // ── Rooms ────────────────────────────────────────────────

    pub fn room(&self, room_id: RoomId) -> SharedRoomState {
        self.rooms
            .entry(room_id)
            .or_insert_with(|| Arc::new(RwLock::new(RoomState::new(room_id))))
            .value()
            .clone()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    // ── Reservation index ────────────────────────────────────

    pub fn room_for(&self, id: &Ulid) -> Option<RoomId> {
        self.reservation_to_room.get(id).map(|e| *e.value())
    }

    /// Number of stored reservations across all rooms.
    pub fn len(&self) -> usize {
        self.reservation_to_room.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservation_to_room.is_empty()
    }

    // ── Locked-room operations (caller holds the write lock) ─

    /// Insert into a room whose write lock the caller already holds.
    pub fn insert_locked(&self, rs: &mut RoomState, reservation: Reservation) {
        self.reservation_to_room.insert(reservation.id, rs.room_id);
        rs.insert(reservation);
    }

    pub fn remove_locked(&self, rs: &mut RoomState, id: Ulid) -> Option<Reservation> {
        let removed = rs.remove(id)?;
        self.reservation_to_room.remove(&id);
        Some(removed)
    }

    // ── Store contract ───────────────────────────────────────

    pub async fn insert(&self, reservation: Reservation) {
        let rs = self.room(reservation.room_id);
        let mut guard = rs.write().await;
        self.insert_locked(&mut guard, reservation);
    }

    /// Returns the removed reservation, `None` if the id was unknown.
    pub async fn remove(&self, id: Ulid) -> Option<Reservation> {
        let room_id = self.room_for(&id)?;
        let rs = self.room(room_id);
        let mut guard = rs.write().await;
        self.remove_locked(&mut guard, id)
    }

    pub async fn find_by_id(&self, id: Ulid) -> Option<Reservation> {
        let room_id = self.room_for(&id)?;
        let rs = self.room(room_id);
        let guard = rs.read().await;
        guard.get(id).cloned()
    }

    /// Ascending by start time; equal starts in insertion order.
    pub async fn find_by_room(&self, room_id: RoomId) -> Vec<Reservation> {
        let rs = self.room(room_id);
        let guard = rs.read().await;
        guard.reservations.clone()
    }

    /// Every stored reservation, in no particular order.
    pub async fn find_all(&self) -> Vec<Reservation> {
        let rooms: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut all = Vec::with_capacity(self.len());
        for rs in rooms {
            let guard = rs.read().await;
            all.extend(guard.reservations.iter().cloned());
        }
        all
    }

    pub async fn clear(&self) {
        let rooms: Vec<SharedRoomState> = self.rooms.iter().map(|e| e.value().clone()).collect();
        for rs in rooms {
            let mut guard = rs.write().await;
            for r in guard.reservations.drain(..) {
                self.reservation_to_room.remove(&r.id);
            }
        }
    }
}
