use std::fmt;

use chrono::{DateTime, Days, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use ulid::Ulid;

use crate::limits::VALID_ROOM_IDS;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Back-to-back spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

// ── Timestamps ───────────────────────────────────────────────────

/// Parse an RFC 3339 date-time (offset required) into Unix milliseconds.
/// Sub-millisecond precision is truncated.
pub fn parse_timestamp(s: &str) -> Option<Ms> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Render as UTC ISO-8601 with millisecond precision, e.g. `2025-01-01T10:00:00.000Z`.
pub fn format_timestamp(ms: Ms) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

/// Calendar-day addition. Saturates at `Ms::MAX` if the result leaves chrono's range.
pub fn add_calendar_days(ms: Ms, days: u64) -> Ms {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .and_then(|dt| dt.checked_add_days(Days::new(days)))
        .map_or(Ms::MAX, |dt| dt.timestamp_millis())
}

pub fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}

// ── Rooms ────────────────────────────────────────────────────────

/// A member of the fixed room pool. Only constructible through [`RoomId::parse`],
/// so holding one proves the room exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(&'static str);

impl RoomId {
    pub fn parse(raw: &str) -> Option<Self> {
        VALID_ROOM_IDS
            .into_iter()
            .find(|id| *id == raw)
            .map(RoomId)
    }

    pub fn all() -> impl Iterator<Item = RoomId> {
        VALID_ROOM_IDS.into_iter().map(RoomId)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

// ── Reservations ─────────────────────────────────────────────────

/// A reservation request as it arrives from the caller: shape-checked,
/// but none of the business rules applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub room_id: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
}

impl Candidate {
    pub fn new(
        room_id: impl Into<String>,
        title: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            title: title.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

/// An admitted reservation. Never mutated after admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: Ulid,
    pub room_id: RoomId,
    pub title: String,
    pub start: Ms,
    pub end: Ms,
    /// Display only; plays no part in admission.
    pub created_at: Ms,
}

/// Timeline of a single room.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room_id: RoomId,
    /// Sorted by `start`; equal starts keep insertion order.
    pub reservations: Vec<Reservation>,
}

impl RoomState {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            reservations: Vec::new(),
        }
    }

    /// Insert after every reservation with `start <= reservation.start`.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.start <= reservation.start);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn get(&self, id: Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Return only reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.end > query.start)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}
