//! Admission pipeline.
//!
//! Rules run in a fixed order and stop at the first failure; the order is
//! observable through the error message returned to clients.
//!
//! 1. both timestamps parse
//! 2. room is in the pool
//! 3. start < end
//! 4. duration >= minimum
//! 5. start >= now
//! 6. start <= now + max future days (calendar addition)
//! 7. no overlap with another reservation in the same room
//!
//! Steps 1–6 depend only on the candidate and `now` ([`validate`]). Step 7
//! needs the room's timeline ([`Admissible::admit`]).

use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::store::ReservationStore;
use super::AdmissionError;

/// A candidate that passed every rule that does not depend on stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admissible {
    pub room_id: RoomId,
    pub title: String,
    pub span: Span,
    /// The `now` sampled for this evaluation; becomes `created_at`.
    pub now: Ms,
}

pub fn validate(candidate: &Candidate, now: Ms) -> Result<Admissible, AdmissionError> {
    let (Some(start), Some(end)) = (
        parse_timestamp(&candidate.start_time),
        parse_timestamp(&candidate.end_time),
    ) else {
        return Err(AdmissionError::InvalidDate);
    };

    let room_id = RoomId::parse(&candidate.room_id)
        .ok_or_else(|| AdmissionError::InvalidRoom(candidate.room_id.clone()))?;

    if start >= end {
        return Err(AdmissionError::StartNotBeforeEnd);
    }
    let span = Span::new(start, end);

    if span.duration_ms() < MIN_RESERVATION_MS {
        return Err(AdmissionError::TooShort);
    }
    if start < now {
        return Err(AdmissionError::StartInPast);
    }
    if start > add_calendar_days(now, MAX_FUTURE_DAYS) {
        return Err(AdmissionError::TooFarAhead);
    }

    Ok(Admissible {
        room_id,
        title: candidate.title.clone(),
        span,
        now,
    })
}

/// First stored reservation in `rs` that overlaps `span`, as a conflict error.
pub fn check_no_overlap(rs: &RoomState, span: &Span) -> Result<(), AdmissionError> {
    match rs.overlapping(span).next() {
        Some(existing) => Err(AdmissionError::Overlap {
            title: existing.title.clone(),
            start: existing.start,
            end: existing.end,
        }),
        None => Ok(()),
    }
}

impl Admissible {
    /// Final rule. `rs` must be the timeline of `self.room_id`.
    pub fn admit(self, rs: &RoomState) -> Result<Reservation, AdmissionError> {
        debug_assert_eq!(rs.room_id, self.room_id);
        check_no_overlap(rs, &self.span)?;
        Ok(Reservation {
            id: Ulid::new(),
            room_id: self.room_id,
            title: self.title,
            start: self.span.start,
            end: self.span.end,
            created_at: self.now,
        })
    }
}

/// Full pipeline against the store's current contents. Decides only; the
/// returned reservation is not stored.
pub async fn evaluate(
    candidate: &Candidate,
    store: &ReservationStore,
    now: Ms,
) -> Result<Reservation, AdmissionError> {
    let admissible = validate(candidate, now)?;
    let rs = store.room(admissible.room_id);
    let guard = rs.read().await;
    admissible.admit(&guard)
}
