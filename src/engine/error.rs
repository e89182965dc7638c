use crate::limits::{MAX_FUTURE_DAYS, MIN_RESERVATION_MINUTES, VALID_ROOM_RANGE};
use crate::model::{format_timestamp, Ms};

/// Coarse failure classes; the HTTP layer maps these to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    Conflict,
    NotFound,
}

/// One variant per admission rule, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    InvalidDate,
    InvalidRoom(String),
    StartNotBeforeEnd,
    TooShort,
    StartInPast,
    TooFarAhead,
    Overlap {
        title: String,
        start: Ms,
        end: Ms,
    },
}

impl AdmissionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AdmissionError::Overlap { .. } => ErrorClass::Conflict,
            _ => ErrorClass::InvalidInput,
        }
    }

    /// Short stable name of the failed rule, for logs and metric labels.
    pub fn rule(&self) -> &'static str {
        match self {
            AdmissionError::InvalidDate => "invalid_date",
            AdmissionError::InvalidRoom(_) => "invalid_room",
            AdmissionError::StartNotBeforeEnd => "time_order",
            AdmissionError::TooShort => "min_duration",
            AdmissionError::StartInPast => "in_past",
            AdmissionError::TooFarAhead => "too_far_ahead",
            AdmissionError::Overlap { .. } => "overlap",
        }
    }
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionError::InvalidDate => write!(
                f,
                "Invalid date format. Please provide valid ISO 8601 date-time strings"
            ),
            AdmissionError::InvalidRoom(id) => {
                write!(f, "Invalid room ID \"{id}\". Valid room IDs are {VALID_ROOM_RANGE}")
            }
            AdmissionError::StartNotBeforeEnd => write!(f, "Start time must be before end time"),
            AdmissionError::TooShort => write!(
                f,
                "Reservation must be at least {MIN_RESERVATION_MINUTES} minutes long"
            ),
            AdmissionError::StartInPast => {
                write!(f, "Reservation start time cannot be in the past")
            }
            AdmissionError::TooFarAhead => write!(
                f,
                "Reservations can only be made up to {MAX_FUTURE_DAYS} days (1 year) in advance"
            ),
            AdmissionError::Overlap { title, start, end } => write!(
                f,
                "Reservation overlaps with existing reservation \"{title}\" ({} - {})",
                format_timestamp(*start),
                format_timestamp(*end)
            ),
        }
    }
}

impl std::error::Error for AdmissionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Rejected(AdmissionError),
    NotFound(String),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Rejected(e) => e.class(),
            EngineError::NotFound(_) => ErrorClass::NotFound,
        }
    }
}

impl From<AdmissionError> for EngineError {
    fn from(e: AdmissionError) -> Self {
        EngineError::Rejected(e)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Rejected(e) => e.fmt(f),
            EngineError::NotFound(id) => write!(f, "Reservation with id \"{id}\" not found"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Rejected(e) => Some(e),
            EngineError::NotFound(_) => None,
        }
    }
}
