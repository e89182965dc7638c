use crate::model::Ms;

/// The fixed room pool. Membership is by exact string match.
pub const VALID_ROOM_IDS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];

/// Human-readable description of `VALID_ROOM_IDS` used in error messages.
pub const VALID_ROOM_RANGE: &str = "1-10";

pub const MIN_RESERVATION_MINUTES: i64 = 5;
pub const MIN_RESERVATION_MS: Ms = MIN_RESERVATION_MINUTES * 60_000;

/// How far ahead a reservation may start, in calendar days.
pub const MAX_FUTURE_DAYS: u64 = 365;

pub const MIN_TITLE_LEN: usize = 1;
pub const MAX_TITLE_LEN: usize = 150;
