use crate::model::Ms;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// Widest window accepted by availability / conflict / timeline queries (2 years).
pub const MAX_QUERY_WINDOW_MS: Ms = 2 * 366 * 24 * 3_600_000;

/// One week of turnaround.
pub const MAX_PREP_MINUTES: i64 = 7 * 24 * 60;

pub const MAX_AGENCY_VEHICLES: usize = 10_000;
