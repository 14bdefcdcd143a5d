use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, the only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 60 * MINUTE_MS;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for untrusted input.
    pub fn try_new(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// `[a0,a1)` and `[b0,b1)` overlap iff `a0 < b1 && b0 < a1`; adjacency never overlaps.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

// ── Timeline intervals ───────────────────────────────────────────

/// What occupies the vehicle during an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntervalKind {
    Booking,
    Maintenance,
    Preparation,
    Blackout,
    /// Planning event whose type did not resolve to a known kind.
    Other,
}

/// A single interval on a vehicle timeline. Bookings, maintenance and planning
/// events are all folded into this one shape when the index is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Canonical vehicle id.
    pub resource_id: Ulid,
    /// Id of the booking / maintenance / planning event this came from.
    pub source_id: Ulid,
    pub span: Span,
    pub kind: IntervalKind,
    pub is_late: bool,
    pub label: Option<String>,
    /// Unscheduled planned maintenance, anchored at the query window start.
    pub floating: bool,
}

/// Sorted, pre-filtered intervals of one canonical vehicle for one query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub vehicle_id: Ulid,
    pub window: Span,
    /// Sorted by `span.start`.
    pub intervals: Vec<Interval>,
}

impl Timeline {
    pub fn new(vehicle_id: Ulid, window: Span, mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(a.span.end.cmp(&b.span.end))
                .then(a.source_id.cmp(&b.source_id))
        });
        Self {
            vehicle_id,
            window,
            intervals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Return only intervals whose span overlaps the query span.
    /// Uses binary search to skip intervals starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Interval> {
        let right_bound = self
            .intervals
            .partition_point(|i| i.span.start < query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.span.end > query.start)
    }
}

// ── Query results ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub requested: Interval,
    pub conflicts: Vec<Interval>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationWindow {
    pub booking_id: Ulid,
    pub vehicle_id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub is_late: bool,
}

/// Read-time preparation state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparationState {
    None,
    Scheduled,
    Elapsed,
}

impl PreparationWindow {
    pub fn state(&self, now: Ms) -> PreparationState {
        if now < self.end {
            PreparationState::Scheduled
        } else {
            PreparationState::Elapsed
        }
    }
}

pub fn preparation_state(window: Option<&PreparationWindow>, now: Ms) -> PreparationState {
    window.map_or(PreparationState::None, |w| w.state(now))
}

/// What the calendar layer gets per interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub kind: IntervalKind,
    pub start: Ms,
    pub end: Ms,
    pub source_id: Ulid,
    pub is_late: bool,
    pub label: Option<String>,
}

impl From<&Interval> for CalendarEntry {
    fn from(i: &Interval) -> Self {
        Self {
            kind: i.kind,
            start: i.span.start,
            end: i.span.end,
            source_id: i.source_id,
            is_late: i.is_late,
            label: i.label.clone(),
        }
    }
}

// ── Vehicles ─────────────────────────────────────────────────────

/// Scheduling view of a vehicle record, plate already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleResource {
    pub id: Ulid,
    pub agency_id: Ulid,
    pub normalized_plate: String,
    pub updated_at: Ms,
}

/// A vehicle id resolved to its canonical identity plus every duplicate record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVehicle {
    pub canonical_id: Ulid,
    pub agency_id: Ulid,
    /// All record ids sharing the canonical id, canonical included.
    pub member_ids: Vec<Ulid>,
}

// ── Source records ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: Ulid,
    pub agency_id: Ulid,
    pub registration_number: String,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Draft,
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub vehicle_id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: Ulid,
    pub vehicle_id: Ulid,
    pub status: MaintenanceStatus,
    pub planned_at: Option<Ms>,
    pub created_at: Ms,
    #[serde(default)]
    pub label: Option<String>,
}

/// Resolved type of a planning event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningEventKind {
    Booking,
    Maintenance,
    PreparationTime,
    Blackout,
    Other,
}

impl PlanningEventKind {
    /// Case-insensitive, tolerant of `-` and spaces; anything unknown or blank is `Other`.
    pub fn resolve(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match key.as_str() {
            "BOOKING" => Self::Booking,
            "MAINTENANCE" => Self::Maintenance,
            "PREPARATION_TIME" | "PREPARATION" => Self::PreparationTime,
            "BLACKOUT" => Self::Blackout,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "BOOKING",
            Self::Maintenance => "MAINTENANCE",
            Self::PreparationTime => "PREPARATION_TIME",
            Self::Blackout => "BLACKOUT",
            Self::Other => "OTHER",
        }
    }

    /// Timeline kind, or `None` for kinds already sourced natively.
    pub fn interval_kind(&self) -> Option<IntervalKind> {
        match self {
            Self::Booking | Self::Maintenance => None,
            Self::PreparationTime => Some(IntervalKind::Preparation),
            Self::Blackout => Some(IntervalKind::Blackout),
            Self::Other => Some(IntervalKind::Other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningEventRecord {
    pub id: Ulid,
    pub vehicle_id: Option<Ulid>,
    #[serde(default)]
    pub agency_id: Option<Ulid>,
    #[serde(default)]
    pub booking_id: Option<Ulid>,
    /// Raw type string as stored upstream.
    pub kind: String,
    pub start: Ms,
    pub end: Ms,
    #[serde(default)]
    pub is_late: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: Ms, end: Ms, kind: IntervalKind) -> Interval {
        Interval {
            resource_id: Ulid::nil(),
            source_id: Ulid::new(),
            span: Span::new(start, end),
            kind,
            is_late: false,
            label: None,
            floating: false,
        }
    }

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_try_new_rejects_empty() {
        assert!(Span::try_new(5, 5).is_none());
        assert!(Span::try_new(6, 5).is_none());
        assert_eq!(Span::try_new(5, 6), Some(Span::new(5, 6)));
    }

    #[test]
    fn timeline_sorted_on_construction() {
        let tl = Timeline::new(
            Ulid::nil(),
            Span::new(0, 1000),
            vec![
                interval(300, 400, IntervalKind::Booking),
                interval(100, 200, IntervalKind::Maintenance),
                interval(200, 300, IntervalKind::Blackout),
            ],
        );
        let starts: Vec<Ms> = tl.intervals.iter().map(|i| i.span.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let tl = Timeline::new(
            Ulid::nil(),
            Span::new(0, 2000),
            vec![
                interval(100, 200, IntervalKind::Booking),
                interval(450, 600, IntervalKind::Booking),
                interval(1000, 1100, IntervalKind::Booking),
            ],
        );
        let hits: Vec<_> = tl.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let tl = Timeline::new(
            Ulid::nil(),
            Span::new(0, 1000),
            vec![interval(100, 200, IntervalKind::Booking)],
        );
        assert_eq!(tl.overlapping(&Span::new(200, 300)).count(), 0);
        assert_eq!(tl.overlapping(&Span::new(0, 100)).count(), 0);
        assert_eq!(tl.overlapping(&Span::new(199, 300)).count(), 1);
    }

    #[test]
    fn planning_kind_resolution() {
        assert_eq!(PlanningEventKind::resolve("preparation-time"), PlanningEventKind::PreparationTime);
        assert_eq!(PlanningEventKind::resolve(" Blackout "), PlanningEventKind::Blackout);
        assert_eq!(PlanningEventKind::resolve("booking"), PlanningEventKind::Booking);
        assert_eq!(PlanningEventKind::resolve(""), PlanningEventKind::Other);
        assert_eq!(PlanningEventKind::resolve("car wash"), PlanningEventKind::Other);
        assert_eq!(PlanningEventKind::Maintenance.interval_kind(), None);
        assert_eq!(PlanningEventKind::Other.interval_kind(), Some(IntervalKind::Other));
    }

    #[test]
    fn preparation_state_derived_from_clock() {
        let w = PreparationWindow {
            booking_id: Ulid::new(),
            vehicle_id: Ulid::new(),
            start: 1000,
            end: 2000,
            is_late: false,
        };
        assert_eq!(preparation_state(None, 1500), PreparationState::None);
        assert_eq!(preparation_state(Some(&w), 500), PreparationState::Scheduled);
        assert_eq!(preparation_state(Some(&w), 1999), PreparationState::Scheduled);
        assert_eq!(preparation_state(Some(&w), 2000), PreparationState::Elapsed);
    }

    #[test]
    fn interval_kind_serializes_upper_snake() {
        let json = serde_json::to_string(&IntervalKind::Preparation).unwrap();
        assert_eq!(json, "\"PREPARATION\"");
        let status: BookingStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, BookingStatus::InProgress);
    }
}
