use ulid::Ulid;

use crate::model::*;

/// Turnaround window starting at checkout. Late iff a booking on the same
/// vehicle starts inside `[checkout_at, checkout_at + prep_minutes)`.
///
/// Non-positive `prep_minutes` collapse the window to zero length, which can
/// never be late; overlap in that case is the conflict detector's business.
pub fn preparation_window(
    timeline: &Timeline,
    booking_id: Ulid,
    checkout_at: Ms,
    prep_minutes: i64,
) -> PreparationWindow {
    let start = checkout_at;
    let end = start + prep_minutes.max(0) * MINUTE_MS;
    let is_late = timeline
        .intervals
        .iter()
        .filter(|i| i.kind == IntervalKind::Booking && i.source_id != booking_id)
        .filter(|i| i.span.start >= checkout_at)
        .map(|i| i.span.start)
        .min()
        .is_some_and(|next_start| next_start < end);
    PreparationWindow {
        booking_id,
        vehicle_id: timeline.vehicle_id,
        start,
        end,
        is_late,
    }
}

/// Planning-event record persisted for a preparation window.
pub fn preparation_event(window: &PreparationWindow, agency_id: Ulid) -> PlanningEventRecord {
    PlanningEventRecord {
        id: Ulid::new(),
        vehicle_id: Some(window.vehicle_id),
        agency_id: Some(agency_id),
        booking_id: Some(window.booking_id),
        kind: PlanningEventKind::PreparationTime.as_str().to_string(),
        start: window.start,
        end: window.end,
        is_late: window.is_late,
        label: None,
    }
}
