use tracing::debug;
use ulid::Ulid;

use crate::model::*;

/// Raw records fetched for one query, all belonging to one vehicle's member ids.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub bookings: Vec<BookingRecord>,
    pub maintenances: Vec<MaintenanceRecord>,
    pub events: Vec<PlanningEventRecord>,
}

/// Merge bookings, maintenance and planning events into one sorted timeline
/// for the canonical vehicle, keeping only intervals that overlap `window`.
///
/// Records are attributed to the canonical id when their vehicle id is any of
/// `vehicle.member_ids`; records of other vehicles are ignored.
pub fn build_index(
    vehicle: &ResolvedVehicle,
    window: Span,
    snapshot: &SourceSnapshot,
    default_maintenance_ms: Ms,
) -> Timeline {
    let is_member = |id: &Ulid| vehicle.member_ids.contains(id);
    let canonical = vehicle.canonical_id;
    let mut intervals = Vec::new();

    for b in snapshot.bookings.iter().filter(|b| is_member(&b.vehicle_id)) {
        if let Some(i) = booking_interval(canonical, b) {
            intervals.push(i);
        }
    }

    for m in snapshot.maintenances.iter().filter(|m| is_member(&m.vehicle_id)) {
        if let Some(i) = maintenance_interval(canonical, m, window, default_maintenance_ms) {
            intervals.push(i);
        }
    }

    for e in &snapshot.events {
        if !e.vehicle_id.as_ref().is_some_and(is_member) {
            continue;
        }
        if let Some(i) = event_interval(canonical, e) {
            intervals.push(i);
        }
    }

    intervals.retain(|i| i.span.overlaps(&window));
    Timeline::new(canonical, window, intervals)
}

/// Every booking except a cancelled one reserves planning capacity.
fn booking_interval(canonical: Ulid, b: &BookingRecord) -> Option<Interval> {
    if b.status == BookingStatus::Cancelled {
        return None;
    }
    let Some(span) = Span::try_new(b.start, b.end) else {
        debug!("skipping booking {} with empty span [{}, {})", b.id, b.start, b.end);
        return None;
    };
    Some(Interval {
        resource_id: canonical,
        source_id: b.id,
        span,
        kind: IntervalKind::Booking,
        is_late: false,
        label: None,
        floating: false,
    })
}

/// Only planned and in-progress maintenance occupies the vehicle.
///
/// Scheduled records run `[planned_at, planned_at + default)`. Records without
/// a time are visible in every window: planned ones float at the window start,
/// in-progress ones run from `created_at` until at least the window end, since
/// the vehicle stays in the shop until the record is completed.
fn maintenance_interval(
    canonical: Ulid,
    m: &MaintenanceRecord,
    window: Span,
    default_ms: Ms,
) -> Option<Interval> {
    let (start, end, floating) = match (m.status, m.planned_at) {
        (MaintenanceStatus::Completed | MaintenanceStatus::Cancelled, _) => return None,
        (_, Some(at)) => (at, at.saturating_add(default_ms), false),
        (MaintenanceStatus::InProgress, None) => {
            let start = if m.created_at < window.end {
                m.created_at
            } else {
                window.start
            };
            let end = m.created_at.saturating_add(default_ms).max(window.end);
            (start, end, false)
        }
        (MaintenanceStatus::Planned, None) => {
            (window.start, window.start.saturating_add(default_ms), true)
        }
    };
    let span = Span::try_new(start, end)?;
    Some(Interval {
        resource_id: canonical,
        source_id: m.id,
        span,
        kind: IntervalKind::Maintenance,
        is_late: false,
        label: m.label.clone(),
        floating,
    })
}

/// Bookings and maintenance are sourced natively; their event copies are dropped.
fn event_interval(canonical: Ulid, e: &PlanningEventRecord) -> Option<Interval> {
    let kind = PlanningEventKind::resolve(&e.kind).interval_kind()?;
    let Some(span) = Span::try_new(e.start, e.end) else {
        debug!("skipping planning event {} with empty span [{}, {})", e.id, e.start, e.end);
        return None;
    };
    Some(Interval {
        resource_id: canonical,
        source_id: e.id,
        span,
        kind,
        is_late: e.is_late,
        label: e.label.clone(),
        floating: false,
    })
}
