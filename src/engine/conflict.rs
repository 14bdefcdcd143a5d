use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_instant(t: Ms) -> Result<(), EngineError> {
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&t) {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

/// Reject empty/inverted windows before any lookup, then range-check.
pub(crate) fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    let span = Span::try_new(start, end).ok_or(EngineError::InvalidInterval { start, end })?;
    validate_instant(span.start)?;
    validate_instant(span.end)?;
    if span.duration_ms() > MAX_QUERY_WINDOW_MS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(span)
}

/// Every interval of the timeline overlapping `span`, ordered by start.
pub fn detect_conflicts(timeline: &Timeline, span: &Span) -> Vec<Interval> {
    timeline.overlapping(span).cloned().collect()
}

/// Package a conflict scan as the result handed back to callers.
pub fn conflict_result(timeline: &Timeline, span: Span) -> ConflictResult {
    let conflicts = detect_conflicts(timeline, &span);
    ConflictResult {
        requested: requested_interval(timeline.vehicle_id, span),
        available: conflicts.is_empty(),
        conflicts,
    }
}

/// The candidate booking itself, expressed as an interval.
fn requested_interval(vehicle_id: ulid::Ulid, span: Span) -> Interval {
    Interval {
        resource_id: vehicle_id,
        source_id: ulid::Ulid::nil(),
        span,
        kind: IntervalKind::Booking,
        is_late: false,
        label: None,
        floating: false,
    }
}
