use crate::model::*;

use super::conflict::detect_conflicts;

// ── Availability over one timeline ────────────────────────────────

/// Free iff nothing on the timeline overlaps `span`.
pub fn is_available(timeline: &Timeline, span: &Span) -> bool {
    detect_conflicts(timeline, span).is_empty()
}

/// Earliest instant `>= from` not covered by any concrete interval.
///
/// Each step jumps past the end of the interval covering the candidate, so the
/// loop runs at most once per interval. Floating maintenance has no fixed
/// position and is skipped.
pub fn next_free_instant(timeline: &Timeline, from: Ms) -> Ms {
    let mut candidate = from;
    for _ in 0..=timeline.intervals.len() {
        let covering = timeline
            .intervals
            .iter()
            .filter(|i| !i.floating)
            .find(|i| i.span.contains_instant(candidate));
        match covering {
            Some(interval) => candidate = interval.span.end,
            None => break,
        }
    }
    candidate
}

/// Free sub-spans of `window`, after removing every occupied interval.
///
/// One sweep over the start-ordered timeline: `cursor` is the earliest instant
/// not yet known to be occupied, and every gap before the next interval's
/// start is free.
pub fn free_spans(timeline: &Timeline, window: &Span) -> Vec<Span> {
    let mut free = Vec::new();
    let mut cursor = window.start;
    for interval in timeline.overlapping(window) {
        if interval.span.start > cursor {
            free.push(Span::new(cursor, interval.span.start));
        }
        cursor = cursor.max(interval.span.end);
        if cursor >= window.end {
            return free;
        }
    }
    free.push(Span::new(cursor, window.end));
    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    const H: Ms = HOUR_MS;

    fn interval(start: Ms, end: Ms) -> Interval {
        Interval {
            resource_id: Ulid::nil(),
            source_id: Ulid::new(),
            span: Span::new(start, end),
            kind: IntervalKind::Booking,
            is_late: false,
            label: None,
            floating: false,
        }
    }

    fn floating(start: Ms, end: Ms) -> Interval {
        Interval {
            kind: IntervalKind::Maintenance,
            floating: true,
            ..interval(start, end)
        }
    }

    fn timeline(intervals: Vec<Interval>) -> Timeline {
        Timeline::new(Ulid::nil(), Span::new(0, 1000 * H), intervals)
    }

    // ── next_free_instant ─────────────────────────────────

    #[test]
    fn next_free_empty_timeline_returns_from() {
        assert_eq!(next_free_instant(&timeline(vec![]), 42), 42);
    }

    #[test]
    fn next_free_not_covered_returns_from() {
        let tl = timeline(vec![interval(10 * H, 12 * H)]);
        assert_eq!(next_free_instant(&tl, 9 * H), 9 * H);
        assert_eq!(next_free_instant(&tl, 12 * H), 12 * H); // end is exclusive
    }

    #[test]
    fn next_free_chains_through_back_to_back_and_overlapping() {
        let tl = timeline(vec![
            interval(10 * H, 12 * H),
            interval(12 * H, 14 * H),
            interval(13 * H, 16 * H),
            interval(20 * H, 21 * H),
        ]);
        assert_eq!(next_free_instant(&tl, 11 * H), 16 * H);
        assert_eq!(next_free_instant(&tl, 10 * H), 16 * H);
    }

    #[test]
    fn next_free_handles_nested_interval_sorted_after_long_one() {
        let tl = timeline(vec![interval(0, 10 * H), interval(2 * H, 3 * H)]);
        assert_eq!(next_free_instant(&tl, 2 * H), 10 * H);
    }

    #[test]
    fn next_free_is_fixed_point() {
        let tl = timeline(vec![
            interval(H, 3 * H),
            interval(3 * H, 5 * H),
            interval(4 * H, 8 * H),
            interval(9 * H, 10 * H),
        ]);
        for from in (0..12).map(|h| h * H + 7) {
            let first = next_free_instant(&tl, from);
            assert!(first >= from);
            assert_eq!(next_free_instant(&tl, first), first);
        }
    }

    #[test]
    fn next_free_ignores_floating_maintenance() {
        let tl = timeline(vec![floating(0, 4 * H)]);
        assert_eq!(next_free_instant(&tl, H), H);
    }

    // ── is_available ──────────────────────────────────────

    #[test]
    fn availability_matches_conflicts() {
        let tl = timeline(vec![interval(10 * H, 15 * H)]);
        for (s, e) in [(0, 10 * H), (9 * H, 11 * H), (15 * H, 16 * H), (12 * H, 13 * H)] {
            let span = Span::new(s, e);
            assert_eq!(is_available(&tl, &span), detect_conflicts(&tl, &span).is_empty());
        }
    }

    // ── free_spans ────────────────────────────────────────

    #[test]
    fn free_spans_whole_window_when_empty() {
        let w = Span::new(0, 10 * H);
        assert_eq!(free_spans(&timeline(vec![]), &w), vec![w]);
    }

    #[test]
    fn free_spans_punches_merged_occupancy() {
        let tl = timeline(vec![
            interval(0, 2 * H),
            interval(4 * H, 6 * H),
            interval(5 * H, 7 * H),
            interval(11 * H, 12 * H),
        ]);
        let free = free_spans(&tl, &Span::new(H, 10 * H));
        assert_eq!(free, vec![Span::new(2 * H, 4 * H), Span::new(7 * H, 10 * H)]);
    }

    #[test]
    fn free_spans_nested_interval_does_not_reopen_gap() {
        let tl = timeline(vec![interval(H, 8 * H), interval(2 * H, 3 * H)]);
        let free = free_spans(&tl, &Span::new(0, 10 * H));
        assert_eq!(free, vec![Span::new(0, H), Span::new(8 * H, 10 * H)]);
    }

    #[test]
    fn free_spans_back_to_back_leave_no_sliver() {
        let tl = timeline(vec![interval(H, 2 * H), interval(2 * H, 3 * H)]);
        let free = free_spans(&tl, &Span::new(H, 4 * H));
        assert_eq!(free, vec![Span::new(3 * H, 4 * H)]);
    }

    #[test]
    fn free_spans_empty_when_window_fully_covered() {
        let tl = timeline(vec![interval(0, 5 * H), interval(4 * H, 20 * H)]);
        assert!(free_spans(&tl, &Span::new(H, 10 * H)).is_empty());
    }
}
