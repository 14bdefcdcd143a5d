use std::future::Future;
use std::time::Instant;

use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{self, LATE_PREPARATIONS_TOTAL};
use crate::principal::Principal;
use crate::registry;
use crate::source::SourceKind;

use super::availability::{free_spans, is_available, next_free_instant};
use super::conflict::{conflict_result, detect_conflicts, validate_instant, validate_window};
use super::preparation::{preparation_event, preparation_window};
use super::{Engine, EngineError};

/// Run one engine operation, recording its outcome and latency.
async fn observed<T>(
    operation: &'static str,
    run: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let started = Instant::now();
    let result = run.await;
    observability::record_query(operation, started, &result);
    result
}

impl Engine {
    /// Conflict scan for a candidate booking window.
    pub async fn check_availability(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<ConflictResult, EngineError> {
        observed("check_availability", async {
            let span = validate_window(start, end)?;
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, span).await?;
            let result = conflict_result(&timeline, span);
            debug!(
                "availability {} [{start}, {end}): available={} conflicts={}",
                vehicle.canonical_id,
                result.available,
                result.conflicts.len()
            );
            Ok(result)
        })
        .await
    }

    /// Intervals overlapping `[start, end)`, ordered by start.
    pub async fn detect_conflicts(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<Interval>, EngineError> {
        observed("detect_conflicts", async {
            let span = validate_window(start, end)?;
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, span).await?;
            Ok(detect_conflicts(&timeline, &span))
        })
        .await
    }

    /// True iff [`Engine::detect_conflicts`] would return nothing for the window.
    pub async fn is_available(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<bool, EngineError> {
        observed("is_available", async {
            let span = validate_window(start, end)?;
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, span).await?;
            Ok(is_available(&timeline, &span))
        })
        .await
    }

    /// Earliest instant at or after `from` when the vehicle is not occupied.
    pub async fn next_availability(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        from: Ms,
    ) -> Result<Ms, EngineError> {
        observed("next_availability", async {
            validate_instant(from)?;
            let horizon = Span::new(from, from.saturating_add(self.config.next_availability_horizon_ms));
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, horizon).await?;
            let next = next_free_instant(&timeline, from);
            if next >= horizon.end {
                return Err(EngineError::LimitExceeded("no free instant within search horizon"));
            }
            Ok(next)
        })
        .await
    }

    /// Free sub-spans of the window, optionally only those at least `min_duration_ms` long.
    pub async fn free_slots(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
        min_duration_ms: Option<Ms>,
    ) -> Result<Vec<Span>, EngineError> {
        observed("free_slots", async {
            let span = validate_window(start, end)?;
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, span).await?;
            let mut free = free_spans(&timeline, &span);
            if let Some(min_dur) = min_duration_ms {
                free.retain(|s| s.duration_ms() >= min_dur);
            }
            Ok(free)
        })
        .await
    }

    /// Calendar entries for the window, in start order.
    pub async fn timeline(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<CalendarEntry>, EngineError> {
        observed("timeline", async {
            let span = validate_window(start, end)?;
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            let timeline = self.load_timeline(&vehicle, span).await?;
            Ok(timeline.intervals.iter().map(CalendarEntry::from).collect())
        })
        .await
    }

    /// Canonical ids of the agency's vehicles free for the whole window.
    /// Vehicles are checked concurrently; one failing vehicle fails the query.
    pub async fn available_vehicles(
        &self,
        principal: &Principal,
        agency_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<Ulid>, EngineError> {
        observed("available_vehicles", async {
            let span = validate_window(start, end)?;
            if !principal.can_access(&agency_id) {
                return Err(EngineError::AccessDenied(agency_id));
            }
            let fleet = self
                .fetch(
                    SourceKind::Vehicles,
                    self.sources.vehicles.agency_vehicles(agency_id),
                )
                .await?;
            if fleet.len() > MAX_AGENCY_VEHICLES {
                return Err(EngineError::LimitExceeded("too many vehicles in agency"));
            }
            let identities = registry::resolve_fleet(&fleet);
            let checks = identities.iter().map(|vehicle| async move {
                let timeline = self.load_timeline(vehicle, span).await?;
                Ok::<_, EngineError>(is_available(&timeline, &span).then_some(vehicle.canonical_id))
            });
            let free = futures::future::try_join_all(checks).await?;
            Ok(free.into_iter().flatten().collect())
        })
        .await
    }

    /// Register the mandatory turnaround after a checkout and persist it as a
    /// `PREPARATION_TIME` planning event carrying the lateness flag.
    pub async fn create_preparation_time(
        &self,
        principal: &Principal,
        booking_id: Ulid,
        vehicle_id: Ulid,
        agency_id: Ulid,
        checkout_at: Ms,
        prep_minutes: i64,
    ) -> Result<PreparationWindow, EngineError> {
        observed("create_preparation_time", async {
            validate_instant(checkout_at)?;
            if prep_minutes > MAX_PREP_MINUTES {
                return Err(EngineError::LimitExceeded("preparation time too long"));
            }
            if !principal.can_access(&agency_id) {
                return Err(EngineError::AccessDenied(agency_id));
            }
            let vehicle = self.resolve_vehicle(principal, vehicle_id).await?;
            if vehicle.agency_id != agency_id {
                return Err(EngineError::AgencyMismatch {
                    vehicle_id,
                    agency_id,
                });
            }

            // Zero-length windows still need a non-empty lookup span.
            let end = checkout_at + prep_minutes.max(0) * MINUTE_MS;
            let lookup = Span::new(checkout_at, end.max(checkout_at + 1));
            let timeline = self.load_timeline(&vehicle, lookup).await?;
            let window = preparation_window(&timeline, booking_id, checkout_at, prep_minutes);

            let event = preparation_event(&window, agency_id);
            self.fetch(SourceKind::PlanningEvents, self.sources.events.record(event))
                .await?;

            if window.is_late {
                metrics::counter!(LATE_PREPARATIONS_TOTAL).increment(1);
                info!(
                    "late preparation for booking {booking_id} on vehicle {}: [{}, {})",
                    window.vehicle_id, window.start, window.end
                );
            }
            Ok(window)
        })
        .await
    }

    /// Turn a booking write refused by the persistence layer into a
    /// conflict computed on a fresh snapshot, so callers handle it exactly
    /// like a rejection from [`Engine::check_availability`].
    ///
    /// If the fresh snapshot does not show the competing writer yet, the
    /// returned conflict list is empty and the caller should retry.
    pub async fn surface_insert_rejection(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> EngineError {
        match self.check_availability(principal, vehicle_id, start, end).await {
            Ok(result) => EngineError::RaceLossOnInsert(result),
            Err(e) => e,
        }
    }
}
