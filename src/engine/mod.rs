mod availability;
mod conflict;
mod error;
mod index;
mod preparation;
mod queries;

pub use availability::{free_spans, is_available, next_free_instant};
pub use conflict::{conflict_result, detect_conflicts};
pub use error::EngineError;
pub use index::{build_index, SourceSnapshot};
pub use preparation::{preparation_event, preparation_window};

use std::future::Future;
use std::time::Instant;

use tracing::warn;
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::model::*;
use crate::principal::Principal;
use crate::registry;
use crate::source::{SourceError, SourceKind, Sources};

/// Stateless scheduling engine. Every query rebuilds its timeline from fresh
/// source snapshots; nothing is cached between calls, so one `Engine` can be
/// shared across tasks behind an `Arc`.
pub struct Engine {
    sources: Sources,
    config: EngineConfig,
}

impl Engine {
    pub fn new(sources: Sources, config: EngineConfig) -> Self {
        Self { sources, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Await one source call under the configured timeout. Failure of any
    /// kind fails the query; there is no degraded answer.
    async fn fetch<T>(
        &self,
        source: SourceKind,
        call: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, EngineError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.config.fetch_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(EngineError::upstream(source, e)),
            Err(_) => Err(EngineError::Upstream {
                source,
                reason: format!("timed out after {:?}", self.config.fetch_timeout),
            }),
        };
        crate::observability::record_fetch(source, started, result.is_ok());
        if let Err(e) = &result {
            warn!("{e}");
        }
        result
    }

    /// Vehicle id → canonical identity, enforcing the principal's agency scope.
    pub(super) async fn resolve_vehicle(
        &self,
        principal: &Principal,
        vehicle_id: Ulid,
    ) -> Result<ResolvedVehicle, EngineError> {
        let record = self
            .fetch(SourceKind::Vehicles, self.sources.vehicles.vehicle(vehicle_id))
            .await?
            .ok_or(EngineError::UnknownResource(vehicle_id))?;
        if !principal.can_access(&record.agency_id) {
            return Err(EngineError::AccessDenied(vehicle_id));
        }
        let mut fleet = self
            .fetch(
                SourceKind::Vehicles,
                self.sources.vehicles.agency_vehicles(record.agency_id),
            )
            .await?;
        if !fleet.iter().any(|v| v.id == vehicle_id) {
            fleet.push(record);
        }
        registry::resolve_fleet(&fleet)
            .into_iter()
            .find(|v| v.member_ids.contains(&vehicle_id))
            .ok_or(EngineError::UnknownResource(vehicle_id))
    }

    /// Fetch the three interval sources concurrently and index them.
    pub(super) async fn load_timeline(
        &self,
        vehicle: &ResolvedVehicle,
        window: Span,
    ) -> Result<Timeline, EngineError> {
        let ids = vehicle.member_ids.as_slice();
        let (bookings, maintenances, events) = futures::try_join!(
            self.fetch(SourceKind::Bookings, self.sources.bookings.bookings(ids, window)),
            self.fetch(SourceKind::Maintenance, self.sources.maintenance.maintenances(ids)),
            self.fetch(SourceKind::PlanningEvents, self.sources.events.events(ids, window)),
        )?;
        let snapshot = SourceSnapshot {
            bookings,
            maintenances,
            events,
        };
        Ok(build_index(
            vehicle,
            window,
            &snapshot,
            self.config.default_maintenance_duration_ms,
        ))
    }
}
