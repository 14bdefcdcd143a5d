use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

/// Which collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vehicles,
    Bookings,
    Maintenance,
    PlanningEvents,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Vehicles => "vehicles",
            SourceKind::Bookings => "bookings",
            SourceKind::Maintenance => "maintenance",
            SourceKind::PlanningEvents => "planning_events",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unavailable(String),
    Rejected(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(e) => write!(f, "source unavailable: {e}"),
            SourceError::Rejected(e) => write!(f, "source rejected request: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ── Collaborator contracts ───────────────────────────────

#[async_trait]
pub trait VehicleSource: Send + Sync {
    async fn vehicle(&self, id: Ulid) -> Result<Option<VehicleRecord>, SourceError>;

    async fn agency_vehicles(&self, agency_id: Ulid) -> Result<Vec<VehicleRecord>, SourceError>;
}

#[async_trait]
pub trait BookingSource: Send + Sync {
    /// Bookings of any of `vehicle_ids` overlapping `window`, any status.
    async fn bookings(&self, vehicle_ids: &[Ulid], window: Span) -> Result<Vec<BookingRecord>, SourceError>;
}

#[async_trait]
pub trait MaintenanceSource: Send + Sync {
    /// All maintenance records of `vehicle_ids`; anchoring rules need unscheduled ones too.
    async fn maintenances(&self, vehicle_ids: &[Ulid]) -> Result<Vec<MaintenanceRecord>, SourceError>;
}

#[async_trait]
pub trait PlanningEventSource: Send + Sync {
    async fn events(&self, vehicle_ids: &[Ulid], window: Span) -> Result<Vec<PlanningEventRecord>, SourceError>;

    async fn record(&self, event: PlanningEventRecord) -> Result<(), SourceError>;
}

/// Handles to every collaborator the engine reads from.
#[derive(Clone)]
pub struct Sources {
    pub vehicles: Arc<dyn VehicleSource>,
    pub bookings: Arc<dyn BookingSource>,
    pub maintenance: Arc<dyn MaintenanceSource>,
    pub events: Arc<dyn PlanningEventSource>,
}

impl Sources {
    /// All four collaborators served by one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: VehicleSource + BookingSource + MaintenanceSource + PlanningEventSource + 'static,
    {
        Self {
            vehicles: store.clone(),
            bookings: store.clone(),
            maintenance: store.clone(),
            events: store,
        }
    }
}

// ── In-memory store ──────────────────────────────────────

/// Serialized form of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub vehicles: Vec<VehicleRecord>,
    #[serde(default)]
    pub bookings: Vec<BookingRecord>,
    #[serde(default)]
    pub maintenances: Vec<MaintenanceRecord>,
    #[serde(default)]
    pub events: Vec<PlanningEventRecord>,
}

/// Store backing tests, benchmarks and the CLI. Per-vehicle lists live in
/// `DashMap`s so concurrent queries never contend on one lock.
pub struct InMemoryStore {
    vehicles: DashMap<Ulid, VehicleRecord>,
    /// Agency → vehicle ids in insertion order.
    agency_vehicles: DashMap<Ulid, Vec<Ulid>>,
    bookings: DashMap<Ulid, Vec<BookingRecord>>,
    maintenances: DashMap<Ulid, Vec<MaintenanceRecord>>,
    events: DashMap<Ulid, Vec<PlanningEventRecord>>,
    /// Events without a vehicle; kept so `record` never drops data.
    unassigned_events: DashMap<Ulid, PlanningEventRecord>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            vehicles: DashMap::new(),
            agency_vehicles: DashMap::new(),
            bookings: DashMap::new(),
            maintenances: DashMap::new(),
            events: DashMap::new(),
            unassigned_events: DashMap::new(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for v in snapshot.vehicles {
            store.insert_vehicle(v);
        }
        for b in snapshot.bookings {
            store.insert_booking(b);
        }
        for m in snapshot.maintenances {
            store.insert_maintenance(m);
        }
        for e in snapshot.events {
            store.insert_event(e);
        }
        store
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn insert_vehicle(&self, vehicle: VehicleRecord) {
        let id = vehicle.id;
        let agency_id = vehicle.agency_id;
        match self.vehicles.insert(id, vehicle) {
            Some(previous) if previous.agency_id == agency_id => return,
            Some(previous) => {
                if let Some(mut ids) = self.agency_vehicles.get_mut(&previous.agency_id) {
                    ids.retain(|v| *v != id);
                }
            }
            None => {}
        }
        self.agency_vehicles.entry(agency_id).or_default().push(id);
    }

    pub fn insert_booking(&self, booking: BookingRecord) {
        self.bookings.entry(booking.vehicle_id).or_default().push(booking);
    }

    /// Replace a booking's status in place; returns false if the booking is unknown.
    pub fn set_booking_status(&self, vehicle_id: &Ulid, booking_id: &Ulid, status: BookingStatus) -> bool {
        let Some(mut list) = self.bookings.get_mut(vehicle_id) else {
            return false;
        };
        match list.iter_mut().find(|b| b.id == *booking_id) {
            Some(booking) => {
                booking.status = status;
                true
            }
            None => false,
        }
    }

    pub fn insert_maintenance(&self, maintenance: MaintenanceRecord) {
        self.maintenances
            .entry(maintenance.vehicle_id)
            .or_default()
            .push(maintenance);
    }

    /// Replace a maintenance record's status in place; returns false if it is unknown.
    pub fn set_maintenance_status(
        &self,
        vehicle_id: &Ulid,
        maintenance_id: &Ulid,
        status: MaintenanceStatus,
    ) -> bool {
        let Some(mut list) = self.maintenances.get_mut(vehicle_id) else {
            return false;
        };
        match list.iter_mut().find(|m| m.id == *maintenance_id) {
            Some(maintenance) => {
                maintenance.status = status;
                true
            }
            None => false,
        }
    }

    pub fn insert_event(&self, event: PlanningEventRecord) {
        match event.vehicle_id {
            Some(vid) => self.events.entry(vid).or_default().push(event),
            None => {
                self.unassigned_events.insert(event.id, event);
            }
        }
    }

    /// Every planning event stored for one vehicle id, in insertion order.
    pub fn events_for(&self, vehicle_id: &Ulid) -> Vec<PlanningEventRecord> {
        self.events
            .get(vehicle_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            vehicles: self.vehicles.iter().map(|e| e.value().clone()).collect(),
            bookings: self.bookings.iter().flat_map(|e| e.value().clone()).collect(),
            maintenances: self.maintenances.iter().flat_map(|e| e.value().clone()).collect(),
            events: self
                .events
                .iter()
                .flat_map(|e| e.value().clone())
                .chain(self.unassigned_events.iter().map(|e| e.value().clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl VehicleSource for InMemoryStore {
    async fn vehicle(&self, id: Ulid) -> Result<Option<VehicleRecord>, SourceError> {
        Ok(self.vehicles.get(&id).map(|e| e.value().clone()))
    }

    async fn agency_vehicles(&self, agency_id: Ulid) -> Result<Vec<VehicleRecord>, SourceError> {
        let ids = self
            .agency_vehicles
            .get(&agency_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.vehicles.get(id).map(|e| e.value().clone()))
            .collect())
    }
}

#[async_trait]
impl BookingSource for InMemoryStore {
    async fn bookings(&self, vehicle_ids: &[Ulid], window: Span) -> Result<Vec<BookingRecord>, SourceError> {
        let mut out = Vec::new();
        for vid in vehicle_ids {
            if let Some(list) = self.bookings.get(vid) {
                out.extend(
                    list.iter()
                        .filter(|b| b.start < window.end && b.end > window.start)
                        .cloned(),
                );
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl MaintenanceSource for InMemoryStore {
    async fn maintenances(&self, vehicle_ids: &[Ulid]) -> Result<Vec<MaintenanceRecord>, SourceError> {
        let mut out = Vec::new();
        for vid in vehicle_ids {
            if let Some(list) = self.maintenances.get(vid) {
                out.extend(list.iter().cloned());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl PlanningEventSource for InMemoryStore {
    async fn events(&self, vehicle_ids: &[Ulid], window: Span) -> Result<Vec<PlanningEventRecord>, SourceError> {
        let mut out = Vec::new();
        for vid in vehicle_ids {
            if let Some(list) = self.events.get(vid) {
                out.extend(
                    list.iter()
                        .filter(|e| e.start < window.end && e.end > window.start)
                        .cloned(),
                );
            }
        }
        Ok(out)
    }

    async fn record(&self, event: PlanningEventRecord) -> Result<(), SourceError> {
        self.insert_event(event);
        Ok(())
    }
}
