//! Vehicle identity canonicalization.
//!
//! Duplicate vehicle records (same agency, same plate once normalized) collapse
//! into one scheduling identity. The pipeline is split in three stages so each
//! can be tested on its own: [`normalize_plate`] → [`group`] → [`pick_canonical`].

use std::collections::HashMap;

use ulid::Ulid;

use crate::model::{ResolvedVehicle, VehicleRecord, VehicleResource};

/// Strip spaces and hyphens, uppercase the rest.
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

impl From<&VehicleRecord> for VehicleResource {
    fn from(r: &VehicleRecord) -> Self {
        Self {
            id: r.id,
            agency_id: r.agency_id,
            normalized_plate: normalize_plate(&r.registration_number),
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Plate { agency_id: Ulid, plate: String },
    /// Plateless records never collapse.
    Own(Ulid),
}

fn group_key(v: &VehicleResource) -> GroupKey {
    if v.normalized_plate.is_empty() {
        GroupKey::Own(v.id)
    } else {
        GroupKey::Plate {
            agency_id: v.agency_id,
            plate: v.normalized_plate.clone(),
        }
    }
}

/// Group records by `(agency, normalized plate)`. Groups come out in order of
/// first appearance and members keep input order.
pub fn group(vehicles: &[VehicleResource]) -> Vec<Vec<&VehicleResource>> {
    let mut slot_of: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<&VehicleResource>> = Vec::new();
    for v in vehicles {
        let slot = *slot_of.entry(group_key(v)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(v);
    }
    groups
}

/// Member with the greatest `updated_at`; ties keep the earliest in input order.
pub fn pick_canonical(members: &[&VehicleResource]) -> Option<Ulid> {
    let mut best: Option<&VehicleResource> = None;
    for &m in members {
        match best {
            Some(b) if m.updated_at <= b.updated_at => {}
            _ => best = Some(m),
        }
    }
    best.map(|b| b.id)
}

/// Map every record id (canonical ones included) to its canonical id.
pub fn canonicalize(vehicles: &[VehicleResource]) -> HashMap<Ulid, Ulid> {
    let mut map = HashMap::with_capacity(vehicles.len());
    for members in group(vehicles) {
        let Some(canonical) = pick_canonical(&members) else { continue };
        for m in members {
            map.insert(m.id, canonical);
        }
    }
    map
}

/// Resolve a whole fleet into scheduling identities, in first-appearance order.
pub fn resolve_fleet(records: &[VehicleRecord]) -> Vec<ResolvedVehicle> {
    let resources: Vec<VehicleResource> = records.iter().map(VehicleResource::from).collect();
    group(&resources)
        .into_iter()
        .filter_map(|members| {
            let canonical_id = pick_canonical(&members)?;
            Some(ResolvedVehicle {
                canonical_id,
                agency_id: members[0].agency_id,
                member_ids: members.iter().map(|m| m.id).collect(),
            })
        })
        .collect()
}
