use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{engine::geodesy::distance_between, types::Waypoint};

/// On-disk form of a user's waypoints: `{"waypoints": {name: Waypoint}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointSnapshot {
    pub waypoints: BTreeMap<String, Waypoint>,
}

#[derive(Debug, Default)]
pub struct WaypointStore {
    waypoints: HashMap<String, Waypoint>,
    dirty: bool,
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: WaypointSnapshot) -> Self {
        Self {
            waypoints: snapshot.waypoints.into_iter().collect(),
            dirty: false,
        }
    }

    pub fn export_snapshot(&self) -> WaypointSnapshot {
        WaypointSnapshot {
            waypoints: self
                .waypoints
                .iter()
                .map(|(name, wp)| (name.clone(), wp.clone()))
                .collect(),
        }
    }

    /// Inserts waypoints whose names are not yet known. Existing names keep
    /// their stored position. Returns the number inserted.
    pub fn update(&mut self, added: &[Waypoint]) -> usize {
        let mut inserted = 0;
        for wp in added {
            if !self.waypoints.contains_key(&wp.name) {
                self.waypoints.insert(wp.name.clone(), wp.clone());
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.dirty = true;
        }
        inserted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot to persist, or `None` when nothing changed since the last save.
    pub fn dirty_snapshot(&self) -> Option<WaypointSnapshot> {
        self.dirty.then(|| self.export_snapshot())
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn get(&self, name: &str) -> Option<&Waypoint> {
        self.waypoints.get(name)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Nearest waypoint strictly closer than `proximity_m` meters.
    pub fn find_closest(&self, lat: f64, lon: f64, proximity_m: f64) -> Option<&Waypoint> {
        let mut closest = None;
        let mut closest_d = f64::INFINITY;
        for wp in self.waypoints.values() {
            let d = distance_between(lat, lon, wp.lat, wp.lon);
            if d < proximity_m && d < closest_d {
                closest_d = d;
                closest = Some(wp);
            }
        }
        closest
    }
}
