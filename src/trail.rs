//! Versioned trail records and their wire encoding.

use serde::Serialize;

use crate::types::{ActivityType, DeviceInfo, Reading, TimestampMs, Waypoint};

/// Wire version of [`TrailV1`].
pub const TRAIL_V1: u64 = 1;
/// Wire version of [`TrailV2`].
pub const TRAIL_V2: u64 = 2;

/// Legacy trail: free-form hex id, device name only, untimed readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailV1 {
    /// Hex identifier of any length.
    pub id: String,
    /// Device name.
    pub device: String,
    /// Start time in ms.
    pub start: TimestampMs,
    /// End time in ms.
    pub end: TimestampMs,
    /// Accumulated distance in meters.
    pub distance: f64,
    /// Embedded waypoints; absent on the wire when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Waypoint>,
    /// Position fixes.
    pub readings: Vec<Reading>,
}

/// Current trail format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailV2 {
    /// 16 uppercase hex digits.
    pub uuid: String,
    /// Recording device.
    pub device: DeviceInfo,
    /// Start time in ms.
    pub start: TimestampMs,
    /// End time in ms.
    pub end: TimestampMs,
    /// Accumulated distance in meters.
    pub distance: f64,
    /// Activity bucket.
    #[serde(rename = "type")]
    pub activity: ActivityType,
    /// Embedded waypoints.
    pub waypoints: Vec<Waypoint>,
    /// Timed position fixes.
    pub readings: Vec<Reading>,
}

/// A validated trail of either wire version.
#[derive(Debug, Clone, PartialEq)]
pub enum Trail {
    /// Version 1 record.
    V1(TrailV1),
    /// Version 2 record.
    V2(TrailV2),
}

#[derive(Serialize)]
struct Versioned<'a, T: Serialize> {
    version: u64,
    #[serde(flatten)]
    trail: &'a T,
}

impl Trail {
    /// Wire version number.
    pub fn version(&self) -> u64 {
        match self {
            Trail::V1(_) => TRAIL_V1,
            Trail::V2(_) => TRAIL_V2,
        }
    }

    /// The record's identifier (`id` for v1, `uuid` for v2).
    pub fn id(&self) -> &str {
        match self {
            Trail::V1(t) => &t.id,
            Trail::V2(t) => &t.uuid,
        }
    }

    /// Position fixes in recording order.
    pub fn readings(&self) -> &[Reading] {
        match self {
            Trail::V1(t) => &t.readings,
            Trail::V2(t) => &t.readings,
        }
    }

    /// Embedded waypoints.
    pub fn waypoints(&self) -> &[Waypoint] {
        match self {
            Trail::V1(t) => &t.waypoints,
            Trail::V2(t) => &t.waypoints,
        }
    }

    /// Accumulated distance in meters.
    pub fn distance(&self) -> f64 {
        match self {
            Trail::V1(t) => t.distance,
            Trail::V2(t) => t.distance,
        }
    }

    /// Identifier normalized to the 16-digit form used in stored file names.
    ///
    /// v2 uuids are already in that form. v1 ids are uppercased and either
    /// left-padded with `0` or cut down to their last 16 digits.
    pub fn storage_id(&self) -> String {
        let id = self.id().to_ascii_uppercase();
        if id.len() >= 16 {
            id[id.len() - 16..].to_string()
        } else {
            format!("{id:0>16}")
        }
    }

    /// JSON body the server answers a successful upload with.
    pub fn ack_body(&self) -> serde_json::Value {
        match self {
            Trail::V1(t) => serde_json::json!({ "id": t.id }),
            Trail::V2(t) => serde_json::json!({ "uuid": t.uuid }),
        }
    }

    /// Encodes the record in wire format, including its `version` field.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Trail::V1(trail) => serde_json::to_string(&Versioned {
                version: TRAIL_V1,
                trail,
            }),
            Trail::V2(trail) => serde_json::to_string(&Versioned {
                version: TRAIL_V2,
                trail,
            }),
        }
    }
}

impl From<TrailV1> for Trail {
    fn from(value: TrailV1) -> Self {
        Trail::V1(value)
    }
}

impl From<TrailV2> for Trail {
    fn from(value: TrailV2) -> Self {
        Trail::V2(value)
    }
}
