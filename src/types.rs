//! Shared primitive IDs, position fixes and device metadata.

use serde::{
    Deserialize, Serialize,
    ser::{SerializeSeq, Serializer},
};

/// Queue sequence key.
pub type SeqKey = u64;
/// Millisecond timestamp since the Unix epoch.
pub type TimestampMs = f64;

/// One position fix.
///
/// Serializes as the wire tuple `[lat, lon]` or `[lat, lon, elapsed_ms]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Milliseconds since the trail started (v2 only).
    pub elapsed_ms: Option<f64>,
}

impl Reading {
    /// Bare v1 reading.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elapsed_ms: None,
        }
    }

    /// Timestamped v2 reading.
    pub fn timed(lat: f64, lon: f64, elapsed_ms: f64) -> Self {
        Self {
            lat,
            lon,
            elapsed_ms: Some(elapsed_ms),
        }
    }

    /// True when both coordinates are bit-identical to `other`.
    pub fn same_position(&self, other: &Reading) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.elapsed_ms.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.lat)?;
        seq.serialize_element(&self.lon)?;
        if let Some(elapsed) = self.elapsed_ms {
            seq.serialize_element(&elapsed)?;
        }
        seq.end()
    }
}

/// Named point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Identity key within a user's waypoint store.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Recording device description carried by v2 trails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfo {
    /// User-chosen device name.
    pub name: String,
    /// Hardware model.
    pub hardware: String,
    /// Operating system.
    pub os: String,
    /// User agent of the recording client.
    pub ua: String,
}

/// Activity bucket for v2 trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// Cycling.
    Bike,
    /// Walking.
    Walk,
    /// Hiking.
    Hike,
    /// Anything else.
    #[default]
    Other,
}

impl ActivityType {
    /// Parses the wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "bike" => Some(Self::Bike),
            "walk" => Some(Self::Walk),
            "hike" => Some(Self::Hike),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bike => "bike",
            Self::Walk => "walk",
            Self::Hike => "hike",
            Self::Other => "other",
        }
    }
}
