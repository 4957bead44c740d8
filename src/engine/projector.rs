use crate::types::Reading;

use super::geodesy::distance_between;

/// Extent of a set of readings in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southernmost latitude.
    pub lat_min: f64,
    /// Northernmost latitude.
    pub lat_max: f64,
    /// Westernmost longitude.
    pub lon_min: f64,
    /// Easternmost longitude.
    pub lon_max: f64,
}

impl BoundingBox {
    /// Smallest box covering every reading, or `None` when there are none.
    pub fn covering<'a>(readings: impl IntoIterator<Item = &'a Reading>) -> Option<Self> {
        readings.into_iter().fold(None, |acc, r| {
            Some(match acc {
                None => Self {
                    lat_min: r.lat,
                    lat_max: r.lat,
                    lon_min: r.lon,
                    lon_max: r.lon,
                },
                Some(b) => Self {
                    lat_min: b.lat_min.min(r.lat),
                    lat_max: b.lat_max.max(r.lat),
                    lon_min: b.lon_min.min(r.lon),
                    lon_max: b.lon_max.max(r.lon),
                },
            })
        })
    }

    /// Latitude span in degrees.
    pub fn lat_range(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Longitude span in degrees.
    pub fn lon_range(&self) -> f64 {
        self.lon_max - self.lon_min
    }
}

/// Integer canvas coordinate, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasPoint {
    /// Horizontal offset, east is positive.
    pub x: i64,
    /// Vertical offset, south is positive.
    pub y: i64,
}

/// Shared mapping from lat/lon to a `width x height` canvas.
///
/// Longitude is scaled by the ground length of one degree at the box's
/// southern edge relative to one degree of latitude, so shapes keep their
/// proportions near that latitude. Trails crossing the antimeridian or a pole
/// are not handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    bounds: BoundingBox,
    width: u32,
    height: u32,
    scale_lat: f64,
    scale_lon: f64,
}

impl Projection {
    /// Fits a projection over every reading of every track.
    pub fn fit<'a, I>(tracks: I, width: u32, height: u32) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [Reading]>,
    {
        let bounds = BoundingBox::covering(tracks.into_iter().flatten())?;
        Some(Self::with_bounds(bounds, width, height))
    }

    /// Builds a projection for a known bounding box.
    pub fn with_bounds(bounds: BoundingBox, width: u32, height: u32) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        let scale_lat = (w / h).min(1.0);
        let mut scale_lon = (h / w).min(1.0);

        let unit_y = distance_between(0.0, 0.0, 1.0, 0.0);
        let lon_floor = bounds.lon_min.floor();
        let unit_x = distance_between(bounds.lat_min, lon_floor, bounds.lat_min, lon_floor + 1.0);
        scale_lon *= unit_x / unit_y;

        Self {
            bounds,
            width,
            height,
            scale_lat,
            scale_lon,
        }
    }

    /// Bounding box the projection was fitted to.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// `(scale_lat, scale_lon)` after aspect and latitude correction.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_lat, self.scale_lon)
    }

    /// Projects one position; north is up.
    pub fn project(&self, lat: f64, lon: f64) -> CanvasPoint {
        let fx = fraction(lon, self.bounds.lon_min, self.bounds.lon_range());
        let fy = fraction(lat, self.bounds.lat_min, self.bounds.lat_range());
        let x = (fx * f64::from(self.width) * self.scale_lon).round() as i64;
        let y = i64::from(self.height)
            - (fy * f64::from(self.height) * self.scale_lat).round() as i64;
        CanvasPoint { x, y }
    }

    /// Projects a track, collapsing consecutive identical canvas points.
    pub fn project_path(&self, readings: &[Reading]) -> Vec<CanvasPoint> {
        let mut out: Vec<CanvasPoint> = Vec::with_capacity(readings.len());
        for r in readings {
            let p = self.project(r.lat, r.lon);
            if out.last() != Some(&p) {
                out.push(p);
            }
        }
        out
    }
}

// Degenerate axis (all readings share the coordinate) maps to offset 0.
fn fraction(v: f64, min: f64, range: f64) -> f64 {
    if range > 0.0 { (v - min) / range } else { 0.0 }
}
