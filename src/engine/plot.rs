//! Composes projected trails and matched waypoints into SVG.

use std::collections::BTreeMap;

use crate::{core::waypoints::WaypointStore, trail::Trail, types::Waypoint};

use super::projector::{CanvasPoint, Projection};

/// Stroke colors assigned to trails in order, wrapping around.
pub const PALETTE: [&str; 6] = ["green", "red", "blue", "orange", "purple", "teal"];

/// Default matching radius in meters.
pub const DEFAULT_PROXIMITY_M: f64 = 150.0;

/// One rendered trail.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotPath {
    /// Source trail id.
    pub trail_id: String,
    /// Stroke color.
    pub color: &'static str,
    /// Projected, deduplicated points.
    pub points: Vec<CanvasPoint>,
}

/// A waypoint some reading passed close to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotMarker {
    /// Matched waypoint.
    pub waypoint: Waypoint,
    /// Projected waypoint position.
    pub at: CanvasPoint,
}

/// Renderable plot: paths first, then markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// One path per trail.
    pub paths: Vec<PlotPath>,
    /// One marker per distinct matched waypoint name.
    pub markers: Vec<PlotMarker>,
}

/// Canvas size and matching radius for plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotRenderer {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Matching radius in meters.
    pub proximity_m: f64,
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            proximity_m: DEFAULT_PROXIMITY_M,
        }
    }
}

impl PlotRenderer {
    /// Merges every trail's embedded waypoints into `store`; returns how many were new.
    pub fn merge_waypoints(&self, trails: &[Trail], store: &mut WaypointStore) -> usize {
        trails.iter().map(|t| store.update(t.waypoints())).sum()
    }

    /// Projects all trails onto one shared canvas and marks nearby waypoints.
    pub fn render(&self, trails: &[Trail], store: &WaypointStore) -> Plot {
        let mut plot = Plot {
            width: self.width,
            height: self.height,
            paths: Vec::with_capacity(trails.len()),
            markers: Vec::new(),
        };

        let tracks = trails.iter().map(Trail::readings);
        let Some(projection) = Projection::fit(tracks, self.width, self.height) else {
            return plot;
        };

        let mut matched: BTreeMap<&str, &Waypoint> = BTreeMap::new();
        for (i, trail) in trails.iter().enumerate() {
            plot.paths.push(PlotPath {
                trail_id: trail.id().to_string(),
                color: PALETTE[i % PALETTE.len()],
                points: projection.project_path(trail.readings()),
            });

            for r in trail.readings() {
                if let Some(wp) = store.find_closest(r.lat, r.lon, self.proximity_m) {
                    matched.entry(wp.name.as_str()).or_insert(wp);
                }
            }
        }

        plot.markers = matched
            .into_values()
            .map(|wp| PlotMarker {
                waypoint: wp.clone(),
                at: projection.project(wp.lat, wp.lon),
            })
            .collect();
        plot
    }
}

impl Plot {
    /// Standalone SVG element.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n",
            self.width, self.height
        );
        for path in &self.paths {
            let points = path
                .points
                .iter()
                .map(|p| format!("{} {}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(", ");
            svg.push_str(&format!(
                "<polyline points=\"{points}\" fill=\"transparent\" stroke=\"{}\"/>\n",
                path.color
            ));
        }
        for marker in &self.markers {
            let CanvasPoint { x, y } = marker.at;
            svg.push_str(&format!("<circle cx=\"{x}\" cy=\"{y}\" r=\"4\" fill=\"black\"/>\n"));
            svg.push_str(&format!(
                "<text x=\"{x}\" y=\"{y}\">{}</text>\n",
                escape_xml(&marker.waypoint.name)
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Minimal HTML document embedding the SVG.
    pub fn to_html(&self) -> String {
        format!("<html>\n<body>\n{}</body>\n</html>", self.to_svg())
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
