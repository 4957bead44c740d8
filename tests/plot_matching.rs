use trails::{
    core::waypoints::{WaypointSnapshot, WaypointStore},
    engine::{
        geodesy::distance_between,
        plot::{DEFAULT_PROXIMITY_M, PALETTE, PlotRenderer},
        projector::CanvasPoint,
    },
    trail::{Trail, TrailV2},
    types::{ActivityType, DeviceInfo, Reading, Waypoint},
};

fn waypoint(name: &str, lat: f64, lon: f64) -> Waypoint {
    Waypoint {
        name: name.to_string(),
        lat,
        lon,
    }
}

fn trail(uuid: &str, points: &[(f64, f64)], waypoints: Vec<Waypoint>) -> Trail {
    Trail::V2(TrailV2 {
        uuid: uuid.to_string(),
        device: DeviceInfo::default(),
        start: 0.0,
        end: 1000.0,
        distance: 0.0,
        activity: ActivityType::Walk,
        waypoints,
        readings: points
            .iter()
            .enumerate()
            .map(|(i, (lat, lon))| Reading::timed(*lat, *lon, i as f64 * 1000.0))
            .collect(),
    })
}

#[test]
fn reading_within_proximity_matches() {
    let mut store = WaypointStore::new();
    store.update(&[waypoint("Hut", 10.0, 20.0)]);

    // ~100 m north
    let near = 10.0 + 0.000_899;
    assert!((distance_between(10.0, 20.0, near, 20.0) - 100.0).abs() < 1.0);
    let hit = store.find_closest(near, 20.0, DEFAULT_PROXIMITY_M).expect("match");
    assert_eq!(hit.name, "Hut");

    // ~500 m north
    let far = 10.0 + 0.004_5;
    assert!(store.find_closest(far, 20.0, DEFAULT_PROXIMITY_M).is_none());
}

#[test]
fn closest_of_several_waypoints_wins() {
    let mut store = WaypointStore::new();
    store.update(&[waypoint("North", 10.001, 20.0), waypoint("South", 9.9995, 20.0)]);
    let hit = store.find_closest(10.0, 20.0, DEFAULT_PROXIMITY_M).expect("match");
    assert_eq!(hit.name, "South");
}

#[test]
fn update_keeps_first_position_and_tracks_dirtiness() {
    let mut store = WaypointStore::new();
    assert!(!store.is_dirty());

    assert_eq!(store.update(&[waypoint("Hut", 10.0, 20.0)]), 1);
    assert!(store.is_dirty());
    assert_eq!(store.dirty_snapshot().map(|s| s.waypoints.len()), Some(1));
    store.mark_clean();
    assert!(store.dirty_snapshot().is_none());

    assert_eq!(store.update(&[waypoint("Hut", 11.0, 21.0)]), 0);
    assert!(!store.is_dirty());
    assert_eq!(store.get("Hut").map(|w| w.lat), Some(10.0));
}

#[test]
fn snapshot_restores_store() {
    let mut store = WaypointStore::new();
    store.update(&[waypoint("Hut", 10.0, 20.0), waypoint("Pier", 11.0, 21.0)]);
    let json = serde_json::to_string(&store.export_snapshot()).expect("encode");
    assert!(json.starts_with(r#"{"waypoints":{"Hut":"#));

    let snapshot: WaypointSnapshot = serde_json::from_str(&json).expect("decode");
    let restored = WaypointStore::from_snapshot(snapshot);
    assert_eq!(restored.len(), 2);
    assert!(!restored.is_dirty());
    assert_eq!(restored.get("Pier"), Some(&waypoint("Pier", 11.0, 21.0)));
}

#[test]
fn render_shares_one_projection_and_cycles_colors() {
    let trails = vec![
        trail("000000000000000A", &[(60.0, 10.0), (60.001, 10.001)], vec![]),
        trail("000000000000000B", &[(60.0005, 10.0005), (60.0005, 10.0005)], vec![]),
    ];
    let plot = PlotRenderer::default().render(&trails, &WaypointStore::new());

    assert_eq!(plot.paths.len(), 2);
    assert_eq!(plot.paths[0].color, PALETTE[0]);
    assert_eq!(plot.paths[1].color, PALETTE[1]);
    assert_eq!(plot.paths[0].points, vec![
        CanvasPoint { x: 0, y: 1000 },
        CanvasPoint { x: 500, y: 0 },
    ]);
    // repeated reading collapses to a single canvas point
    assert_eq!(plot.paths[1].points, vec![CanvasPoint { x: 250, y: 500 }]);
    assert!(plot.markers.is_empty());
}

#[test]
fn merged_waypoints_become_markers_once() {
    let trails = vec![
        trail(
            "000000000000000A",
            &[(10.0, 20.0), (10.0005, 20.0), (10.01, 20.01)],
            vec![waypoint("Hut", 10.0002, 20.0)],
        ),
        trail("000000000000000B", &[(10.0001, 20.0)], vec![waypoint("Hut", 50.0, 50.0)]),
    ];
    let renderer = PlotRenderer::default();
    let mut store = WaypointStore::new();

    assert_eq!(renderer.merge_waypoints(&trails, &mut store), 1);
    let plot = renderer.render(&trails, &store);

    assert_eq!(plot.markers.len(), 1);
    assert_eq!(plot.markers[0].waypoint.name, "Hut");
    assert_eq!(plot.markers[0].waypoint.lat, 10.0002);

    let svg = plot.to_svg();
    assert_eq!(svg.matches("<polyline").count(), 2);
    assert_eq!(svg.matches("<circle").count(), 1);
    assert!(svg.contains(">Hut</text>"));
}

#[test]
fn empty_selection_renders_blank_canvas() {
    let plot = PlotRenderer::default().render(&[], &WaypointStore::new());
    assert!(plot.paths.is_empty());
    let html = plot.to_html();
    assert!(html.starts_with("<html>"));
    assert!(html.contains("<svg"));
    assert!(!html.contains("<polyline"));
}
