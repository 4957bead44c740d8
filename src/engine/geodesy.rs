//! Great-circle distance on a spherical Earth.

/// Mean Earth radius in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_009.0;

/// Distance in meters between two lat/lon pairs given in degrees.
///
/// Uses the spherical law of cosines. Accurate enough for the short hops
/// between consecutive GPS fixes; it loses precision for tiny angles.
pub fn distance_between(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    if lat_a == lat_b && lon_a == lon_b {
        return 0.0;
    }

    let lat_a = lat_a.to_radians();
    let lat_b = lat_b.to_radians();
    let delta_lon = (lon_a.to_radians() - lon_b.to_radians()).abs();

    // Rounding can push the cosine just past 1 for identical points.
    let cos_angle = (lat_a.sin() * lat_b.sin() + lat_a.cos() * lat_b.cos() * delta_lon.cos())
        .clamp(-1.0, 1.0);
    EARTH_MEAN_RADIUS_M * cos_angle.acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_between(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 1_112.0, "got {d}");
    }

    #[test]
    fn same_point_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (60.0, 10.0), (-33.86, 151.21), (89.9, -179.9)] {
            assert_eq!(distance_between(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let ab = distance_between(60.0, 10.0, 60.001, 10.001);
        let ba = distance_between(60.001, 10.001, 60.0, 10.0);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 100.0 && ab < 150.0, "got {ab}");
    }
}
