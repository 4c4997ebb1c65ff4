use haversine::{Location as HaversineLocation, Units, distance};

/// Great-circle distance in meters on a 6,371 km sphere.
pub fn distance_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let from = HaversineLocation { latitude: from.0, longitude: from.1 };
    let to = HaversineLocation { latitude: to.0, longitude: to.1 };
    distance(from, to, Units::Kilometers) * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // One degree along a meridian.
    const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

    #[test]
    fn same_point_is_zero() {
        assert_eq!(distance_meters((51.5074, -0.1278), (51.5074, -0.1278)), 0.0);
    }

    #[test]
    fn meridian_distance_matches_arc_length() {
        let d = distance_meters((10.0, 20.0), (11.0, 20.0));
        assert!((d - METERS_PER_DEGREE).abs() < 1.0, "got {d}");
    }

    #[test]
    fn london_to_paris() {
        let d = distance_meters((51.5074, -0.1278), (48.8566, 2.3522));
        assert!((d - 343_500.0).abs() < 2_000.0, "got {d}");
    }
}
