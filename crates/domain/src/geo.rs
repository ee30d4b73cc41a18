//! Distance primitives shared by the geo index's `search_by_radius` and the
//! trip & fare engine's per-trip distance computation (§4.2, §4.4) — one
//! haversine routine backs both, per DESIGN.md.

use geo::{HaversineDistance, Point};

use crate::models::ride::GeoPoint;

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let p1 = Point::new(a.lng, a.lat);
    let p2 = Point::new(b.lng, b.lat);
    p1.haversine_distance(&p2) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Bengaluru -> Chennai, roughly 290-300 km apart.
        let blr = GeoPoint { lat: 12.9716, lng: 77.5946 };
        let chennai = GeoPoint { lat: 13.0827, lng: 80.2707 };
        let km = haversine_km(blr, chennai);
        assert!((280.0..=300.0).contains(&km), "got {km}");
    }

    #[test]
    fn test_haversine_zero_distance() {
        let p = GeoPoint { lat: 1.0, lng: 2.0 };
        assert!(haversine_km(p, p) < 1e-9);
    }
}
