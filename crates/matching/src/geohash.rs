//! A small self-contained geohash-prefix encoder for surge cells (§4.5).
//!
//! No crate in the retrieval pack provides geohash encoding, so this is
//! written directly rather than invented as a fake dependency — standard
//! base32 geohash, interleaving longitude/latitude bits, truncated to a
//! configurable prefix length (default 5, ~5 km cells per §4.5).

use domain::models::GeoPoint;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode `point` to a geohash string truncated to `length` characters.
pub fn encode(point: GeoPoint, length: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let mut is_even = true;
    let mut bit = 0u8;
    let mut ch = 0u8;
    let mut out = String::with_capacity(length);

    while out.len() < length {
        if is_even {
            let mid = (lng_range.0 + lng_range.1) / 2.0;
            if point.lng >= mid {
                ch |= 1 << (4 - bit);
                lng_range.0 = mid;
            } else {
                lng_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if point.lat >= mid {
                ch |= 1 << (4 - bit);
                lat_range.0 = mid;
            } else {
                lat_range.1 = mid;
            }
        }
        is_even = !is_even;

        if bit < 4 {
            bit += 1;
        } else {
            out.push(BASE32[ch as usize] as char);
            bit = 0;
            ch = 0;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_length() {
        let hash = encode(GeoPoint { lat: 12.9716, lng: 77.5946 }, 5);
        assert_eq!(hash.len(), 5);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let p = GeoPoint { lat: 12.9716, lng: 77.5946 };
        assert_eq!(encode(p, 5), encode(p, 5));
    }

    #[test]
    fn test_nearby_points_share_prefix() {
        let a = encode(GeoPoint { lat: 12.9716, lng: 77.5946 }, 5);
        let b = encode(GeoPoint { lat: 12.9717, lng: 77.5947 }, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distant_points_differ() {
        let bengaluru = encode(GeoPoint { lat: 12.9716, lng: 77.5946 }, 5);
        let chennai = encode(GeoPoint { lat: 13.0827, lng: 80.2707 }, 5);
        assert_ne!(bengaluru, chennai);
    }
}
