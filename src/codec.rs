//! Bit-exact OpenLR coordinate encoding.
//!
//! Absolute coordinates are 24-bit signed fixed-point values on a
//! `360 / 2^24` degree grid; relative coordinates are 16-bit deltas on a
//! `1 / 100_000` degree grid. Both are ordinary two's-complement integers,
//! big-endian (most significant byte first); the bias term folded into the
//! rounding (`sign(v) * 0.5`) is what keeps the round-trip symmetric around
//! zero, not a separate sign-magnitude field.

use crate::model::Coordinate;

const RESOLUTION_BITS: u32 = 24;
const ABSOLUTE_SCALE: f64 = (1u32 << RESOLUTION_BITS) as f64 / 360.0;
const RELATIVE_SCALE: f64 = 100_000.0;

/// Encodes and decodes [`Coordinate`]s into the OpenLR wire format.
pub struct CoordCodec;

impl CoordCodec {
    /// Encodes `coord` as 6 bytes: 3 for longitude, 3 for latitude.
    pub fn encode(coord: Coordinate) -> [u8; 6] {
        let mut out = [0u8; 6];
        out[0..3].copy_from_slice(&encode_absolute(coord.lon));
        out[3..6].copy_from_slice(&encode_absolute(coord.lat));
        out
    }

    /// Decodes 6 bytes produced by [`Self::encode`] back into a [`Coordinate`].
    pub fn decode(bytes: &[u8]) -> Coordinate {
        debug_assert!(bytes.len() >= 6);
        let lon = decode_absolute([bytes[0], bytes[1], bytes[2]]);
        let lat = decode_absolute([bytes[3], bytes[4], bytes[5]]);
        Coordinate::new(lon, lat)
    }

    /// Encodes `coord` as a delta from `reference`: 4 bytes, 2 for
    /// longitude, 2 for latitude.
    pub fn encode_relative(coord: Coordinate, reference: Coordinate) -> [u8; 4] {
        let mut out = [0u8; 4];
        out[0..2].copy_from_slice(&encode_relative(coord.lon - reference.lon));
        out[2..4].copy_from_slice(&encode_relative(coord.lat - reference.lat));
        out
    }

    /// Decodes 4 bytes produced by [`Self::encode_relative`], applying the
    /// delta onto `reference`.
    pub fn decode_relative(bytes: &[u8], reference: Coordinate) -> Coordinate {
        debug_assert!(bytes.len() >= 4);
        let lon = reference.lon + decode_relative([bytes[0], bytes[1]]);
        let lat = reference.lat + decode_relative([bytes[2], bytes[3]]);
        Coordinate::new(lon, lat)
    }
}

fn signum(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value.signum() }
}

/// Returns the big-endian two's-complement representation of `degrees` at
/// `360 / 2^24` resolution.
fn encode_absolute(degrees: f64) -> [u8; 3] {
    let scaled = signum(degrees) * 0.5 + degrees * ABSOLUTE_SCALE;
    let packed = scaled.round() as i32;
    let bytes = packed.to_be_bytes();
    [bytes[1], bytes[2], bytes[3]]
}

/// Inverse of [`encode_absolute`]: sign-extends the 24-bit field to 32 bits
/// before converting back to degrees.
fn decode_absolute(bytes: [u8; 3]) -> f64 {
    let is_negative = bytes[0] & 0x80 != 0;
    let sign_byte = if is_negative { 0xFF } else { 0x00 };
    let packed = i32::from_be_bytes([sign_byte, bytes[0], bytes[1], bytes[2]]) as f64;
    (packed - signum(packed) * 0.5) * 360.0 / (1u32 << RESOLUTION_BITS) as f64
}

/// Returns the big-endian two's-complement representation of `delta_degrees`
/// at `1 / 100_000` degree resolution.
fn encode_relative(delta_degrees: f64) -> [u8; 2] {
    let scaled = (delta_degrees * RELATIVE_SCALE).round() as i16;
    scaled.to_be_bytes()
}

fn decode_relative(bytes: [u8; 2]) -> f64 {
    i16::from_be_bytes(bytes) as f64 / RELATIVE_SCALE
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const GRID_EPSILON: f64 = 360.0 / (1u32 << RESOLUTION_BITS) as f64;

    #[test]
    fn absolute_round_trip_is_within_one_grid_step() {
        let coord = Coordinate::new(6.12829, 49.60597);
        let bytes = CoordCodec::encode(coord);
        let decoded = CoordCodec::decode(&bytes);

        assert_abs_diff_eq!(decoded.lon, coord.lon, epsilon = GRID_EPSILON);
        assert_abs_diff_eq!(decoded.lat, coord.lat, epsilon = GRID_EPSILON);
    }

    #[test]
    fn absolute_round_trip_many_values() {
        for (lon, lat) in [
            (5.10007, 52.103207),
            (41.030143, 28.977417),
            (50.749673, 7.099048),
            (21.173398, -86.8281),
            (43.259594, 76.94086),
            (-27.22775, 153.11216),
            (48.068831, 12.858026),
            (-33.22979, -60.32423),
        ] {
            let coord = Coordinate::new(lon, lat);
            let decoded = CoordCodec::decode(&CoordCodec::encode(coord));
            assert_abs_diff_eq!(decoded.lon, coord.lon, epsilon = GRID_EPSILON);
            assert_abs_diff_eq!(decoded.lat, coord.lat, epsilon = GRID_EPSILON);
        }
    }

    #[test]
    fn negative_longitude_sets_the_sign_bit() {
        let coord = Coordinate::new(-0.00001, 0.0);
        let bytes = CoordCodec::encode(coord);

        assert_eq!(bytes[0] & 0b1000_0000, 0b1000_0000);

        let decoded = CoordCodec::decode(&bytes);
        assert!(decoded.lon < 0.0);
    }

    #[test]
    fn zero_does_not_set_the_sign_bit() {
        let bytes = CoordCodec::encode(Coordinate::new(0.0, 0.0));
        assert_eq!(bytes[0] & 0b1000_0000, 0);
        assert_eq!(bytes[3] & 0b1000_0000, 0);
    }

    #[test]
    fn relative_round_trip_is_within_one_grid_step() {
        let reference = Coordinate::new(6.12829, 49.60597);
        let coord = Coordinate::new(6.12779, 49.60521);

        let bytes = CoordCodec::encode_relative(coord, reference);
        let decoded = CoordCodec::decode_relative(&bytes, reference);

        let epsilon = 1.0 / 100_000.0;
        assert_abs_diff_eq!(decoded.lon, coord.lon, epsilon = epsilon);
        assert_abs_diff_eq!(decoded.lat, coord.lat, epsilon = epsilon);
    }

    #[test]
    fn relative_negative_delta_sets_the_sign_bit() {
        let reference = Coordinate::new(6.12829, 49.60597);
        let coord = Coordinate::new(6.12729, 49.60597);

        let bytes = CoordCodec::encode_relative(coord, reference);
        assert_eq!(bytes[0] & 0b1000_0000, 0b1000_0000);
    }

    #[test]
    fn relative_round_trip_many_values() {
        let mut reference = Coordinate::new(6.5954983, 48.0714404);
        for (lon, lat) in [
            (6.4856483, 48.1540304),
            (6.4849583, 48.1689504),
            (6.3911883, 48.2611404),
            (6.3875183, 48.2661004),
            (6.3873083, 48.2663904),
            (6.3128583, 48.3426604),
            (6.2923383, 48.3627404),
            (6.2804683, 48.3684204),
            (6.2734683, 48.3697604),
            (6.2329683, 48.4129304),
            (6.2428683, 48.4842204),
            (6.2398283, 48.4902004),
            (6.1870783, 48.5563704),
        ] {
            let coord = Coordinate::new(lon, lat);
            let bytes = CoordCodec::encode_relative(coord, reference);
            let decoded = CoordCodec::decode_relative(&bytes, reference);
            assert_abs_diff_eq!(decoded.lon, coord.lon, epsilon = 1.0 / 100_000.0);
            assert_abs_diff_eq!(decoded.lat, coord.lat, epsilon = 1.0 / 100_000.0);
            reference = coord;
        }
    }
}
