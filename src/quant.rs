//! Fixed-point quantization shared by the raw codec and the wce codec.
//!
//! Mesh geometry is stored in the binary form as integers scaled by
//! `1 / 2^fp_scale`. The logical form keeps de-quantized `f32` values, so a
//! binary round trip is lossy at the bit level but numerically stable:
//! re-quantizing a de-quantized value reproduces the original integer.

/// Scale factor for a fixed-point exponent.
#[inline]
pub fn scale(fp_scale: u16) -> f32 {
    1.0 / (1 << fp_scale) as f32
}

/// Quantize a coordinate to a signed 16-bit fixed-point value.
#[inline]
pub fn quantize(v: f32, fp_scale: u16) -> i16 {
    (v * (1 << fp_scale) as f32).round() as i16
}

/// De-quantize a signed 16-bit fixed-point value.
#[inline]
pub fn dequantize(q: i16, fp_scale: u16) -> f32 {
    f32::from(q) * scale(fp_scale)
}

/// Quantize a UV coordinate. UVs share the mesh's exponent but are stored
/// wider (`i32` in the new sub-format, truncated to `i16` in the old one).
#[inline]
pub fn quantize_wide(v: f32, fp_scale: u16) -> i32 {
    (v * (1 << fp_scale) as f32).round() as i32
}

/// De-quantize a wide fixed-point value.
#[inline]
pub fn dequantize_wide(q: i32, fp_scale: u16) -> f32 {
    q as f32 * scale(fp_scale)
}

/// Quantize a unit normal component to `i8` (scaled by 127).
#[inline]
pub fn quantize_normal(v: f32) -> i8 {
    (v * 127.0).round().clamp(-127.0, 127.0) as i8
}

/// De-quantize an `i8` normal component.
#[inline]
pub fn dequantize_normal(q: i8) -> f32 {
    f32::from(q) / 127.0
}

/// Unpack an RGBA color from its packed little-endian `u32` form.
#[inline]
pub fn unpack_rgba(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

/// Pack an RGBA color into its `u32` wire form.
#[inline]
pub fn pack_rgba(c: [u8; 4]) -> u32 {
    u32::from_le_bytes(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_half_step() {
        let fp = 6; // scale = 1/64
        for &v in &[1.0f32, -2.0, 0.5, 3.14159, -1023.9] {
            let q = quantize(v, fp);
            let d = dequantize(q, fp);
            assert!((d - v).abs() <= scale(fp) / 2.0, "{v} -> {q} -> {d}");
        }
    }

    #[test]
    fn test_double_round_trip_is_stable() {
        let fp = 6;
        for &v in &[1.0f32, -2.0, 0.5, 0.007, 12.345] {
            let q1 = quantize(v, fp);
            let d1 = dequantize(q1, fp);
            let q2 = quantize(d1, fp);
            let d2 = dequantize(q2, fp);
            assert_eq!(q1, q2);
            assert_eq!(d1, d2);
        }
    }

    #[test]
    fn test_normal_round_trip() {
        for &v in &[0.0f32, 1.0, -1.0, 0.7071] {
            let q = quantize_normal(v);
            assert!((dequantize_normal(q) - v).abs() <= 1.0 / 254.0 + f32::EPSILON);
        }
    }

    #[test]
    fn test_rgba_pack_unpack() {
        let c = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(unpack_rgba(pack_rgba(c)), c);
    }
}
