//! Numeric conversion utilities for vsvis-gui.
//!
//! These functions handle conversions between numeric types with explicit
//! handling of precision loss and bounds checking.

/// Convert usize to f32 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f32(value: usize) -> f32 {
    value as f32
}

/// Convert usize to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert f64 to f32, saturating at the f32 range.
#[allow(clippy::cast_possible_truncation)]
pub fn f64_to_f32(value: f64) -> f32 {
    value as f32
}

/// Convert f32 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f32_to_u8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 255.0);
    clamped.round() as u8
}

/// Convert f64 to usize with bounds checking.
///
/// Returns `None` if the value is not finite, negative, or >= `max_exclusive`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_usize_bounded(value: f64, max_exclusive: usize) -> Option<usize> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value >= usize_to_f64(max_exclusive) {
        return None;
    }
    Some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_u8_clamps() {
        assert_eq!(f32_to_u8(-3.0), 0);
        assert_eq!(f32_to_u8(127.6), 128);
        assert_eq!(f32_to_u8(900.0), 255);
    }

    #[test]
    fn test_f64_to_usize_bounded() {
        assert_eq!(f64_to_usize_bounded(2.7, 4), Some(2));
        assert_eq!(f64_to_usize_bounded(4.0, 4), None);
        assert_eq!(f64_to_usize_bounded(-0.5, 4), None);
        assert_eq!(f64_to_usize_bounded(f64::NAN, 4), None);
    }
}
