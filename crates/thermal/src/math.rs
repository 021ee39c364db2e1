//! Scalar helpers with GLSL semantics so the CPU reference and the shaders
//! agree on rounding behaviour.

/// Fractional part in `[0, 1)`, matching GLSL `fract` for negative inputs.
pub fn fract(x: f32) -> f32 {
    let value = x - x.floor();
    // `x - floor(x)` rounds up to 1.0 for tiny negative inputs.
    if value >= 1.0 {
        0.0
    } else {
        value
    }
}

/// Cubic Hermite interpolation between two edges.
///
/// A zero-width band degrades to a hard step at `edge0` instead of producing
/// NaN.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 == edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fract_wraps_negative_values() {
        assert!((fract(1.25) - 0.25).abs() < 1e-6);
        assert!((fract(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(fract(3.0), 0.0);
    }

    #[test]
    fn fract_never_returns_one() {
        let value = fract(-1e-9);
        assert!((0.0..1.0).contains(&value));
    }

    #[test]
    fn smoothstep_matches_expected_values() {
        assert!((smoothstep(0.0, 1.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((smoothstep(0.0, 1.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((smoothstep(0.0, 1.0, 2.0) - 1.0).abs() < 1e-6);
        assert!((smoothstep(0.0, 1.0, -1.0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn zero_width_band_is_a_step() {
        assert_eq!(smoothstep(0.08, 0.08, 0.07), 0.0);
        assert_eq!(smoothstep(0.08, 0.08, 0.08), 1.0);
    }
}
