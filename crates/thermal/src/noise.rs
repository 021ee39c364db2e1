//! Noise sources for the gradient field and the glow.
//!
//! `simplex3` is the Ashima Arts 3D simplex noise (MIT) with the cubic
//! falloff used by the shaders, so CPU and GPU output line up. `hash2` is the
//! cheap sine hash the glow blur uses for its per-sample jitter.

use glam::{Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

use crate::math::fract;

/// Largest magnitude [`simplex3`] reaches in practice.
pub const SIMPLEX_PEAK: f32 = 1.2;

/// Octave count of [`fbm3`].
pub const FBM_OCTAVES: usize = 4;

fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + 1.0) * x)
}

fn taylor_inv_sqrt(r: Vec4) -> Vec4 {
    1.792_842_9 - 0.853_734_7 * r
}

/// GLSL `step(edge, x)`.
fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmplt(edge), Vec3::ZERO, Vec3::ONE)
}

fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmplt(edge), Vec4::ZERO, Vec4::ONE)
}

/// 3D simplex noise, roughly in `[-1, 1]`.
///
/// The cubic falloff lets peaks overshoot slightly; values stay within
/// [`SIMPLEX_PEAK`] in magnitude.
pub fn simplex3(v: Vec3) -> f32 {
    const C: Vec2 = Vec2::new(1.0 / 6.0, 1.0 / 3.0);

    let i = (v + v.dot(Vec3::splat(C.y))).floor();
    let x0 = v - i + i.dot(Vec3::splat(C.x));

    let g = step3(x0.yzx(), x0);
    let l = 1.0 - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + 2.0 * C.x;
    let x3 = x0 - 1.0 + 3.0 * C.x;

    let i = mod289_3(i);
    let p = permute(
        permute(
            permute(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + i.y
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + i.x
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients on a 7x7 grid mapped onto an octahedron.
    let n = 1.0 / 7.0;
    let ns = Vec3::new(2.0 * n, 0.5 * n - 1.0, n);

    let j = p - 49.0 * (p * ns.z * ns.z).floor();
    let x_ = (j * ns.z).floor();
    let y_ = (j - 7.0 * x_).floor();

    let x = x_ * ns.x + ns.y;
    let y = y_ * ns.x + ns.y;
    let h = 1.0 - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);
    let s0 = b0.floor() * 2.0 + 1.0;
    let s1 = b1.floor() * 2.0 + 1.0;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let m = (0.6 - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3))).max(Vec4::ZERO);
    42.0 * (m * m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

/// Fractal sum of [`simplex3`]: amplitude halves and frequency doubles per
/// octave.
pub fn fbm3(p: Vec3) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..FBM_OCTAVES {
        value += amplitude * simplex3(p * frequency);
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    value
}

/// Sine hash in `[0, 1)`.
pub fn hash2(p: Vec2) -> f32 {
    fract(p.dot(Vec2::new(12.9898, 78.233)).sin() * 43_758.547)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> impl Iterator<Item = Vec3> {
        (0..12).flat_map(|x| {
            (0..12).flat_map(move |y| {
                (0..4).map(move |z| Vec3::new(x as f32 * 0.37, y as f32 * 0.41, z as f32 * 0.9))
            })
        })
    }

    #[test]
    fn simplex_is_bounded_and_finite() {
        for point in grid() {
            let value = simplex3(point);
            assert!(value.is_finite());
            assert!(value.abs() < SIMPLEX_PEAK, "simplex3({point}) = {value}");
        }
    }

    #[test]
    fn cubic_falloff_overshoots_unit_range() {
        let value = simplex3(Vec3::new(0.0, 0.0, 0.9));
        assert!((value + 1.073_115).abs() < 1e-4, "{value}");
    }

    #[test]
    fn simplex_is_deterministic_and_varies() {
        let a = simplex3(Vec3::new(0.3, 1.7, 0.2));
        assert_eq!(a, simplex3(Vec3::new(0.3, 1.7, 0.2)));
        let distinct = grid()
            .map(simplex3)
            .filter(|value| (value - a).abs() > 1e-3)
            .count();
        assert!(distinct > 100);
    }

    #[test]
    fn simplex_is_continuous() {
        for point in grid() {
            let delta = (simplex3(point) - simplex3(point + Vec3::splat(1e-4))).abs();
            assert!(delta < 0.01);
        }
    }

    #[test]
    fn fbm_stays_within_octave_envelope() {
        let envelope: f32 = (0..FBM_OCTAVES).map(|octave| 0.5_f32.powi(octave as i32 + 1)).sum();
        for point in grid() {
            assert!(fbm3(point).abs() < envelope * SIMPLEX_PEAK);
        }
    }

    #[test]
    fn hash_stays_in_unit_interval() {
        for point in grid() {
            let value = hash2(point.truncate());
            assert!((0.0..1.0).contains(&value));
        }
    }
}
