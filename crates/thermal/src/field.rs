//! Gradient field composition: mask, band, scroll and noise into a progress
//! value, then into a palette colour with an antialiased edge.

use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{fract, smoothstep};
use crate::noise::{fbm3, simplex3};
use crate::palette::{Palette, STOP_EPSILON};

/// Mask value at which the visible shape begins.
pub const EDGE_THRESHOLD: f32 = 0.08;

/// Half-width of the edge band when no screen-space derivative is available.
pub const FIXED_EDGE_BAND: f32 = 0.01;

/// Radius used to normalise procedural shape positions.
pub const SHAPE_NORMALISER: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    #[default]
    Simplex,
    Fbm,
}

impl NoiseModel {
    pub fn name(self) -> &'static str {
        match self {
            NoiseModel::Simplex => "simplex",
            NoiseModel::Fbm => "fbm",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            NoiseModel::Simplex => NoiseModel::Fbm,
            NoiseModel::Fbm => NoiseModel::Simplex,
        }
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simplex" => Ok(NoiseModel::Simplex),
            "fbm" => Ok(NoiseModel::Fbm),
            other => Err(format!("unknown noise model '{other}' (expected simplex or fbm)")),
        }
    }
}

/// Per-frame animation inputs shared by the gradient and the glow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    /// Seconds since the session started.
    pub time: f32,
    pub morph_speed: f32,
    pub band_position: f32,
    pub gradient_scale: f32,
    pub gradient_speed: f32,
    pub noise_strength: f32,
    pub glow_noise: f32,
    pub noise_model: NoiseModel,
}

impl AnimationState {
    /// Phase of the morphing band in `[0, 1)`.
    pub fn animated_band(&self) -> f32 {
        fract(self.time * self.morph_speed * 0.2)
    }

    pub fn vertical_offset(&self) -> f32 {
        fract(self.time * self.gradient_speed)
    }

    /// Scrolling vertical ramp at height `y`.
    pub fn gradient_y(&self, y: f32) -> f32 {
        fract((y - self.vertical_offset()) * self.gradient_scale)
    }

    /// Noise perturbation for the main gradient, before `noise_strength`.
    pub fn field_noise(&self, uv: Vec2) -> f32 {
        match self.noise_model {
            NoiseModel::Simplex => simplex3((uv * 3.0).extend(self.time * 0.2)),
            NoiseModel::Fbm => fbm3((uv * 2.0).extend(self.time * 0.15)),
        }
    }

    /// Noise-free sum of mask, band, scroll and band position.
    pub fn phase(&self, uv: Vec2, mask: f32) -> f32 {
        mask + self.animated_band() + self.gradient_y(uv.y) + self.band_position
    }
}

/// Antialiased visibility of a mask value.
///
/// `fwidth` is the screen-space derivative magnitude of the mask when known;
/// otherwise a fixed band is used.
pub fn edge_alpha(mask: f32, fwidth: Option<f32>) -> f32 {
    let half_band = match fwidth {
        Some(width) => 2.0 * width.abs(),
        None => FIXED_EDGE_BAND,
    };
    smoothstep(EDGE_THRESHOLD - half_band, EDGE_THRESHOLD + half_band, mask)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSample {
    pub color: Vec3,
    pub alpha: f32,
    /// Eased progress that selected `color`.
    pub t: f32,
}

/// Shades the sharp gradient layer for one frame.
#[derive(Debug, Clone, Copy)]
pub struct GradientField<'a> {
    animation: &'a AnimationState,
    palette: &'a Palette,
}

impl<'a> GradientField<'a> {
    pub fn new(animation: &'a AnimationState, palette: &'a Palette) -> Self {
        Self { animation, palette }
    }

    /// Eased palette progress for a mask sample.
    pub fn progress(&self, uv: Vec2, mask: f32) -> f32 {
        let noise = self.animation.field_noise(uv) * self.animation.noise_strength;
        let t = fract(self.animation.phase(uv, mask) + noise);
        smoothstep(0.0, 1.0, t)
    }

    pub fn shade(&self, uv: Vec2, mask: f32, fwidth: Option<f32>) -> GradientSample {
        let t = self.progress(uv, mask);
        GradientSample {
            color: self.palette.evaluate(t),
            alpha: edge_alpha(mask, fwidth),
            t,
        }
    }

    /// Shades a point on a procedural shape surface.
    ///
    /// With noise enabled (`noise_strength > 0`) progress follows simplex
    /// noise over the surface; otherwise it is the edge proximity against a
    /// band that swings with `sin(time * morph_speed)`.
    pub fn shade_shape(&self, position: Vec3) -> GradientSample {
        let animation = self.animation;
        let norm_len = position.length() / SHAPE_NORMALISER;
        let morph = if animation.noise_strength > 0.0 {
            let point = Vec3::new(
                position.x * animation.gradient_scale,
                position.y * animation.gradient_scale,
                animation.time * animation.morph_speed,
            );
            simplex3(point) * 0.5 + 0.5
        } else {
            let band = animation.band_position + 0.2 * (animation.time * animation.morph_speed).sin();
            1.0 - smoothstep(band, band + animation.gradient_scale * 0.5, norm_len)
        };
        // keep t = 1 on the last stop instead of wrapping to the first
        let t = morph.clamp(0.0, 1.0 - STOP_EPSILON);
        GradientSample {
            color: self.palette.evaluate(t),
            alpha: smoothstep(1.0, 1.2, norm_len * SHAPE_NORMALISER),
            t,
        }
    }
}
