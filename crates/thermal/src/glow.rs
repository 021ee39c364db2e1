//! Colour-matched glow layer.
//!
//! The glow blurs the mask with an inverse-quadratic kernel over a 17×17
//! grid and, for every sample inside the shape, recomputes the gradient
//! progress at that sample so the blurred colour matches the sharp layer
//! underneath. Deep interior points never glow.

use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::field::AnimationState;
use crate::math::{fract, smoothstep};
use crate::noise::{hash2, simplex3};
use crate::palette::Palette;

/// Grid half-size; the kernel spans `-BLUR_RADIUS..=BLUR_RADIUS` per axis.
pub const BLUR_RADIUS: i32 = 8;

/// Samples at or below this mask value add weight but no colour.
pub const SAMPLE_THRESHOLD: f32 = 0.08;

pub const FADE_START: f32 = 0.05;
pub const FADE_END: f32 = 0.12;

/// Fade below which the blur is skipped entirely.
pub const MIN_FADE: f32 = 0.01;

/// Gain applied to the blurred colour.
pub const BRIGHTEN: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Additive,
    Normal,
    Multiply,
    Screen,
    Subtractive,
}

impl BlendMode {
    pub const ALL: [BlendMode; 5] = [
        BlendMode::Additive,
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Subtractive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Additive => "additive",
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Subtractive => "subtractive",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|mode| *mode == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown blend mode '{wanted}' (expected additive, normal, multiply, screen, or subtractive)"
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowConfig {
    pub intensity: f32,
    /// Blur radius in texture space.
    pub spread: f32,
    /// Exponent applied to the blurred mask.
    pub falloff: f32,
    pub blend_mode: BlendMode,
}

/// Anything that can be sampled like a mask texture at a `uv` coordinate.
pub trait MaskSampler {
    fn sample(&self, uv: Vec2) -> f32;
}

impl<F> MaskSampler for F
where
    F: Fn(Vec2) -> f32,
{
    fn sample(&self, uv: Vec2) -> f32 {
        self(uv)
    }
}

/// Kernel weight for a sample displaced by `offset`.
pub fn kernel_weight(offset: Vec2, spread: f32) -> f32 {
    1.0 / (1.0 + offset.length_squared() / (spread * spread))
}

/// Normalised blur result around one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurAccumulation {
    pub mask: f32,
    pub color: Vec3,
    pub total_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowSample {
    pub color: Vec3,
    pub alpha: f32,
}

impl GlowSample {
    pub const TRANSPARENT: GlowSample = GlowSample {
        color: Vec3::ZERO,
        alpha: 0.0,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct GlowCompositor<'a> {
    animation: &'a AnimationState,
    palette: &'a Palette,
    config: &'a GlowConfig,
    modulate_noise: bool,
}

impl<'a> GlowCompositor<'a> {
    pub fn new(
        animation: &'a AnimationState,
        palette: &'a Palette,
        config: &'a GlowConfig,
        modulate_noise: bool,
    ) -> Self {
        Self {
            animation,
            palette,
            config,
            modulate_noise,
        }
    }

    /// Weighted mask and colour around `uv`.
    pub fn blur<M: MaskSampler + ?Sized>(&self, mask: &M, uv: Vec2) -> BlurAccumulation {
        let animation = self.animation;
        let spread = self.config.spread.max(1e-6);
        let step = spread / (2 * BLUR_RADIUS) as f32;
        let band = animation.animated_band();
        let jitter_time = animation.time * 0.2;

        let mut acc = BlurAccumulation {
            mask: 0.0,
            color: Vec3::ZERO,
            total_weight: 0.0,
        };
        for x in -BLUR_RADIUS..=BLUR_RADIUS {
            for y in -BLUR_RADIUS..=BLUR_RADIUS {
                let offset = Vec2::new(x as f32, y as f32) * step;
                let position = uv + offset;
                let sample = mask.sample(position);
                let weight = kernel_weight(offset, spread);
                acc.mask += sample * weight;
                acc.total_weight += weight;

                if sample > SAMPLE_THRESHOLD {
                    let jitter = hash2(position + jitter_time) * animation.noise_strength;
                    let t = fract(
                        sample
                            + band
                            + animation.gradient_y(position.y)
                            + animation.band_position
                            + jitter,
                    );
                    acc.color += self.palette.evaluate(t) * weight;
                }
            }
        }

        if acc.total_weight > 0.0 {
            acc.mask /= acc.total_weight;
            acc.color /= acc.total_weight;
        }
        acc
    }

    pub fn shade<M: MaskSampler + ?Sized>(&self, mask: &M, uv: Vec2) -> GlowSample {
        let fade = 1.0 - smoothstep(FADE_START, FADE_END, mask.sample(uv));
        if fade < MIN_FADE {
            return GlowSample::TRANSPARENT;
        }

        let animation = self.animation;
        let blurred = self.blur(mask, uv);
        let mut glow = smoothstep(0.0, 1.0, blurred.mask.powf(self.config.falloff));
        glow *= 1.0 + 0.2 * (animation.time * 2.0).sin();
        if self.modulate_noise {
            glow *= 1.0 + simplex3((uv * 3.0).extend(animation.time * 0.2)) * animation.glow_noise;
        }
        glow *= self.config.intensity * fade;

        GlowSample {
            color: blurred.color * BRIGHTEN,
            alpha: glow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::NoiseModel;

    fn animation() -> AnimationState {
        AnimationState {
            time: 1.7,
            morph_speed: 0.8,
            band_position: 0.5,
            gradient_scale: 1.0,
            gradient_speed: 0.05,
            noise_strength: 0.1,
            glow_noise: 0.3,
            noise_model: NoiseModel::Simplex,
        }
    }

    fn config() -> GlowConfig {
        GlowConfig {
            intensity: 1.0,
            spread: 0.2,
            falloff: 0.5,
            blend_mode: BlendMode::Additive,
        }
    }

    fn palette() -> Palette {
        Palette::thermal(
            [0.05, 0.42, 0.81, 0.85, 0.95, 1.0],
            [
                Vec3::new(0.0, 0.0, 0.4),
                Vec3::new(0.0, 0.2, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(1.0, 0.9, 0.0),
                Vec3::new(1.0, 0.2, 0.1),
                Vec3::new(0.0, 0.0, 0.4),
            ],
        )
    }

    #[test]
    fn interior_points_short_circuit_to_transparent() {
        let animation = animation();
        let palette = palette();
        let config = GlowConfig {
            intensity: 5.0,
            ..config()
        };
        let compositor = GlowCompositor::new(&animation, &palette, &config, true);
        for value in [0.12_f32, 0.5, 1.0] {
            let sample = compositor.shade(&|_: Vec2| value, Vec2::new(0.5, 0.5));
            assert_eq!(sample, GlowSample::TRANSPARENT);
        }
    }

    #[test]
    fn constant_mask_blurs_to_itself() {
        let animation = animation();
        let palette = palette();
        let config = config();
        let compositor = GlowCompositor::new(&animation, &palette, &config, false);
        for value in [0.0_f32, 0.03, 0.3, 0.9] {
            let blurred = compositor.blur(&|_: Vec2| value, Vec2::new(0.2, 0.7));
            assert!((blurred.mask - value).abs() < 1e-5, "{value} -> {}", blurred.mask);
        }
    }

    #[test]
    fn kernel_is_inverse_quadratic() {
        assert_eq!(kernel_weight(Vec2::ZERO, 0.2), 1.0);
        // grid corner sits at |offset|² = 2 * (spread / 2)²
        let corner = Vec2::splat(0.2 / 2.0);
        assert!((kernel_weight(corner, 0.2) - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_progress_blurs_to_its_palette_colour() {
        let animation = AnimationState {
            time: 0.0,
            gradient_scale: 0.0,
            noise_strength: 0.0,
            ..animation()
        };
        let palette = palette();
        let config = config();
        let compositor = GlowCompositor::new(&animation, &palette, &config, false);
        let blurred = compositor.blur(&|_: Vec2| 0.3, Vec2::new(0.5, 0.5));
        let expected = palette.evaluate(0.8);
        assert!((blurred.color - expected).abs().max_element() < 1e-5);
    }

    #[test]
    fn faint_samples_glow_without_colour() {
        let animation = AnimationState {
            time: 0.0,
            ..animation()
        };
        let palette = palette();
        let config = config();
        let compositor = GlowCompositor::new(&animation, &palette, &config, false);
        let sample = compositor.shade(&|_: Vec2| 0.05, Vec2::new(0.5, 0.5));
        assert_eq!(sample.color, Vec3::ZERO);
        let expected = smoothstep(0.0, 1.0, 0.05_f32.powf(0.5));
        assert!((sample.alpha - expected).abs() < 1e-5);
    }

    #[test]
    fn glow_lights_the_outside_of_an_edge() {
        let animation = animation();
        let palette = palette();
        let config = config();
        let compositor = GlowCompositor::new(&animation, &palette, &config, true);
        let half_plane = |uv: Vec2| if uv.x < 0.5 { 1.0 } else { 0.0 };
        let near = compositor.shade(&half_plane, Vec2::new(0.55, 0.5));
        let far = compositor.shade(&half_plane, Vec2::new(0.69, 0.5));
        assert!(near.alpha > far.alpha);
        assert!(near.alpha > 0.0);
        assert!(near.color.max_element() > 0.0);
    }

    #[test]
    fn zero_glow_noise_matches_unmodulated_output() {
        let animation = AnimationState {
            glow_noise: 0.0,
            ..animation()
        };
        let palette = palette();
        let config = config();
        let mask = |uv: Vec2| (1.0 - uv.distance(Vec2::splat(0.5)) * 3.0).max(0.0);
        let plain = GlowCompositor::new(&animation, &palette, &config, false);
        let modulated = GlowCompositor::new(&animation, &palette, &config, true);
        let uv = Vec2::new(0.5, 0.82);
        assert_eq!(plain.shade(&mask, uv), modulated.shade(&mask, uv));
    }

    #[test]
    fn blend_modes_cycle_and_parse() {
        let mut mode = BlendMode::Additive;
        for _ in 0..BlendMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, BlendMode::Additive);
        assert_eq!("Screen".parse::<BlendMode>().unwrap(), BlendMode::Screen);
        assert!("overlay".parse::<BlendMode>().is_err());
    }
}
