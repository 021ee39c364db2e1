use bytemuck::{Pod, Zeroable};
use thermal::{FrameSnapshot, NoiseModel, Shape, ShapeSource};
use winit::dpi::PhysicalSize;

use crate::layout::{Camera, PlaneSize, GLOW_PLANE_OFFSET};

/// Most stops the shader palette loop handles.
pub(crate) const MAX_STOPS: usize = 6;

/// Mirror of the `LavaParams` block in `shaders/header.glsl`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LavaUniforms {
    /// width, height, aspect, time
    pub frame: [f32; 4],
    pub stops: [[f32; 4]; 2],
    pub colors: [[f32; 4]; MAX_STOPS],
    /// morph speed, band position, gradient scale, gradient speed
    pub motion: [f32; 4],
    /// strength, glow noise, model, glow noise enabled
    pub noise: [f32; 4],
    /// intensity, spread, falloff, stop count
    pub glow: [f32; 4],
    /// width, height, half height at z = 0, half height at the glow plane
    pub plane: [f32; 4],
    /// procedural flag, shape index
    pub source: [f32; 4],
}

unsafe impl Zeroable for LavaUniforms {}
unsafe impl Pod for LavaUniforms {}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn shape_index(shape: Shape) -> f32 {
    match shape {
        Shape::Sphere => 0.0,
        Shape::Cube => 1.0,
        Shape::Octahedron => 2.0,
    }
}

impl LavaUniforms {
    pub fn new(
        snapshot: &FrameSnapshot,
        size: PhysicalSize<u32>,
        camera: &Camera,
        plane: PlaneSize,
        shape: Shape,
    ) -> Self {
        let animation = &snapshot.animation;
        let glow = &snapshot.glow;

        let stops = snapshot.palette.stops();
        let count = stops.len().min(MAX_STOPS);
        if stops.len() > MAX_STOPS {
            tracing::warn!(stops = stops.len(), "palette truncated to {MAX_STOPS} stops on the GPU");
        }
        let mut positions = [[0.0; 4]; 2];
        let mut colors = [[0.0; 4]; MAX_STOPS];
        for (index, stop) in stops.iter().take(count).enumerate() {
            positions[index / 4][index % 4] = stop.position;
            colors[index] = stop.color.extend(1.0).to_array();
        }

        let noise_model = match animation.noise_model {
            NoiseModel::Simplex => 0.0,
            NoiseModel::Fbm => 1.0,
        };

        Self {
            frame: [
                size.width.max(1) as f32,
                size.height.max(1) as f32,
                camera.aspect,
                animation.time,
            ],
            stops: positions,
            colors,
            motion: [
                animation.morph_speed,
                animation.band_position,
                animation.gradient_scale,
                animation.gradient_speed,
            ],
            noise: [
                animation.noise_strength,
                animation.glow_noise,
                noise_model,
                flag(snapshot.variant.glow_noise),
            ],
            glow: [glow.intensity, glow.spread, glow.falloff, count as f32],
            plane: [
                plane.width,
                plane.height,
                camera.half_height_at(0.0),
                camera.half_height_at(GLOW_PLANE_OFFSET),
            ],
            source: [
                flag(snapshot.variant.shape == ShapeSource::Procedural),
                shape_index(shape),
                0.0,
                0.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};
    use thermal::{ParameterStore, Variant};

    #[test]
    fn std140_layout_matches_shader_block() {
        assert_eq!(align_of::<LavaUniforms>(), 16);
        assert_eq!(size_of::<LavaUniforms>(), 14 * 16);

        let uniforms = LavaUniforms::zeroed();
        let base = &uniforms as *const _ as usize;
        let offset = |field: *const f32| field as usize - base;
        assert_eq!(offset(uniforms.frame.as_ptr()), 0);
        assert_eq!(offset(uniforms.stops[0].as_ptr()), 16);
        assert_eq!(offset(uniforms.colors[0].as_ptr()), 48);
        assert_eq!(offset(uniforms.motion.as_ptr()), 144);
        assert_eq!(offset(uniforms.noise.as_ptr()), 160);
        assert_eq!(offset(uniforms.glow.as_ptr()), 176);
        assert_eq!(offset(uniforms.plane.as_ptr()), 192);
        assert_eq!(offset(uniforms.source.as_ptr()), 208);
    }

    #[test]
    fn thermal_palette_fills_all_six_slots() {
        let store = ParameterStore::default();
        let snapshot = store.snapshot(2.0, &Variant::NEUE_LAVA);
        let camera = Camera::new(1.6);
        let uniforms = LavaUniforms::new(
            &snapshot,
            PhysicalSize::new(1280, 800),
            &camera,
            PlaneSize::SQUARE,
            Shape::Sphere,
        );
        assert_eq!(uniforms.glow[3], 6.0);
        assert_eq!(uniforms.stops[1][1], snapshot.palette.stops()[5].position);
        assert_eq!(uniforms.frame, [1280.0, 800.0, 1.6, 2.0]);
        assert_eq!(uniforms.source[0], 0.0);
        assert!(uniforms.plane[3] < uniforms.plane[2]);
    }

    #[test]
    fn shape_variant_uses_tricolor_and_shape_index() {
        let store = ParameterStore::default();
        let snapshot = store.snapshot(0.0, &Variant::SHAPE);
        let uniforms = LavaUniforms::new(
            &snapshot,
            PhysicalSize::new(0, 0),
            &Camera::new(1.0),
            PlaneSize::SQUARE,
            Shape::Octahedron,
        );
        assert_eq!(uniforms.glow[3], 3.0);
        assert_eq!(uniforms.colors[1], [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(uniforms.source, [1.0, 2.0, 0.0, 0.0]);
        assert_eq!(&uniforms.frame[..2], &[1.0, 1.0]);
    }
}
