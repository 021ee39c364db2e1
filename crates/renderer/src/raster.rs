//! CPU rendition of a frame, pixel for pixel what the preview draws.

use glam::{Vec2, Vec3};
use image::RgbaImage;
use rayon::prelude::*;
use thermal::{BlendMode, FrameSnapshot, GlowSample, Shape, ShapeSource};

use crate::blend::composite;
use crate::layout::{plane_uv, Camera, PlaneSize, GLOW_PLANE_OFFSET};
use crate::mask::MaskImage;

/// Everything needed to rasterise one frame.
#[derive(Debug, Clone, Copy)]
pub struct RasterJob<'a> {
    pub width: u32,
    pub height: u32,
    pub snapshot: &'a FrameSnapshot,
    /// `None` draws an empty scene for mask variants.
    pub mask: Option<&'a MaskImage>,
    pub plane: PlaneSize,
    pub shape: Shape,
}

impl RasterJob<'_> {
    fn camera(&self) -> Camera {
        Camera::new(self.width.max(1) as f32 / self.height.max(1) as f32)
    }

    fn ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x + 0.5) / self.width as f32 * 2.0 - 1.0,
            1.0 - (y + 0.5) / self.height as f32 * 2.0,
        )
    }

    /// Colour of pixel `(x, y)`, with `y` counted from the top row.
    pub fn shade_pixel(&self, camera: &Camera, x: u32, y: u32) -> Vec3 {
        let ndc = self.ndc(x as f32, y as f32);
        match self.snapshot.variant.shape {
            ShapeSource::Procedural => self.shade_shape(camera, ndc),
            ShapeSource::TextureMask => match self.mask {
                Some(mask) => self.shade_mask(camera, mask, ndc),
                None => Vec3::ZERO,
            },
        }
    }

    fn shade_shape(&self, camera: &Camera, ndc: Vec2) -> Vec3 {
        let point = camera.unproject(ndc, 0.0);
        match self.shape.front_surface(point) {
            Some(surface) => {
                let sample = self.snapshot.gradient().shade_shape(surface);
                composite(BlendMode::Additive, Vec3::ZERO, sample.color, sample.alpha)
            }
            None => Vec3::ZERO,
        }
    }

    fn shade_mask(&self, camera: &Camera, mask: &MaskImage, ndc: Vec2) -> Vec3 {
        let mut color = Vec3::ZERO;

        if let Some(uv) = plane_uv(camera.unproject(ndc, 0.0), self.plane) {
            // uv distance covered by one pixel, for the derivative estimate
            let half_height = camera.half_height_at(0.0);
            let du = 2.0 / self.width as f32 * half_height * camera.aspect / self.plane.width;
            let dv = 2.0 / self.height as f32 * half_height / self.plane.height;
            let value = mask.sample(uv);
            let fwidth = (mask.sample(uv + Vec2::new(du, 0.0)) - value).abs()
                + (mask.sample(uv + Vec2::new(0.0, dv)) - value).abs();
            let sample = self.snapshot.gradient().shade(uv, value, Some(fwidth));
            color = composite(BlendMode::Additive, color, sample.color, sample.alpha);
        }

        if self.snapshot.variant.glow {
            if let Some(uv) = plane_uv(camera.unproject(ndc, GLOW_PLANE_OFFSET), self.plane) {
                let glow = self.snapshot.glow_compositor().shade(mask, uv);
                if glow != GlowSample::TRANSPARENT {
                    color = composite(self.snapshot.glow.blend_mode, color, glow.color, glow.alpha);
                }
            }
        }
        color
    }
}

fn to_unorm(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Renders the frame on a black background, rows in parallel.
pub fn render(job: &RasterJob<'_>) -> RgbaImage {
    let width = job.width.max(1);
    let height = job.height.max(1);
    let job = RasterJob {
        width,
        height,
        ..*job
    };
    let camera = job.camera();
    let stride = width as usize * 4;

    let mut image = RgbaImage::new(width, height);
    image
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let color = job.shade_pixel(&camera, x as u32, y as u32);
                pixel.copy_from_slice(&[
                    to_unorm(color.x),
                    to_unorm(color.y),
                    to_unorm(color.z),
                    255,
                ]);
            }
        });
    tracing::debug!(width, height, variant = job.snapshot.variant.name, "rasterised frame");
    image
}
