use glam::Vec2;
use image::{DynamicImage, Rgba, RgbaImage};
use thermal::MaskSampler;

/// Decoded grayscale mask.
///
/// Only the red channel drives the gradient. Rows are stored bottom-up so
/// `uv = (0, 0)` addresses the bottom-left pixel, the same convention the GPU
/// texture uses after upload.
#[derive(Debug, Clone)]
pub struct MaskImage {
    values: Vec<f32>,
    rgba: RgbaImage,
}

impl MaskImage {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let mut rgba = image.to_rgba8();
        image::imageops::flip_vertical_in_place(&mut rgba);
        Self::from_bottom_up(rgba)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        image::load_from_memory(bytes).map(Self::from_dynamic)
    }

    /// Builds a mask by evaluating `f` at every texel centre (bottom-up uv).
    pub fn from_fn(width: u32, height: u32, f: impl Fn(Vec2) -> f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let rgba = RgbaImage::from_fn(width, height, |x, y| {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            let level = (f(uv).clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgba([level, level, level, 255])
        });
        Self::from_bottom_up(rgba)
    }

    fn from_bottom_up(rgba: RgbaImage) -> Self {
        let values = rgba
            .pixels()
            .map(|pixel| f32::from(pixel[0]) / 255.0)
            .collect();
        Self { values, rgba }
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    pub fn aspect(&self) -> f32 {
        if self.height() == 0 {
            return 1.0;
        }
        self.width() as f32 / self.height() as f32
    }

    /// Bottom-up RGBA pixels ready for `Rgba8Unorm` upload.
    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    /// Red channel at integer texel coordinates, clamped to the edge.
    pub fn texel(&self, x: i64, y: i64) -> f32 {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return 0.0;
        }
        let x = x.clamp(0, i64::from(width) - 1) as usize;
        let y = y.clamp(0, i64::from(height) - 1) as usize;
        self.values[y * width as usize + x]
    }

    /// Bilinear sample with clamp-to-edge addressing.
    pub fn sample(&self, uv: Vec2) -> f32 {
        let (width, height) = self.dimensions();
        let x = uv.x * width as f32 - 0.5;
        let y = uv.y * height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let bottom = self.texel(x0, y0) * (1.0 - fx) + self.texel(x0 + 1, y0) * fx;
        let top = self.texel(x0, y0 + 1) * (1.0 - fx) + self.texel(x0 + 1, y0 + 1) * fx;
        bottom * (1.0 - fy) + top * fy
    }
}

impl MaskSampler for MaskImage {
    fn sample(&self, uv: Vec2) -> f32 {
        MaskImage::sample(self, uv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn top_rows_of_the_file_map_to_high_v() {
        // white top half, black bottom half as stored in the file
        let file = ImageBuffer::from_fn(4, 4, |_, y| Luma([if y < 2 { 255u8 } else { 0 }]));
        let mask = MaskImage::from_dynamic(DynamicImage::ImageLuma8(file));
        assert_eq!(mask.sample(Vec2::new(0.5, 0.95)), 1.0);
        assert_eq!(mask.sample(Vec2::new(0.5, 0.05)), 0.0);
    }

    #[test]
    fn samples_between_texels_blend_linearly() {
        let mask = MaskImage::from_fn(2, 1, |uv| if uv.x < 0.5 { 0.0 } else { 1.0 });
        let middle = mask.sample(Vec2::new(0.5, 0.5));
        assert!((middle - 0.5).abs() < 1e-6, "got {middle}");
    }

    #[test]
    fn sampling_outside_clamps_to_edge() {
        let mask = MaskImage::from_fn(2, 1, |uv| if uv.x < 0.5 { 0.2 } else { 0.8 });
        let left = mask.sample(Vec2::new(-3.0, 0.5));
        let right = mask.sample(Vec2::new(4.0, 0.5));
        assert!((left - 51.0 / 255.0).abs() < 1e-6);
        assert!((right - 204.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn only_the_red_channel_counts() {
        let file = RgbaImage::from_pixel(1, 1, Rgba([128, 255, 0, 255]));
        let mask = MaskImage::from_dynamic(DynamicImage::ImageRgba8(file));
        assert!((mask.sample(Vec2::splat(0.5)) - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn aspect_is_width_over_height() {
        let mask = MaskImage::from_fn(300, 150, |_| 0.0);
        assert_eq!(mask.aspect(), 2.0);
    }
}
