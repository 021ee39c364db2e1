use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use thermal::{FrameSnapshot, Rgb8, Shape};
use thiserror::Error;
use tracing::info;

use crate::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT};
use crate::layout::PlaneSize;
use crate::mask::MaskImage;
use crate::raster::{self, RasterJob};

pub const DEFAULT_EXPORT_SIZE: u32 = 1280;
const PADDING: f32 = 40.0;
const SWATCH_LIFT: f32 = 50.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Text stamped onto exported images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub enabled: bool,
    pub title: String,
    pub subtitle: String,
    pub footer: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "NEUE\u{2014}LAVA\u{2122}".to_string(),
            subtitle: "BY STUDI\u{d8}E".to_string(),
            footer: "\u{a9}2025 OYGARERDAL.COM".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Side of the square output in pixels.
    pub size: u32,
    pub directory: PathBuf,
    pub branding: Branding,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_EXPORT_SIZE,
            directory: PathBuf::from("."),
            branding: Branding::default(),
        }
    }
}

/// What to draw into an export.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub snapshot: &'a FrameSnapshot,
    pub mask: Option<&'a MaskImage>,
    /// Plane as currently laid out; the export camera only changes aspect.
    pub plane: PlaneSize,
    pub shape: Shape,
    /// Palette colours shown as swatches, blue through red.
    pub swatches: [Rgb8; 5],
}

pub fn export_file_name(timestamp: DateTime<Utc>) -> String {
    format!("neue-lava-{}.png", timestamp.timestamp_millis())
}

/// Renders the square export frame and stamps the branding onto it.
pub fn render_export(request: &ExportRequest<'_>, settings: &ExportSettings) -> RgbaImage {
    let size = settings.size.max(1);
    let mut image = raster::render(&RasterJob {
        width: size,
        height: size,
        snapshot: request.snapshot,
        mask: request.mask,
        plane: request.plane,
        shape: request.shape,
    });
    if settings.branding.enabled {
        draw_branding(&mut image, &settings.branding, &request.swatches);
    }
    image
}

/// Writes `image` as `neue-lava-<millis>.png` inside `directory`.
pub fn save_png(
    image: &RgbaImage,
    directory: &Path,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(directory).map_err(|source| ExportError::CreateDirectory {
        path: directory.to_path_buf(),
        source,
    })?;
    let path = directory.join(export_file_name(timestamp));
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), width = image.width(), height = image.height(), "exported frame");
    Ok(path)
}

pub fn export_frame(
    request: &ExportRequest<'_>,
    settings: &ExportSettings,
) -> Result<PathBuf, ExportError> {
    let image = render_export(request, settings);
    save_png(&image, &settings.directory, Utc::now())
}

fn blend_pixel(image: &mut RgbaImage, x: i64, y: i64, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let dst = f32::from(pixel[channel]);
        let src = f32::from(color[channel]);
        pixel[channel] = (src * alpha + dst * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8;
    }
}

fn fill_rect(image: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3], alpha: f32) {
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(image, x, y, color, alpha);
        }
    }
}

/// Draws `text` centred on `center_x` with its baseline at `baseline`.
///
/// `cell` is the size of one glyph cell in pixels and may be fractional.
pub fn draw_text(
    image: &mut RgbaImage,
    text: &str,
    center_x: f32,
    baseline: f32,
    cell: f32,
    color: [u8; 3],
    alpha: f32,
) {
    let width = glyphs::text_cells(text) as f32 * cell;
    let left = center_x - width / 2.0;
    let top = baseline - GLYPH_HEIGHT as f32 * cell;
    for (index, ch) in text.chars().enumerate() {
        let origin = left + (index as u32 * GLYPH_ADVANCE) as f32 * cell;
        for (column, row) in glyphs::lit_cells(ch) {
            let x0 = (origin + column as f32 * cell).floor() as i64;
            let x1 = (origin + (column + 1) as f32 * cell).floor() as i64;
            let y0 = (top + row as f32 * cell).floor() as i64;
            let y1 = (top + (row + 1) as f32 * cell).floor() as i64;
            fill_rect(image, x0, y0, x1.max(x0 + 1), y1.max(y0 + 1), color, alpha);
        }
    }
}

/// Title and subtitle at the top, palette swatches and footer at the bottom.
pub fn draw_branding(image: &mut RgbaImage, branding: &Branding, swatches: &[Rgb8; 5]) {
    const WHITE: [u8; 3] = [255, 255, 255];
    let width = image.width() as f32;
    let height = image.height() as f32;
    let font_size = (width * 0.018).floor();
    let small_size = (font_size * 0.7).floor();
    // glyph cap height is 70% of the nominal font size
    let cell = font_size * 0.7 / GLYPH_HEIGHT as f32;
    let small_cell = small_size * 0.7 / GLYPH_HEIGHT as f32;
    let center = width / 2.0;

    draw_text(image, &branding.title, center, PADDING + font_size, cell, WHITE, 0.8);
    draw_text(
        image,
        &branding.subtitle,
        center,
        PADDING + font_size + small_size + 5.0,
        small_cell,
        WHITE,
        0.6,
    );

    let swatch = (width * 0.025).floor() as i64;
    let gap = (width * 0.008).floor() as i64;
    let total = 5 * swatch + 4 * gap;
    let start_x = ((width - total as f32) / 2.0).floor() as i64;
    let swatch_y = (height - PADDING - small_size - SWATCH_LIFT).floor() as i64;
    for (index, color) in swatches.iter().enumerate() {
        let x = start_x + index as i64 * (swatch + gap);
        fill_rect(image, x, swatch_y, x + swatch, swatch_y + swatch, color.to_array(), 1.0);
        draw_outline(image, x, swatch_y, swatch, WHITE, 0.3);
    }

    draw_text(image, &branding.footer, center, height - PADDING, small_cell, WHITE, 0.6);
}

fn draw_outline(image: &mut RgbaImage, x: i64, y: i64, size: i64, color: [u8; 3], alpha: f32) {
    let right = x + size - 1;
    let bottom = y + size - 1;
    for column in x..=right {
        blend_pixel(image, column, y, color, alpha);
        blend_pixel(image, column, bottom, color, alpha);
    }
    for row in (y + 1)..bottom {
        blend_pixel(image, x, row, color, alpha);
        blend_pixel(image, right, row, color, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;
    use tempfile::TempDir;
    use thermal::{ParameterStore, Variant, THEMES};

    fn swatches() -> [Rgb8; 5] {
        THEMES[0].colors()
    }

    #[test]
    fn file_name_uses_unix_millis() {
        let timestamp = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(timestamp), "neue-lava-1700000000123.png");
    }

    #[test]
    fn swatches_sit_above_the_footer() {
        let mut image = RgbaImage::from_pixel(1280, 1280, Rgba([0, 0, 0, 255]));
        let branding = Branding {
            title: String::new(),
            subtitle: String::new(),
            footer: String::new(),
            ..Branding::default()
        };
        draw_branding(&mut image, &branding, &swatches());
        // swatch 32px, gap 10px, row starts at x = (1280 - 200) / 2 = 540
        // and y = 1280 - 40 - 16 - 50 = 1174
        let blue = swatches()[0].to_array();
        let red = swatches()[4].to_array();
        assert_eq!(&image.get_pixel(556, 1191).0[..3], &blue);
        assert_eq!(&image.get_pixel(540 + 4 * 42 + 16, 1191).0[..3], &red);
        // the border is white at 30% over the swatch colour
        let border = image.get_pixel(540, 1191).0;
        assert_eq!(border[0], (255.0f32 * 0.3).round() as u8);
        assert_eq!(image.get_pixel(539, 1191).0, [0, 0, 0, 255]);
    }

    #[test]
    fn title_lands_near_the_top_centre() {
        let mut image = RgbaImage::from_pixel(1280, 1280, Rgba([0, 0, 0, 255]));
        draw_branding(&mut image, &Branding::default(), &swatches());
        let lit_top = (0..120)
            .flat_map(|y| (560..720).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y).0[0] > 0)
            .count();
        assert!(lit_top > 0);
        let quiet_middle = (600..680).all(|y| image.get_pixel(640, y).0 == [0, 0, 0, 255]);
        assert!(quiet_middle);
    }

    #[test]
    fn export_writes_square_png() {
        let dir = TempDir::new().unwrap();
        let store = ParameterStore::default();
        let snapshot = store.snapshot(0.5, &Variant::NEUE_LAVA);
        let mask = MaskImage::from_fn(16, 8, |uv| uv.x);
        let settings = ExportSettings {
            size: 96,
            directory: dir.path().join("out"),
            branding: Branding::default(),
        };
        let request = ExportRequest {
            snapshot: &snapshot,
            mask: Some(&mask),
            plane: crate::layout::fit_plane(mask.aspect(), 1.0),
            shape: Shape::Sphere,
            swatches: store.colors().primaries(),
        };
        let path = export_frame(&request, &settings).unwrap();
        assert!(path.starts_with(dir.path().join("out")));
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (96, 96));
    }
}
