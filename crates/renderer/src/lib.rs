//! Renderer crate for neue-lava.
//!
//! The crate turns a [`thermal::FrameSnapshot`] into pixels two ways: a wgpu
//! preview window whose GLSL shaders mirror the `thermal` maths, and a CPU
//! raster used for PNG export. The overall flow is:
//!
//! ```text
//!   CLI / neuelava
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ Session ──▶ winit event loop ──▶ GpuState::render()
//!          │             │
//!          │             └─▶ MaskLoader (worker threads) ──▶ Scene
//!          ▼
//!   Renderer::export_still ──▶ raster::render ──▶ export::draw_branding ──▶ PNG
//! ```
//!
//! `Session` holds everything that does not need a window (parameters, the
//! mask catalogue, the scene and the loader), so it is also what the tests
//! drive.

pub mod blend;
pub mod catalog;
mod compile;
pub mod controls;
pub mod export;
pub mod glyphs;
mod gpu;
pub mod layout;
pub mod loader;
pub mod mask;
pub mod raster;
pub mod runtime;
pub mod scene;
pub mod session;
mod types;
mod window;

use std::path::PathBuf;

use anyhow::{Context, Result};
use thermal::ShapeSource;
use tracing::info;

pub use catalog::{MaskCatalog, DEFAULT_MASK_COUNT};
pub use export::{Branding, ExportError, ExportSettings, DEFAULT_EXPORT_SIZE};
pub use loader::{LoaderSettings, MaskLoadError, MaskLoader, MaskSource, SUPPORTED_EXTENSIONS};
pub use mask::MaskImage;
pub use runtime::RenderPolicy;
pub use session::{Session, SessionSummary};
pub use types::{Antialiasing, ColorSpaceMode, RendererConfig};

/// Entry point used by the binary.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the preview window and blocks until it closes.
    pub fn run(self) -> Result<SessionSummary> {
        window::run_window(self.config)
    }

    /// Renders one branded frame at `time` without opening a window.
    ///
    /// Unlike the preview, a rejected or unreadable mask is an error here.
    pub fn export_still(self, time: f32) -> Result<PathBuf> {
        let config = self.config;
        let loader = MaskLoader::new(config.loader);
        let mask = if config.variant.shape == ShapeSource::TextureMask {
            let source = match &config.upload {
                Some(path) => MaskSource::Upload(path.clone()),
                None => config.catalog.current_source(),
            };
            let mask = loader
                .load_blocking(&source)
                .with_context(|| format!("failed to load mask {}", source.path().display()))?;
            info!(source = %source.label(), width = mask.width(), height = mask.height(), "mask loaded");
            Some(mask)
        } else {
            None
        };

        // the export camera is square, so fit the plane to aspect 1
        let plane = mask
            .as_ref()
            .map(|mask| layout::fit_plane(mask.aspect(), 1.0))
            .unwrap_or(layout::PlaneSize::SQUARE);
        let snapshot = config.parameters.snapshot(time, &config.variant);
        let request = export::ExportRequest {
            snapshot: &snapshot,
            mask: mask.as_ref(),
            plane,
            shape: config.shape,
            swatches: config.parameters.colors().primaries(),
        };
        let path = export::export_frame(&request, &config.export).context("failed to export frame")?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;
    use thermal::Variant;

    fn config(dir: &TempDir) -> RendererConfig {
        RendererConfig {
            catalog: MaskCatalog::new(dir.path(), 2, 1),
            export: ExportSettings {
                size: 64,
                directory: dir.path().join("out"),
                ..ExportSettings::default()
            },
            ..RendererConfig::default()
        }
    }

    #[test]
    fn still_export_uses_the_catalogue_mask() {
        let dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(8, 4, Rgba([255, 0, 0, 255]))
            .save(dir.path().join("mask-1.png"))
            .unwrap();
        let path = Renderer::new(config(&dir)).export_still(1.0).unwrap();
        let image = image::open(path).unwrap();
        assert_eq!((image.width(), image.height()), (64, 64));
    }

    #[test]
    fn still_export_fails_without_writing_for_bad_upload() {
        let dir = TempDir::new().unwrap();
        let upload = dir.path().join("mask.txt");
        std::fs::write(&upload, b"text").unwrap();
        let config = RendererConfig {
            upload: Some(upload),
            ..config(&dir)
        };
        let err = Renderer::new(config).export_still(0.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MaskLoadError>(),
            Some(MaskLoadError::InvalidFileType { .. })
        ));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn shape_variant_exports_without_masks() {
        let dir = TempDir::new().unwrap();
        let config = RendererConfig {
            variant: Variant::SHAPE,
            ..config(&dir)
        };
        assert!(Renderer::new(config).export_still(0.5).is_ok());
    }
}
