use std::path::PathBuf;

use thermal::{ParameterStore, Shape, Variant};

use crate::catalog::MaskCatalog;
use crate::export::ExportSettings;
use crate::loader::LoaderSettings;
use crate::runtime::RenderPolicy;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain, so the preview matches exported PNGs byte for byte.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains for conversion.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest supported sample count, up to 4.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the merged CLI flags and session file: which
/// variant to draw, where masks come from, and the parameter store the
/// session starts with.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Which flavour of the gradient to draw.
    pub variant: Variant,
    /// Solid used by the procedural variant.
    pub shape: Shape,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
    /// High-level render behaviour requested by the caller.
    pub policy: RenderPolicy,
    /// Starting parameter values; the window owns and mutates its own copy.
    pub parameters: ParameterStore,
    /// Bundled masks reachable with the arrow keys.
    pub catalog: MaskCatalog,
    /// User mask to open instead of the catalogue's current entry.
    pub upload: Option<PathBuf>,
    /// Deadlines and size limits for mask decoding.
    pub loader: LoaderSettings,
    /// Where and how the E key writes PNGs.
    pub export: ExportSettings,
}

impl Default for RendererConfig {
    /// Provides a 1280x800 window over the default catalogue.
    fn default() -> Self {
        Self {
            surface_size: (1280, 800),
            variant: Variant::default(),
            shape: Shape::default(),
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            policy: RenderPolicy::default(),
            parameters: ParameterStore::default(),
            catalog: MaskCatalog::default(),
            upload: None,
            loader: LoaderSettings::default(),
            export: ExportSettings::default(),
        }
    }
}
