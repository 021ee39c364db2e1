//! Shading core for neue-lava.
//!
//! Everything here is a pure function of a [`FrameSnapshot`] and a sample
//! position: the thermal palette, the gradient field, and the glow. The
//! renderer runs the same maths on the GPU; this crate is the CPU reference
//! used for export and tests.

pub mod color;
pub mod field;
pub mod glow;
pub mod math;
pub mod noise;
pub mod palette;
pub mod params;
pub mod shape;
pub mod snapshot;
pub mod theme;
pub mod variant;

pub use color::Rgb8;
pub use field::{edge_alpha, AnimationState, GradientField, GradientSample, NoiseModel};
pub use glow::{BlendMode, BlurAccumulation, GlowCompositor, GlowConfig, GlowSample, MaskSampler};
pub use palette::{repair_stops, ColorStop, Palette};
pub use params::{ColorSlot, PaletteColors, ParamError, ParamGroup, ParamSpec, ParameterStore, PARAMS};
pub use shape::Shape;
pub use snapshot::FrameSnapshot;
pub use theme::{find_theme, Theme, THEMES};
pub use variant::{NoiseSource, ShapeSource, StopSet, Variant};
