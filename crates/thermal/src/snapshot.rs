use crate::field::{AnimationState, GradientField};
use crate::glow::{GlowCompositor, GlowConfig};
use crate::palette::Palette;
use crate::variant::Variant;

/// Immutable copy of everything one frame needs, built by
/// [`ParameterStore::snapshot`](crate::ParameterStore::snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub animation: AnimationState,
    /// Stops already repaired into strictly increasing order.
    pub palette: Palette,
    pub glow: GlowConfig,
    pub variant: Variant,
}

impl FrameSnapshot {
    pub fn gradient(&self) -> GradientField<'_> {
        GradientField::new(&self.animation, &self.palette)
    }

    pub fn glow_compositor(&self) -> GlowCompositor<'_> {
        GlowCompositor::new(
            &self.animation,
            &self.palette,
            &self.glow,
            self.variant.glow_noise,
        )
    }
}
