use glam::Vec3;
use thermal::BlendMode;

/// Composites one layer onto `dst` the way the GPU blend state does for a
/// UNORM target: inputs are clamped to `[0, 1]` first, and so is the result.
pub fn composite(mode: BlendMode, dst: Vec3, src: Vec3, alpha: f32) -> Vec3 {
    let src = src.clamp(Vec3::ZERO, Vec3::ONE);
    let alpha = alpha.clamp(0.0, 1.0);
    let out = match mode {
        BlendMode::Additive => dst + src * alpha,
        BlendMode::Normal => src * alpha + dst * (1.0 - alpha),
        BlendMode::Multiply => dst * src,
        BlendMode::Screen => src + dst * (Vec3::ONE - src),
        BlendMode::Subtractive => dst * (Vec3::ONE - src),
    };
    out.clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DST: Vec3 = Vec3::new(0.2, 0.4, 0.6);
    const SRC: Vec3 = Vec3::new(0.5, 0.5, 1.0);

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-6
    }

    #[test]
    fn additive_adds_weighted_source() {
        let out = composite(BlendMode::Additive, DST, SRC, 0.5);
        assert!(close(out, Vec3::new(0.45, 0.65, 1.0)));
    }

    #[test]
    fn normal_mixes_by_alpha() {
        let out = composite(BlendMode::Normal, DST, SRC, 0.25);
        assert!(close(out, Vec3::new(0.275, 0.425, 0.7)));
    }

    #[test]
    fn multiply_ignores_alpha() {
        let out = composite(BlendMode::Multiply, DST, SRC, 0.0);
        assert!(close(out, Vec3::new(0.1, 0.2, 0.6)));
    }

    #[test]
    fn screen_brightens() {
        let out = composite(BlendMode::Screen, DST, SRC, 1.0);
        assert!(close(out, Vec3::new(0.6, 0.7, 1.0)));
    }

    #[test]
    fn subtractive_darkens_by_source() {
        let out = composite(BlendMode::Subtractive, DST, SRC, 1.0);
        assert!(close(out, Vec3::new(0.1, 0.2, 0.0)));
    }

    #[test]
    fn overbright_inputs_are_clamped() {
        // glow colours are brightened past 1.0 and glow alpha can exceed 1.0
        let out = composite(BlendMode::Additive, Vec3::ZERO, Vec3::splat(1.3), 2.5);
        assert!(close(out, Vec3::ONE));
    }
}
