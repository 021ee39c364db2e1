//! Thermal palette evaluation.
//!
//! A palette is a closed ring of colour stops. Progress values wrap modulo 1
//! and the last stop blends back into the first across the seam, so the last
//! stop may carry its own colour (the ring-closing blue in the thermal ramp).

use glam::Vec3;

use crate::math::fract;

/// Gap enforced between consecutive stop positions by [`repair_stops`].
pub const STOP_EPSILON: f32 = 0.0001;

/// Lower bound on a segment width when computing the local fraction.
const MIN_SEGMENT: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub color: Vec3,
}

impl ColorStop {
    pub fn new(position: f32, color: Vec3) -> Self {
        Self { position, color }
    }
}

/// Nudges every position that is `<=` its predecessor to predecessor + ε.
///
/// Returns how many positions were moved. Running it twice changes nothing.
pub fn repair_stops(positions: &mut [f32]) -> usize {
    let mut nudged = 0;
    for index in 1..positions.len() {
        let previous = positions[index - 1];
        if positions[index] <= previous {
            positions[index] = previous + STOP_EPSILON;
            nudged += 1;
        }
    }
    nudged
}

/// Maps `t` onto the ring of `stops`.
///
/// The first segment containing `t` wins. Segments that wrap (`a > b`) cover
/// `t >= a` and `t < b`. If no segment matches the last one is used.
pub fn evaluate(t: f32, stops: &[ColorStop]) -> Vec3 {
    let count = stops.len();
    match count {
        0 => return Vec3::ZERO,
        1 => return stops[0].color,
        _ => {}
    }

    let t = fract(t);
    let segment = (0..count)
        .find(|&index| {
            let a = stops[index].position;
            let b = stops[(index + 1) % count].position;
            (a < b && t >= a && t < b) || (a > b && (t >= a || t < b))
        })
        .unwrap_or(count - 1);

    let from = stops[segment];
    let to = stops[(segment + 1) % count];
    let (a, b) = (from.position, to.position);
    let range = if b > a { b - a } else { b + 1.0 - a };
    let offset = if t >= a { t - a } else { t + 1.0 - a };
    let local = (offset / range.max(MIN_SEGMENT)).clamp(0.0, 1.0);
    from.color.lerp(to.color, local)
}

/// Ordered ring of colour stops with positions already repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<ColorStop>,
}

impl Palette {
    /// Builds a palette, repairing stop order in place.
    pub fn new(mut stops: Vec<ColorStop>) -> Self {
        let mut positions: Vec<f32> = stops.iter().map(|stop| stop.position).collect();
        let nudged = repair_stops(&mut positions);
        if nudged > 0 {
            tracing::trace!(nudged, "repaired out-of-order colour stops");
            for (stop, position) in stops.iter_mut().zip(positions) {
                stop.position = position;
            }
        }
        Self { stops }
    }

    /// Six-stop thermal ramp: blue, cyan, yellow, orange, red, closing blue.
    pub fn thermal(positions: [f32; 6], colors: [Vec3; 6]) -> Self {
        Self::new(
            positions
                .into_iter()
                .zip(colors)
                .map(|(position, color)| ColorStop::new(position, color))
                .collect(),
        )
    }

    /// Blue, yellow, red ramp used by the procedural shape variant.
    pub fn tricolor() -> Self {
        Self::new(vec![
            ColorStop::new(0.0, Vec3::new(0.0, 0.0, 1.0)),
            ColorStop::new(0.5, Vec3::new(1.0, 1.0, 0.0)),
            ColorStop::new(1.0, Vec3::new(1.0, 0.0, 0.0)),
        ])
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn evaluate(&self, t: f32) -> Vec3 {
        evaluate(t, &self.stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: Vec3 = Vec3::new(0.0, 0.0, 105.0 / 255.0);
    const CYAN: Vec3 = Vec3::new(0.0, 60.0 / 255.0, 1.0);
    const YELLOW: Vec3 = Vec3::new(0.0, 1.0, 1.0);
    const ORANGE: Vec3 = Vec3::new(1.0, 225.0 / 255.0, 0.0);
    const RED: Vec3 = Vec3::new(245.0 / 255.0, 60.0 / 255.0, 35.0 / 255.0);
    const BLUE2: Vec3 = Vec3::new(0.0, 0.0, 0.5);

    fn quarter_palette() -> Palette {
        Palette::thermal(
            [0.0, 0.25, 0.5, 0.75, 0.9, 1.0],
            [BLUE, CYAN, YELLOW, ORANGE, RED, BLUE2],
        )
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn stop_positions_return_exact_colours() {
        let palette = quarter_palette();
        assert_eq!(palette.evaluate(0.0), BLUE);
        assert_eq!(palette.evaluate(0.25), CYAN);
        assert_eq!(palette.evaluate(0.5), YELLOW);
        assert_eq!(palette.evaluate(0.75), ORANGE);
        assert_eq!(palette.evaluate(0.9), RED);
    }

    #[test]
    fn interior_values_lie_between_neighbours() {
        let palette = quarter_palette();
        let stops = palette.stops();
        for step in 1..200 {
            let t = step as f32 / 200.0;
            let index = stops
                .windows(2)
                .position(|pair| t > pair[0].position && t < pair[1].position);
            let Some(index) = index else { continue };
            let color = palette.evaluate(t);
            let lo = stops[index].color.min(stops[index + 1].color);
            let hi = stops[index].color.max(stops[index + 1].color);
            assert!(color.cmpge(lo - 1e-6).all() && color.cmple(hi + 1e-6).all());
        }
    }

    #[test]
    fn sixty_percent_sits_forty_percent_into_its_segment() {
        let palette = quarter_palette();
        let color = palette.evaluate(0.6);
        assert!(close(color, YELLOW.lerp(ORANGE, 0.4)));
        // nearer the segment start than its end
        assert!(color.distance(YELLOW) < color.distance(ORANGE));
    }

    #[test]
    fn evaluation_is_periodic() {
        let palette = quarter_palette();
        for step in 0..64 {
            let t = step as f32 / 64.0;
            assert_eq!(palette.evaluate(t), palette.evaluate(t + 1.0));
            assert_eq!(palette.evaluate(t), palette.evaluate(t - 3.0));
        }
        for t in [0.13_f32, 0.37, 0.61, 0.93] {
            assert!(close(palette.evaluate(t), palette.evaluate(t + 1.0)));
        }
    }

    #[test]
    fn wrapping_segment_blends_across_the_seam() {
        let palette = Palette::thermal(
            [0.05, 0.42, 0.81, 0.85, 0.95, 1.0],
            [BLUE, CYAN, YELLOW, ORANGE, RED, BLUE2],
        );
        // segment 5 runs from 1.0 across the seam to 0.05
        assert!(close(palette.evaluate(0.0), BLUE2.lerp(BLUE, 0.0 / 0.05)));
        assert!(close(palette.evaluate(0.025), BLUE2.lerp(BLUE, 0.5)));
    }

    #[test]
    fn repair_enforces_strict_order() {
        let mut positions = [0.5, 0.4, 0.4, 0.9, 0.1, 1.0];
        let nudged = repair_stops(&mut positions);
        assert_eq!(nudged, 3);
        for pair in positions.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!((positions[1] - 0.5001).abs() < 1e-6);
    }

    #[test]
    fn repair_is_idempotent() {
        let mut once = [0.3, 0.3, 0.2, 0.2, 0.95, 0.95];
        repair_stops(&mut once);
        let mut twice = once;
        assert_eq!(repair_stops(&mut twice), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn collapsed_segments_still_return_a_colour() {
        let palette = Palette::thermal(
            [0.5, 0.5, 0.5, 0.5, 0.5, 0.5],
            [BLUE, CYAN, YELLOW, ORANGE, RED, BLUE2],
        );
        for step in 0..20 {
            let color = palette.evaluate(step as f32 / 20.0);
            assert!(color.is_finite());
        }
    }

    #[test]
    fn unmatched_progress_falls_back_to_last_segment() {
        // unrepaired, all segments are empty
        let stops = [
            ColorStop::new(0.6, BLUE),
            ColorStop::new(0.6, CYAN),
            ColorStop::new(0.6, RED),
        ];
        assert!(close(evaluate(0.5, &stops), RED.lerp(BLUE, 0.9)));
    }
}
