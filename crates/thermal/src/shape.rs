use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Procedural solids shaded by [`GradientField::shade_shape`](crate::GradientField::shade_shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Radius 1.5.
    #[default]
    Sphere,
    /// Edge length 2.
    Cube,
    /// Radius 1.5.
    Octahedron,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Sphere, Shape::Cube, Shape::Octahedron];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Cube => "cube",
            Shape::Octahedron => "octahedron",
        }
    }

    /// Half-width of the silhouette seen head-on.
    pub fn extent(self) -> f32 {
        match self {
            Shape::Sphere | Shape::Octahedron => 1.5,
            Shape::Cube => 1.0,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Shape::Sphere => Shape::Cube,
            Shape::Cube => Shape::Octahedron,
            Shape::Octahedron => Shape::Sphere,
        }
    }

    /// Nearest surface point along the view ray through `xy`, looking down -z.
    pub fn front_surface(self, xy: Vec2) -> Option<Vec3> {
        match self {
            Shape::Sphere => {
                let depth = 1.5 * 1.5 - xy.length_squared();
                (depth >= 0.0).then(|| xy.extend(depth.sqrt()))
            }
            Shape::Cube => (xy.x.abs() <= 1.0 && xy.y.abs() <= 1.0).then(|| xy.extend(1.0)),
            Shape::Octahedron => {
                let depth = 1.5 - xy.x.abs() - xy.y.abs();
                (depth >= 0.0).then(|| xy.extend(depth))
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Shape::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown shape '{wanted}' (expected sphere, cube, or octahedron)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_surfaces_lie_on_their_solids() {
        let probe = Vec2::new(0.4, -0.3);
        let sphere = Shape::Sphere.front_surface(probe).unwrap();
        assert!((sphere.length() - 1.5).abs() < 1e-5);
        let cube = Shape::Cube.front_surface(probe).unwrap();
        assert_eq!(cube.z, 1.0);
        let octahedron = Shape::Octahedron.front_surface(probe).unwrap();
        assert!((octahedron.x.abs() + octahedron.y.abs() + octahedron.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn rays_outside_the_silhouette_miss() {
        for shape in Shape::ALL {
            let outside = Vec2::splat(shape.extent() + 0.01);
            assert!(shape.front_surface(outside).is_none(), "{shape}");
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Cube".parse::<Shape>().unwrap(), Shape::Cube);
        assert!("torus".parse::<Shape>().is_err());
    }
}
