//! Plane sizing and the fixed preview camera.
//!
//! The gradient is drawn on a plane centred at the origin; the glow plane
//! sits slightly in front of it. Both are viewed by a perspective camera on
//! the +z axis looking at the origin.

use glam::Vec2;

pub const CAMERA_FOV_Y_DEGREES: f32 = 70.0;
pub const CAMERA_DISTANCE: f32 = 2.5;
/// Depth of the glow plane in front of the gradient plane.
pub const GLOW_PLANE_OFFSET: f32 = 0.01;
/// Longest plane side when meshes are first created.
pub const INITIAL_MAX_SIZE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSize {
    pub width: f32,
    pub height: f32,
}

impl PlaneSize {
    pub const SQUARE: PlaneSize = PlaneSize {
        width: INITIAL_MAX_SIZE,
        height: INITIAL_MAX_SIZE,
    };
}

/// Replaces unusable aspect ratios with a square.
pub fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

fn size_for(mask_aspect: f32, max_size: f32) -> PlaneSize {
    if mask_aspect >= 1.0 {
        PlaneSize {
            width: max_size,
            height: max_size / mask_aspect,
        }
    } else {
        PlaneSize {
            width: max_size * mask_aspect,
            height: max_size,
        }
    }
}

/// Plane size used when the meshes are first built, before any viewport
/// adjustment.
pub fn initial_plane(mask_aspect: f32) -> PlaneSize {
    size_for(sanitize_aspect(mask_aspect), INITIAL_MAX_SIZE)
}

/// Plane size for a mask shown in a viewport of the given aspect.
pub fn fit_plane(mask_aspect: f32, viewport_aspect: f32) -> PlaneSize {
    let mask_aspect = sanitize_aspect(mask_aspect);
    let viewport_aspect = sanitize_aspect(viewport_aspect);
    let max_size = if viewport_aspect < 1.0 {
        2.5
    } else if viewport_aspect < 1.2 {
        2.8
    } else {
        3.0
    };

    let mut size = size_for(mask_aspect, max_size);
    let narrow = viewport_aspect < 1.0;
    if mask_aspect >= 1.0 {
        if size.height > max_size * 0.8 && narrow {
            size.height = max_size * 0.8;
            size.width = size.height * mask_aspect;
        }
    } else if size.width > max_size * 0.8 && narrow {
        size.width = max_size * 0.8;
        size.height = size.width / mask_aspect;
    }
    size
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_y_degrees: f32,
    pub distance: f32,
    /// Viewport width over height.
    pub aspect: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_y_degrees: CAMERA_FOV_Y_DEGREES,
            distance: CAMERA_DISTANCE,
            aspect: sanitize_aspect(aspect),
        }
    }

    /// Half the visible height of a plane at depth `z`.
    pub fn half_height_at(&self, z: f32) -> f32 {
        (self.distance - z) * (self.fov_y_degrees.to_radians() * 0.5).tan()
    }

    /// World-space point on the plane at depth `z` seen through `ndc`.
    pub fn unproject(&self, ndc: Vec2, z: f32) -> Vec2 {
        let half_height = self.half_height_at(z);
        Vec2::new(ndc.x * half_height * self.aspect, ndc.y * half_height)
    }
}

/// Texture coordinate of `point` on a centred plane, if it lands on it.
pub fn plane_uv(point: Vec2, plane: PlaneSize) -> Option<Vec2> {
    let uv = Vec2::new(point.x / plane.width + 0.5, point.y / plane.height + 0.5);
    let inside = (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y);
    inside.then_some(uv)
}
