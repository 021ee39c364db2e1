use std::sync::Arc;

use tracing::debug;

use crate::layout::{self, Camera, PlaneSize};
use crate::loader::MaskSource;
use crate::mask::MaskImage;

/// Owns the current mask and the plane it is drawn on.
///
/// The GPU side keeps its own texture for the mask and compares
/// [`Scene::generation`] against what it uploaded to know when to rebuild.
#[derive(Debug)]
pub struct Scene {
    mask: Option<Arc<MaskImage>>,
    source: Option<MaskSource>,
    /// `None` until the first mask (or fallback) creates the meshes.
    plane: Option<PlaneSize>,
    camera: Camera,
    generation: u64,
}

impl Scene {
    pub fn new(viewport_aspect: f32) -> Self {
        Self {
            mask: None,
            source: None,
            plane: None,
            camera: Camera::new(viewport_aspect),
            generation: 0,
        }
    }

    pub fn mask(&self) -> Option<&Arc<MaskImage>> {
        self.mask.as_ref()
    }

    pub fn source(&self) -> Option<&MaskSource> {
        self.source.as_ref()
    }

    pub fn plane(&self) -> Option<PlaneSize> {
        self.plane
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Bumped every time the mask is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn resize_plane(&mut self, mask_aspect: f32) {
        let plane = match self.plane {
            None => layout::initial_plane(mask_aspect),
            Some(_) => layout::fit_plane(mask_aspect, self.camera.aspect),
        };
        debug!(
            mask_aspect,
            width = plane.width,
            height = plane.height,
            "plane resized"
        );
        self.plane = Some(plane);
    }

    /// Swaps in a freshly decoded mask and resizes the plane to its aspect.
    pub fn replace_mask(&mut self, source: MaskSource, mask: Arc<MaskImage>) -> u64 {
        self.resize_plane(mask.aspect());
        self.mask = Some(mask);
        self.source = Some(source);
        self.generation += 1;
        self.generation
    }

    /// Used when a mask's aspect cannot be determined; the mask is kept.
    pub fn fall_back_to_square(&mut self) {
        self.resize_plane(1.0);
    }

    /// Follows a viewport change, refitting the plane if a mask is shown.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera = Camera::new(width as f32 / height as f32);
        if let Some(mask) = &self.mask {
            let aspect = mask.aspect();
            self.plane = Some(layout::fit_plane(aspect, self.camera.aspect));
        }
    }
}
