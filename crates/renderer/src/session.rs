//! Window-independent state of a preview session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thermal::{FrameSnapshot, ParameterStore, Shape, ShapeSource, Variant};
use tracing::{debug, info, warn};

use crate::catalog::MaskCatalog;
use crate::controls::{self, Action, Effect};
use crate::export::{self, ExportError, ExportRequest, ExportSettings};
use crate::layout::PlaneSize;
use crate::loader::{LoaderEvent, MaskLoadError, MaskLoader, MaskSource};
use crate::scene::Scene;
use crate::types::RendererConfig;

/// What a finished session leaves behind, for persisting app state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub mask_index: usize,
    pub theme: Option<String>,
    pub exports: Vec<PathBuf>,
}

pub struct Session {
    variant: Variant,
    shape: Shape,
    parameters: ParameterStore,
    catalog: MaskCatalog,
    scene: Scene,
    loader: MaskLoader,
    export: ExportSettings,
    exports: Vec<PathBuf>,
}

impl Session {
    pub fn new(config: RendererConfig, loader: MaskLoader) -> Self {
        let (width, height) = config.surface_size;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            variant: config.variant,
            shape: config.shape,
            parameters: config.parameters,
            catalog: config.catalog,
            scene: Scene::new(aspect),
            loader,
            export: config.export,
            exports: Vec::new(),
        }
    }

    pub fn uses_mask(&self) -> bool {
        self.variant.shape == ShapeSource::TextureMask
    }

    /// Queues the first mask: the upload if given and valid, otherwise the
    /// catalogue's current entry.
    pub fn start(&mut self, upload: Option<PathBuf>) {
        if !self.uses_mask() {
            return;
        }
        if let Some(path) = upload {
            if self.request_mask(MaskSource::Upload(path)).is_ok() {
                return;
            }
        }
        let source = self.catalog.current_source();
        let _ = self.request_mask(source);
    }

    /// Starts a background load. Rejected requests are logged and leave the
    /// session untouched.
    pub fn request_mask(&mut self, source: MaskSource) -> Result<u64, MaskLoadError> {
        let label = source.label();
        self.loader.request(source).map_err(|err| {
            warn!(source = %label, error = %err, "mask request rejected");
            err
        })
    }

    /// Applies finished loads. Returns whether the frame needs redrawing.
    pub fn poll(&mut self, now: Instant) -> bool {
        let events = self.loader.poll(now);
        let changed = !events.is_empty();
        for event in events {
            self.handle_loader_event(event);
        }
        changed
    }

    /// Blocks until the pending mask resolves, for headless callers.
    /// Returns whether a new mask was applied.
    pub fn wait_for_mask(&mut self, timeout: Duration) -> bool {
        self.loader
            .wait(timeout)
            .is_some_and(|event| self.handle_loader_event(event))
    }

    fn handle_loader_event(&mut self, event: LoaderEvent) -> bool {
        match event {
            LoaderEvent::Loaded { source, mask, .. } => {
                if let MaskSource::Bundled { index, .. } = source {
                    self.catalog.select(index);
                }
                let generation = self.scene.replace_mask(source, mask);
                debug!(generation, "scene updated");
                true
            }
            LoaderEvent::Failed { source, error, .. } => {
                warn!(source = %source.label(), error = %error, "mask failed to load; keeping previous mask");
                false
            }
            LoaderEvent::FailsafeExpired { .. } => {
                self.scene.fall_back_to_square();
                false
            }
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.scene.set_viewport(width, height);
    }

    pub fn apply(&mut self, action: Action) -> Effect {
        let effect = controls::apply(action, &mut self.parameters, &mut self.catalog);
        if let Effect::LoadMask(source) = &effect {
            let _ = self.request_mask(source.clone());
        }
        effect
    }

    pub fn snapshot(&self, time: f32) -> FrameSnapshot {
        self.parameters.snapshot(time, &self.variant)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn title(&self) -> String {
        let mask = if self.uses_mask() {
            self.scene.source().map(MaskSource::label)
        } else {
            Some(self.shape.name().to_string())
        };
        controls::window_title(mask.as_deref(), self.parameters.theme(), self.is_loading())
    }

    /// Writes the frame at `time` as a branded PNG.
    pub fn export(&mut self, time: f32) -> Result<PathBuf, ExportError> {
        let snapshot = self.snapshot(time);
        let request = ExportRequest {
            snapshot: &snapshot,
            mask: self.scene.mask().map(Arc::as_ref),
            plane: self.scene.plane().unwrap_or(PlaneSize::SQUARE),
            shape: self.shape,
            swatches: self.parameters.colors().primaries(),
        };
        let path = export::export_frame(&request, &self.export)?;
        info!(path = %path.display(), "export saved");
        self.exports.push(path.clone());
        Ok(path)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            mask_index: self.catalog.current(),
            theme: self.parameters.theme().map(str::to_string),
            exports: self.exports.clone(),
        }
    }
}
