//! GPU preview path.
//!
//! - `context` owns the wgpu instance, device and surface and reconfigures the
//!   swapchain on resize.
//! - `pipeline` builds the gradient pipeline and one glow pipeline per blend
//!   mode over a shared layout (uniforms in set 0, mask in set 1).
//! - `uniforms` packs a `FrameSnapshot` into the std140 block the shaders read.
//! - `resources` holds the uploaded mask texture for the current scene
//!   generation.
//! - `state` ties them together as `GpuState`, which the window drives.

mod context;
mod pipeline;
mod resources;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
