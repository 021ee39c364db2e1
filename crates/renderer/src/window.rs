use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::controls::{self, Effect};
use crate::gpu::GpuState;
use crate::loader::{MaskLoadError, MaskLoader, MaskSource};
use crate::runtime::{time_source_for_policy, BoxedTimeSource, FrameScheduler, RenderPolicy, TimeSample};
use crate::session::{Session, SessionSummary};
use crate::types::RendererConfig;

/// Wakes the event loop from the mask worker thread.
#[derive(Debug, Clone, Copy)]
enum UserEvent {
    MaskReady,
}

pub(crate) struct RenderPolicyDriver {
    scheduler: FrameScheduler,
    time_source: BoxedTimeSource,
    last_sample: TimeSample,
}

impl RenderPolicyDriver {
    pub(crate) fn new(policy: RenderPolicy) -> Self {
        Self {
            time_source: time_source_for_policy(&policy),
            scheduler: FrameScheduler::new(policy),
            last_sample: TimeSample::new(0.0, 0),
        }
    }

    pub(crate) fn sample(&mut self) -> TimeSample {
        self.last_sample = self.time_source.sample();
        self.last_sample
    }

    /// Time of the frame currently on screen.
    pub(crate) fn last_sample(&self) -> TimeSample {
        self.last_sample
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.scheduler.mark_rendered(Instant::now());
    }

    pub(crate) fn invalidate(&mut self) {
        self.scheduler.invalidate();
    }

    pub(crate) fn ready_for_frame(&self, now: Instant) -> bool {
        self.scheduler.ready_for_frame(now)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }
}

struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    session: Session,
    title: String,
}

impl WindowState {
    fn refresh_title(&mut self) {
        let title = self.session.title();
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
        self.session.set_viewport(size.width, size.height);
    }

    fn render(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        let snapshot = self.session.snapshot(sample.seconds);
        self.gpu
            .render(&snapshot, self.session.scene(), self.session.shape())
    }
}

/// Opens the preview window and runs until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<SessionSummary> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!(MaskLoadError::MissingTarget(format!("event loop: {err}"))))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("neue-lava")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!(MaskLoadError::MissingTarget(format!("preview window: {err}"))))?;
    let window = Arc::new(window);

    let gpu = GpuState::new(
        window.as_ref(),
        window.inner_size(),
        config.antialiasing,
        config.color_space,
    )
    .map_err(|err| anyhow!(MaskLoadError::MissingTarget(format!("render surface: {err:#}"))))?;

    let proxy = Mutex::new(proxy);
    let loader = MaskLoader::new(config.loader).with_notifier(move || {
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(UserEvent::MaskReady);
        }
    });
    let upload = config.upload.clone();
    let mut policy = RenderPolicyDriver::new(config.policy.clone());
    let mut session = Session::new(config, loader);
    let size = gpu.size();
    session.set_viewport(size.width, size.height);
    session.start(upload);

    let mut state = WindowState {
        window,
        gpu,
        session,
        title: String::new(),
    };
    state.refresh_title();
    info!(title = %state.title, "preview window open");

    let run_result = event_loop.run(|event, elwt| match event {
        Event::UserEvent(UserEvent::MaskReady) => {
            if state.session.poll(Instant::now()) {
                policy.invalidate();
                state.refresh_title();
                state.window.request_redraw();
            }
        }
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let Some(action) = controls::action_for_key(&event.logical_key) else {
                    return;
                };
                match state.session.apply(action) {
                    Effect::Quit => elwt.exit(),
                    Effect::Export => {
                        let time = policy.last_sample().seconds;
                        if let Err(err) = state.session.export(time) {
                            error!(error = %err, "export failed");
                        }
                    }
                    Effect::Redraw | Effect::LoadMask(_) => {
                        policy.invalidate();
                        state.refresh_title();
                        state.window.request_redraw();
                    }
                }
            }
            WindowEvent::DroppedFile(path) => {
                if state.session.request_mask(MaskSource::Upload(path)).is_ok() {
                    state.refresh_title();
                }
            }
            WindowEvent::Resized(new_size) => {
                state.resize(new_size);
                policy.invalidate();
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let _ = inner_size_writer.request_inner_size(state.gpu.size());
            }
            WindowEvent::RedrawRequested => match state.render(policy.sample()) {
                Ok(()) => policy.mark_rendered(),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.gpu.size();
                    state.resize(size);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("surface out of memory; closing preview");
                    elwt.exit();
                }
                Err(other) => warn!(error = ?other, "surface error; retrying next frame"),
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            // the failsafe has to fire even when no worker ever reports back
            if state.session.is_loading() && state.session.poll(now) {
                policy.invalidate();
                state.refresh_title();
            }
            if policy.ready_for_frame(now) {
                state.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = policy.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else if state.session.is_loading() {
                let failsafe = now + Duration::from_millis(250);
                elwt.set_control_flow(ControlFlow::WaitUntil(failsafe));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    Ok(state.session.summary())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_policy_redraws_only_after_invalidation() {
        let mut driver = RenderPolicyDriver::new(RenderPolicy::Still { time: Some(2.5) });
        assert!(driver.ready_for_frame(Instant::now()));
        assert_eq!(driver.sample().seconds, 2.5);
        driver.mark_rendered();
        assert!(!driver.ready_for_frame(Instant::now()));
        driver.invalidate();
        assert!(driver.ready_for_frame(Instant::now()));
        assert_eq!(driver.last_sample().seconds, 2.5);
    }

    #[test]
    fn capped_animation_waits_for_its_deadline() {
        let mut driver = RenderPolicyDriver::new(RenderPolicy::Animate {
            target_fps: Some(8.0),
        });
        driver.mark_rendered();
        let deadline = driver.next_deadline().unwrap();
        assert!(!driver.ready_for_frame(deadline - Duration::from_millis(1)));
        assert!(driver.ready_for_frame(deadline));
    }
}
