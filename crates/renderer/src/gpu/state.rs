use std::iter;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use thermal::{FrameSnapshot, Shape};
use winit::dpi::PhysicalSize;

use crate::layout::PlaneSize;
use crate::scene::Scene;
use crate::types::{Antialiasing, ColorSpaceMode};

use super::context::GpuContext;
use super::pipeline::{LavaPipelines, PipelineLayouts};
use super::resources::SceneResources;
use super::uniforms::LavaUniforms;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Window-side renderer: surface, pipelines and the uploaded mask.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipelines: LavaPipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    multisample_target: Option<MultisampleTarget>,
    resources: SceneResources,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing, color_space)?;
        let device = &context.device;

        let layouts = PipelineLayouts::new(device);
        let pipelines = LavaPipelines::new(
            device,
            &layouts,
            context.surface_format,
            context.sample_count,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lava uniforms"),
            size: std::mem::size_of::<LavaUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        let resources = SceneResources::placeholder(device, &context.queue, &layouts.mask_layout);

        Ok(Self {
            context,
            layouts,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            multisample_target,
            resources,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        if self.context.sample_count > 1 {
            self.multisample_target = Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                new_size,
                self.context.sample_count,
            ));
        }
    }

    /// Re-uploads the mask when the scene moved on since the last upload.
    fn sync_mask(&mut self, scene: &Scene) {
        if self.resources.generation == scene.generation() {
            return;
        }
        let Some(mask) = scene.mask() else {
            return;
        };
        let next = SceneResources::upload(
            &self.context.device,
            &self.context.queue,
            &self.layouts.mask_layout,
            mask,
            scene.generation(),
        );
        std::mem::replace(&mut self.resources, next).release();
    }

    pub(crate) fn render(
        &mut self,
        snapshot: &FrameSnapshot,
        scene: &Scene,
        shape: Shape,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.sync_mask(scene);
        let plane = scene.plane().unwrap_or(PlaneSize::SQUARE);
        let uniforms = LavaUniforms::new(snapshot, self.context.size, scene.camera(), plane, shape);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // a mask variant with nothing loaded yet shows a black frame
        let mask_pending = snapshot.variant.shape == thermal::ShapeSource::TextureMask
            && scene.mask().is_none();

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.encode_pass(
            &mut encoder,
            &view,
            Pass::Gradient,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            mask_pending,
        );
        if snapshot.variant.glow && !mask_pending {
            self.encode_pass(
                &mut encoder,
                &view,
                Pass::Glow(snapshot.glow.blend_mode),
                wgpu::LoadOp::Load,
                false,
            );
        }
        self.context.queue.submit(iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn encode_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        pass: Pass,
        load: wgpu::LoadOp<wgpu::Color>,
        clear_only: bool,
    ) {
        let pipeline = match pass {
            Pass::Gradient => &self.pipelines.gradient,
            Pass::Glow(mode) => self
                .pipelines
                .glow(&self.context.device, &self.layouts, mode),
        };
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(view)),
            None => (view, None),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment_view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if clear_only {
            return;
        }
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &self.resources.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[derive(Clone, Copy, Debug)]
enum Pass {
    Gradient,
    Glow(thermal::BlendMode),
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::Gradient => "gradient pass",
            Pass::Glow(_) => "glow pass",
        }
    }
}
