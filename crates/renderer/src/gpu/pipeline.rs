use std::collections::HashMap;

use thermal::BlendMode;

use crate::compile::{compile_fragment_shader, compile_vertex_shader, FragmentProgram};

pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub mask_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let mask_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mask layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lava pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &mask_layout],
            push_constant_ranges: &[],
        });

        Self {
            uniform_layout,
            mask_layout,
            pipeline_layout,
            vertex_module: compile_vertex_shader(device),
        }
    }
}

/// Colour blend factors reproducing [`crate::blend::composite`] on the
/// render target. Alpha is left at whatever the clear wrote.
pub(crate) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::BlendFactor as F;

    let (src_factor, dst_factor) = match mode {
        BlendMode::Additive => (F::SrcAlpha, F::One),
        BlendMode::Normal => (F::SrcAlpha, F::OneMinusSrcAlpha),
        BlendMode::Multiply => (F::Zero, F::Src),
        BlendMode::Screen => (F::One, F::OneMinusSrc),
        BlendMode::Subtractive => (F::Zero, F::OneMinusSrc),
    };
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor,
            dst_factor,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: F::Zero,
            dst_factor: F::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct PipelineTarget {
    format: wgpu::TextureFormat,
    sample_count: u32,
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    target: &PipelineTarget,
    fragment: &wgpu::ShaderModule,
    label: &str,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: target.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// Gradient pipeline plus one glow pipeline per blend mode, built lazily.
pub(crate) struct LavaPipelines {
    target: PipelineTarget,
    pub gradient: wgpu::RenderPipeline,
    glow_module: wgpu::ShaderModule,
    glow: HashMap<BlendMode, wgpu::RenderPipeline>,
}

impl LavaPipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let target = PipelineTarget {
            format,
            sample_count,
        };
        let gradient_module = compile_fragment_shader(device, FragmentProgram::Gradient);
        let gradient = build_pipeline(
            device,
            layouts,
            &target,
            &gradient_module,
            "gradient pipeline",
            blend_state(BlendMode::Additive),
        );
        Self {
            target,
            gradient,
            glow_module: compile_fragment_shader(device, FragmentProgram::Glow),
            glow: HashMap::new(),
        }
    }

    pub fn glow(
        &mut self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        mode: BlendMode,
    ) -> &wgpu::RenderPipeline {
        let Self {
            target,
            glow_module,
            glow,
            ..
        } = self;
        glow.entry(mode).or_insert_with(|| {
            tracing::debug!(%mode, "building glow pipeline");
            build_pipeline(
                device,
                layouts,
                target,
                glow_module,
                &format!("glow pipeline ({mode})"),
                blend_state(mode),
            )
        })
    }
}
