use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::mask::MaskImage;

/// GPU copy of the current mask and the bind group that exposes it.
///
/// Field order matters: the bind group is dropped before the texture it
/// references.
pub(crate) struct SceneResources {
    pub bind_group: wgpu::BindGroup,
    _view: wgpu::TextureView,
    texture: wgpu::Texture,
    /// Scene generation this upload belongs to; 0 for the placeholder.
    pub generation: u64,
}

fn create_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("mask sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

impl SceneResources {
    /// Black 1x1 texture bound until the first mask arrives.
    pub fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self::from_rgba(device, queue, layout, 1, 1, &[0, 0, 0, 255], 0)
    }

    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        mask: &MaskImage,
        generation: u64,
    ) -> Self {
        let (width, height) = mask.dimensions();
        tracing::debug!(width, height, generation, "uploading mask texture");
        Self::from_rgba(device, queue, layout, width, height, mask.rgba().as_raw(), generation)
    }

    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        width: u32,
        height: u32,
        data: &[u8],
        generation: u64,
    ) -> Self {
        // rows are already bottom-up, so v = 0 is the bottom of the image
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("mask texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mask bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        Self {
            bind_group,
            _view: view,
            texture,
            generation,
        }
    }

    /// Frees the texture memory now instead of when the last reference goes.
    pub fn release(self) {
        let Self {
            bind_group,
            _view,
            texture,
            ..
        } = self;
        drop(bind_group);
        drop(_view);
        texture.destroy();
    }
}
