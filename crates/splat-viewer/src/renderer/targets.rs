//! Depth attachment sized to the drawable, plus the per-frame target views
//! handed to models.

use glam::UVec2;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct DepthTarget {
    // Kept alive for the lifetime of the view.
    _tex: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: UVec2,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, size: UVec2) -> Self {
        // Zero-sized textures are invalid.
        let size = size.max(UVec2::ONE);

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Target"),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            view: tex.create_view(&wgpu::TextureViewDescriptor::default()),
            _tex: tex,
            size,
        }
    }

    /// Recreates the texture if the drawable changed size.
    pub fn ensure_size(&mut self, device: &wgpu::Device, size: UVec2) {
        if self.size != size.max(UVec2::ONE) {
            *self = Self::new(device, size);
        }
    }
}

/// Attachments a model draws into. Both are already cleared for the frame.
pub struct RenderTargets<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

impl RenderTargets<'_> {
    /// Opens a pass that keeps what earlier passes wrote this frame.
    pub fn begin_load_pass<'p>(
        &'p self,
        encoder: &'p mut wgpu::CommandEncoder,
        label: &str,
    ) -> wgpu::RenderPass<'p> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}
