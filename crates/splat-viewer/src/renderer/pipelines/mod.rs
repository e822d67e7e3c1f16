//! Render pipelines shared by every model, and the per-view uniform block
//! they all bind at group 0.

pub mod colored_mesh;
pub mod splat;

use self::{colored_mesh::ColoredMeshPipeline, splat::SplatPipeline};
use crate::camera::ViewportDescriptor;
use glam::Mat4;

/// Per-view uniforms, std140. Must match `ViewUniform` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewUniform {
    pub view: Mat4,          // 64 B
    pub projection: Mat4,    // +64
    pub viewport: [f32; 2],  // +8
    pub _pad: [f32; 2],      // +8 -> 144
}

const _: [(); 144] = [(); core::mem::size_of::<ViewUniform>()];

impl From<&ViewportDescriptor> for ViewUniform {
    fn from(desc: &ViewportDescriptor) -> Self {
        Self {
            view: desc.view,
            projection: desc.projection,
            viewport: [desc.viewport.width, desc.viewport.height],
            _pad: [0.0; 2],
        }
    }
}

pub fn view_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("View UBO Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<ViewUniform>() as u64,
                ),
            },
            count: None,
        }],
    })
}

struct ViewSlot {
    ubo: wgpu::Buffer,
    bind: wgpu::BindGroup,
}

/// One uniform buffer per view, grown on demand. Each view of a frame gets
/// its own slot so later views do not overwrite earlier ones before submit.
#[derive(Default)]
pub struct ViewBindings {
    slots: Vec<ViewSlot>,
}

impl ViewBindings {
    /// Writes `views` into their slots and returns the bind groups in order.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        views: &[ViewportDescriptor],
    ) -> Vec<&wgpu::BindGroup> {
        while self.slots.len() < views.len() {
            let ubo = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("View UBO"),
                size: std::mem::size_of::<ViewUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("View BindGroup"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                }],
            });
            self.slots.push(ViewSlot { ubo, bind });
        }

        for (slot, desc) in self.slots.iter().zip(views) {
            queue.write_buffer(&slot.ubo, 0, bytemuck::bytes_of(&ViewUniform::from(desc)));
        }

        self.slots.iter().take(views.len()).map(|s| &s.bind).collect()
    }
}

/// Applies a descriptor's viewport rect to a pass.
pub fn set_viewport(pass: &mut wgpu::RenderPass<'_>, desc: &ViewportDescriptor) {
    let v = &desc.viewport;
    pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
}

/// Every pipeline a model may draw with, built once per device.
pub struct Pipelines {
    pub view_layout: wgpu::BindGroupLayout,
    pub points: ColoredMeshPipeline,
    pub triangles: ColoredMeshPipeline,
    pub splats: SplatPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let view_layout = view_layout(device);
        let points = ColoredMeshPipeline::new(
            device,
            &view_layout,
            color_fmt,
            depth_fmt,
            wgpu::PrimitiveTopology::PointList,
        );
        let triangles = ColoredMeshPipeline::new(
            device,
            &view_layout,
            color_fmt,
            depth_fmt,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let splats = SplatPipeline::new(device, &view_layout, color_fmt, depth_fmt);

        Self {
            view_layout,
            points,
            triangles,
            splats,
        }
    }
}
