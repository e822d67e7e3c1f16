//! Screen-space gaussian quads, blended back to front.

use glam::{Mat3, Quat, Vec3};
use pointfile::Splat;

/// GPU form of a splat: 3D covariance precomputed, color normalised.
/// Must match `SplatGpu` in `splat.wgsl` (storage layout, 64 B stride).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SplatGpu {
    pub position: [f32; 3],
    pub _pad0: f32,
    /// RGBA in 0..=1.
    pub color: [f32; 4],
    /// Covariance upper triangle: xx, xy, xz, yy.
    pub cov_a: [f32; 4],
    /// Covariance upper triangle: yz, zz, then padding.
    pub cov_b: [f32; 4],
}

const _: [(); 64] = [(); core::mem::size_of::<SplatGpu>()];

impl From<&Splat> for SplatGpu {
    fn from(s: &Splat) -> Self {
        let [w, x, y, z] = s.rotation();
        let r = Mat3::from_quat(Quat::from_xyzw(x, y, z, w));
        let m = r * Mat3::from_diagonal(Vec3::from_array(s.scale));
        // Σ = R S Sᵀ Rᵀ
        let cov = m * m.transpose();

        Self {
            position: s.position,
            _pad0: 0.0,
            color: s.color.map(|c| c as f32 / 255.0),
            cov_a: [cov.x_axis.x, cov.y_axis.x, cov.z_axis.x, cov.y_axis.y],
            cov_b: [cov.z_axis.y, cov.z_axis.z, 0.0, 0.0],
        }
    }
}

pub struct SplatPipeline {
    pub pipeline: wgpu::RenderPipeline,
    /// Group 1: splat records + draw order.
    pub scene_layout: wgpu::BindGroupLayout,
}

impl SplatPipeline {
    pub fn new(
        device: &wgpu::Device,
        view_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let storage = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Splat Scene Layout"),
            entries: &[storage(0), storage(1)],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/splat.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/splat.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Splat PipelineLayout"),
            bind_group_layouts: &[view_layout, &scene_layout],
            push_constant_ranges: &[],
        });

        // Premultiplied "over".
        let blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Splat Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                // Quad corners come from vertex_index.
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                cull_mode: None,
                ..Default::default()
            },
            // Sorted blending, so no depth writes; depth is only attached.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            scene_layout,
        }
    }
}
