use super::{Model, ModelContext, ModelSource, ModelStats};
use crate::{
    camera::ViewportDescriptor,
    error::{GpuError, LoadError},
    geometry::check_buffer_size,
    renderer::{
        pipelines::{set_viewport, splat::SplatGpu, ViewBindings},
        targets::RenderTargets,
    },
};
use glam::{Mat4, Vec3};
use rayon::prelude::*;
use wgpu::util::DeviceExt;

/// Draw order for blending: farthest from the eye first. View space looks
/// down -Z, so that is ascending view-space z.
pub fn sort_back_to_front(positions: &[[f32; 3]], view: &Mat4) -> Vec<u32> {
    let depths: Vec<f32> = positions
        .par_iter()
        .map(|p| view.transform_point3(Vec3::from_array(*p)).z)
        .collect();

    let mut order: Vec<u32> = (0..positions.len() as u32).collect();
    order.par_sort_unstable_by(|&a, &b| depths[a as usize].total_cmp(&depths[b as usize]));
    order
}

/// Largest buffer a shader can bind as one storage array.
pub fn storage_binding_limit(limits: &wgpu::Limits) -> u64 {
    u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size)
}

/// Byte sizes of the record and order buffers for `count` splats, checked
/// against the device's storage binding limit.
pub fn splat_buffer_sizes(count: usize, limits: &wgpu::Limits) -> Result<(u64, u64), GpuError> {
    let limit = storage_binding_limit(limits);
    let records = (count as u64).saturating_mul(std::mem::size_of::<SplatGpu>() as u64);
    let order = (count as u64).saturating_mul(std::mem::size_of::<u32>() as u64);
    check_buffer_size("splat record", records, limit)?;
    check_buffer_size("splat order", order, limit)?;
    Ok((records, order))
}

struct SplatScene {
    positions: Vec<[f32; 3]>,
    order: wgpu::Buffer,
    bind: wgpu::BindGroup,
    // Held so the storage buffer outlives the bind group that reads it.
    _splats: wgpu::Buffer,
    sorted_for: Option<Mat4>,
}

/// Gaussian splats read from a `.splat` file, depth sorted on the CPU
/// whenever the view changes.
#[derive(Default)]
pub struct GaussianSplatModel {
    scene: Option<SplatScene>,
    splat_count: usize,
    views: ViewBindings,
}

impl SplatScene {
    fn resort(&mut self, queue: &wgpu::Queue, view: &Mat4) {
        if self.sorted_for.as_ref() == Some(view) {
            return;
        }
        let order = sort_back_to_front(&self.positions, view);
        queue.write_buffer(&self.order, 0, bytemuck::cast_slice(&order));
        self.sorted_for = Some(*view);
    }
}

impl Model for GaussianSplatModel {
    fn load(&mut self, ctx: &ModelContext<'_>, source: ModelSource) -> Result<(), LoadError> {
        let splats = match source {
            ModelSource::Splats(splats) => splats,
            other => {
                return Err(LoadError::SourceMismatch {
                    model: "splat",
                    source_kind: other.kind(),
                })
            }
        };

        self.splat_count = splats.len();
        if splats.is_empty() {
            log::warn!("splat file is empty; nothing will be drawn");
            self.scene = None;
            return Ok(());
        }

        let (record_bytes, _) = splat_buffer_sizes(splats.len(), &ctx.device.limits())?;
        let gpu: Vec<SplatGpu> = splats.par_iter().map(SplatGpu::from).collect();
        let positions: Vec<[f32; 3]> = splats.iter().map(|s| s.position).collect();

        let splat_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Splat Records"),
            contents: bytemuck::cast_slice(&gpu),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let identity: Vec<u32> = (0..splats.len() as u32).collect();
        let order = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Splat Order"),
            contents: bytemuck::cast_slice(&identity),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let bind = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Splat Scene BindGroup"),
            layout: &ctx.pipelines.splats.scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: splat_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: order.as_entire_binding(),
                },
            ],
        });

        log::info!(
            "splats: {} records, {:.1} MiB on GPU",
            splats.len(),
            record_bytes as f64 / (1024.0 * 1024.0)
        );

        self.scene = Some(SplatScene {
            positions,
            order,
            bind,
            _splats: splat_buf,
            sorted_for: None,
        });
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &ModelContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets<'_>,
        views: &[ViewportDescriptor],
    ) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        // One shared order buffer; every view of a frame uses the same camera.
        let Some(first) = views.first() else {
            return;
        };
        scene.resort(ctx.queue, &first.view);

        let binds = self
            .views
            .prepare(ctx.device, ctx.queue, &ctx.pipelines.view_layout, views);
        let count = scene.positions.len() as u32;

        let mut pass = targets.begin_load_pass(encoder, "Splat Pass");
        pass.set_pipeline(&ctx.pipelines.splats.pipeline);
        pass.set_bind_group(1, &scene.bind, &[]);
        for (&bind, desc) in binds.iter().zip(views) {
            set_viewport(&mut pass, desc);
            pass.set_bind_group(0, bind, &[]);
            pass.draw(0..4, 0..count);
        }
    }

    fn stats(&self) -> ModelStats {
        ModelStats {
            kind: "splat",
            primitives: self.splat_count,
        }
    }
}
