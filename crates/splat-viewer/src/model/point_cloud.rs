use super::{Model, ModelContext, ModelSource, ModelStats};
use crate::{
    camera::ViewportDescriptor,
    error::LoadError,
    geometry::{GpuGeometry, PointGeometry},
    renderer::{
        pipelines::{set_viewport, ViewBindings},
        targets::RenderTargets,
    },
};

/// Colored points from a whitespace-separated text file, one vertex each.
#[derive(Default)]
pub struct SimplePointCloudModel {
    geometry: Option<GpuGeometry>,
    point_count: usize,
    views: ViewBindings,
}

impl Model for SimplePointCloudModel {
    fn load(&mut self, ctx: &ModelContext<'_>, source: ModelSource) -> Result<(), LoadError> {
        let cloud = match source {
            ModelSource::Points(cloud) => cloud,
            other => {
                return Err(LoadError::SourceMismatch {
                    model: "point cloud",
                    source_kind: other.kind(),
                })
            }
        };

        let geometry = PointGeometry::from_points(&cloud.points);
        match geometry.bounds() {
            Some((min, max)) => log::info!(
                "point cloud: {} points ({} lines skipped), bounds {min} .. {max}",
                geometry.vertex_count(),
                cloud.skipped_lines,
            ),
            None => log::warn!("point cloud is empty; nothing will be drawn"),
        }

        self.point_count = geometry.vertex_count();
        self.geometry = GpuGeometry::upload(ctx.device, "Point Cloud", &geometry)?;
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &ModelContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets<'_>,
        views: &[ViewportDescriptor],
    ) {
        let Some(geometry) = self.geometry.as_ref() else {
            return;
        };
        let binds = self
            .views
            .prepare(ctx.device, ctx.queue, &ctx.pipelines.view_layout, views);

        let mut pass = targets.begin_load_pass(encoder, "Point Cloud Pass");
        pass.set_pipeline(&ctx.pipelines.points.pipeline);
        for (&bind, desc) in binds.iter().zip(views) {
            set_viewport(&mut pass, desc);
            pass.set_bind_group(0, bind, &[]);
            geometry.draw(&mut pass);
        }
    }

    fn stats(&self) -> ModelStats {
        ModelStats {
            kind: "point cloud",
            primitives: self.point_count,
        }
    }
}
