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

const HALF_EXTENT: f32 = 1.0;

/// Unit-ish cube with one color per corner, for checking the pipeline
/// without any data on disk.
pub fn box_geometry() -> PointGeometry {
    let h = HALF_EXTENT;
    let mut positions = Vec::with_capacity(8);
    let mut colors = Vec::with_capacity(8);
    // Corner i has x, y, z set from bits 0, 1, 2.
    for i in 0..8u32 {
        let bit = |b: u32| (i >> b) & 1 == 1;
        let pick = |b: u32| if bit(b) { h } else { -h };
        positions.push([pick(0), pick(1), pick(2)]);
        colors.push([
            bit(0) as u32 as f32,
            bit(1) as u32 as f32,
            bit(2) as u32 as f32,
            1.0,
        ]);
    }

    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1,  1, 2, 3, // -z
        4, 5, 6,  5, 7, 6, // +z
        0, 1, 4,  1, 5, 4, // -y
        2, 6, 3,  3, 6, 7, // +y
        0, 4, 2,  2, 4, 6, // -x
        1, 3, 5,  3, 7, 5, // +x
    ];

    PointGeometry {
        positions,
        colors,
        indices,
    }
}

#[derive(Default)]
pub struct SampleBoxModel {
    geometry: Option<GpuGeometry>,
    triangles: usize,
    views: ViewBindings,
}

impl Model for SampleBoxModel {
    fn load(&mut self, ctx: &ModelContext<'_>, source: ModelSource) -> Result<(), LoadError> {
        if !matches!(source, ModelSource::Builtin) {
            return Err(LoadError::SourceMismatch {
                model: "sample box",
                source_kind: source.kind(),
            });
        }

        let geometry = box_geometry();
        self.triangles = geometry.indices.len() / 3;
        self.geometry = GpuGeometry::upload(ctx.device, "Sample Box", &geometry)?;
        log::debug!("sample box: {} triangles", self.triangles);
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

        let mut pass = targets.begin_load_pass(encoder, "Sample Box Pass");
        pass.set_pipeline(&ctx.pipelines.triangles.pipeline);
        for (&bind, desc) in binds.iter().zip(views) {
            set_viewport(&mut pass, desc);
            pass.set_bind_group(0, bind, &[]);
            geometry.draw(&mut pass);
        }
    }

    fn stats(&self) -> ModelStats {
        ModelStats {
            kind: "sample box",
            primitives: self.triangles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn box_has_twelve_triangles_over_eight_corners() {
        let g = box_geometry();
        assert_eq!(g.vertex_count(), 8);
        assert_eq!(g.indices.len(), 36);
        assert!(g.indices.iter().all(|&i| i < 8));
        assert_eq!(g.bounds(), Some((Vec3::splat(-HALF_EXTENT), Vec3::splat(HALF_EXTENT))));
    }

    #[test]
    fn every_corner_is_used_by_three_faces() {
        let g = box_geometry();
        for corner in 0..8u32 {
            // Each corner touches 3 faces; each face uses it in 1 or 2 triangles.
            let uses = g.indices.iter().filter(|&&i| i == corner).count();
            assert!((3..=6).contains(&uses), "corner {corner} used {uses} times");
        }
    }

    #[test]
    fn triangles_lie_on_box_faces() {
        let g = box_geometry();
        for tri in g.indices.chunks(3) {
            let p: Vec<Vec3> = tri.iter().map(|&i| Vec3::from_array(g.positions[i as usize])).collect();
            // All three corners share one coordinate.
            let shared = (0..3).filter(|&axis| p[0][axis] == p[1][axis] && p[1][axis] == p[2][axis]);
            assert_eq!(shared.count(), 1);
        }
    }
}
