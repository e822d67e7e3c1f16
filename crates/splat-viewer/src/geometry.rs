//! Point cloud → GPU-ready vertex, color and index arrays.

use crate::error::GpuError;
use glam::Vec3;
use pointfile::Point;
use wgpu::util::DeviceExt;

/// Tightly packed arrays for a point-list draw. Positions and colors are
/// separate streams so each has a fixed stride (12 and 16 bytes).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointGeometry {
    pub positions: Vec<[f32; 3]>,
    /// RGBA in 0..=1, alpha always 1.
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl PointGeometry {
    pub fn from_points(points: &[Point]) -> Self {
        let positions = points.iter().map(|p| p.position).collect();
        let colors = points
            .iter()
            .map(|p| {
                let [r, g, b] = p.color;
                [r / 255.0, g / 255.0, b / 255.0, 1.0]
            })
            .collect();
        let indices = (0..points.len() as u32).collect();

        Self {
            positions,
            colors,
            indices,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Axis-aligned bounds, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.positions.iter().fold(None, |acc, p| {
            let p = Vec3::from_array(*p);
            Some(match acc {
                None => (p, p),
                Some((min, max)) => (min.min(p), max.max(p)),
            })
        })
    }
}

/// Fails when a buffer of `size` bytes would exceed `limit`.
pub fn check_buffer_size(label: &'static str, size: u64, limit: u64) -> Result<(), GpuError> {
    if size > limit {
        return Err(GpuError::BufferTooLarge { label, size, limit });
    }
    Ok(())
}

#[inline]
fn byte_len<T>(items: &[T]) -> u64 {
    std::mem::size_of_val(items) as u64
}

/// Byte sizes of the three buffers behind a [`GpuGeometry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSizes {
    pub positions: u64,
    pub colors: u64,
    pub indices: u64,
}

impl BufferSizes {
    /// `Ok(None)` for empty geometry: no buffers, no draw.
    pub fn plan(geometry: &PointGeometry, limits: &wgpu::Limits) -> Result<Option<Self>, GpuError> {
        if geometry.is_empty() || geometry.indices.is_empty() {
            return Ok(None);
        }

        let sizes = Self {
            positions: byte_len(&geometry.positions),
            colors: byte_len(&geometry.colors),
            indices: byte_len(&geometry.indices),
        };
        check_buffer_size("position", sizes.positions, limits.max_buffer_size)?;
        check_buffer_size("color", sizes.colors, limits.max_buffer_size)?;
        check_buffer_size("index", sizes.indices, limits.max_buffer_size)?;
        Ok(Some(sizes))
    }
}

/// Vertex/index buffers for one indexed draw.
#[derive(Debug)]
pub struct GpuGeometry {
    pub positions: wgpu::Buffer,
    pub colors: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuGeometry {
    /// Returns `Ok(None)` for empty geometry; there is nothing to draw.
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        geometry: &PointGeometry,
    ) -> Result<Option<Self>, GpuError> {
        if BufferSizes::plan(geometry, &device.limits())?.is_none() {
            return Ok(None);
        }

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Positions")),
            contents: bytemuck::cast_slice(&geometry.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let colors = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Colors")),
            contents: bytemuck::cast_slice(&geometry.colors),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Some(Self {
            positions,
            colors,
            indices,
            index_count: geometry.indices.len() as u32,
        }))
    }

    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.colors.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
