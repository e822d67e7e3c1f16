//! `.splat` gaussian records.

use crate::{with_file_bytes, ReadError, SplatError};
use std::io::{self, Write};
use std::path::Path;

pub const SPLAT_RECORD_LEN: usize = 32;

/// One gaussian, byte-for-byte as stored on disk.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Splat {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    /// RGBA, alpha is opacity.
    pub color: [u8; 4],
    /// Quantised quaternion (w, x, y, z).
    pub rotation: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<Splat>() == SPLAT_RECORD_LEN);

impl Splat {
    /// Builds a record, quantising a (w, x, y, z) quaternion. The quaternion
    /// is normalised first; a zero quaternion becomes the identity.
    pub fn new(position: [f32; 3], scale: [f32; 3], color: [u8; 4], rotation: [f32; 4]) -> Self {
        let len = rotation.iter().map(|c| c * c).sum::<f32>().sqrt();
        let q = if len > f32::EPSILON {
            rotation.map(|c| c / len)
        } else {
            [1.0, 0.0, 0.0, 0.0]
        };

        Self {
            position,
            scale,
            color,
            rotation: q.map(|c| (c * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8),
        }
    }

    /// Dequantised (w, x, y, z) quaternion, normalised.
    pub fn rotation(&self) -> [f32; 4] {
        let q = self.rotation.map(|b| (b as f32 - 128.0) / 128.0);
        let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
        if len > f32::EPSILON {
            q.map(|c| c / len)
        } else {
            [1.0, 0.0, 0.0, 0.0]
        }
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.color[3] as f32 / 255.0
    }
}

#[inline(always)]
fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn decode_record(chunk: &[u8]) -> Splat {
    Splat {
        position: [le_f32(&chunk[0..4]), le_f32(&chunk[4..8]), le_f32(&chunk[8..12])],
        scale: [le_f32(&chunk[12..16]), le_f32(&chunk[16..20]), le_f32(&chunk[20..24])],
        color: [chunk[24], chunk[25], chunk[26], chunk[27]],
        rotation: [chunk[28], chunk[29], chunk[30], chunk[31]],
    }
}

/// Parse `.splat` bytes. An empty slice is an empty scene.
pub fn parse_splats(bytes: &[u8]) -> Result<Vec<Splat>, SplatError> {
    if bytes.len() % SPLAT_RECORD_LEN != 0 {
        return Err(SplatError::Truncated { len: bytes.len() });
    }

    #[cfg(target_endian = "little")]
    {
        // Zero-copy reinterpret when the buffer happens to be 4-aligned.
        if let Ok(records) = bytemuck::try_cast_slice::<u8, Splat>(bytes) {
            return Ok(records.to_vec());
        }
    }

    Ok(bytes.chunks_exact(SPLAT_RECORD_LEN).map(decode_record).collect())
}

pub fn read_splats<P: AsRef<Path>>(path: P) -> Result<Vec<Splat>, ReadError> {
    with_file_bytes(path.as_ref(), parse_splats)
}

/// Write records in the on-disk layout.
pub fn write_splats<W: Write>(mut out: W, splats: &[Splat]) -> io::Result<()> {
    for s in splats {
        for v in s.position.iter().chain(s.scale.iter()) {
            out.write_all(&v.to_le_bytes())?;
        }
        out.write_all(&s.color)?;
        out.write_all(&s.rotation)?;
    }
    out.flush()
}
