//! pointfile: readers for the two on-disk model formats the viewer consumes.
//!
//! - ASCII point files: one point per line, `x y z r g b`, colors in 0..=255.
//!   No header. Lines that do not split into exactly six tokens are skipped.
//! - `.splat` files: tightly packed 32-byte little-endian gaussian records.
//!
//! Record layout of a `.splat` gaussian:
//!   00 : f32[3] position
//!   0C : f32[3] scale (linear, not log)
//!   18 : u8[4]  color RGBA
//!   1C : u8[4]  rotation quaternion (w, x, y, z), each as `q * 128 + 128`
//!
//! Both readers materialise the whole file in memory; the files this crate
//! targets hold hundreds of thousands of points, not billions.

pub mod ascii;
pub mod splat;

use std::io;
use thiserror::Error;

pub use ascii::{parse_points, read_points, MalformedLinePolicy, Point, PointCloud};
pub use splat::{parse_splats, read_splats, write_splats, Splat, SPLAT_RECORD_LEN};

/// A six-token line whose tokens are not all numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: '{token}' is not a number")]
pub struct FormatError {
    /// 1-based line number in the source text.
    pub line: usize,
    /// The first offending token.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplatError {
    #[error("splat data is {len} bytes, not a multiple of {SPLAT_RECORD_LEN}")]
    Truncated { len: usize },
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Splat(#[from] SplatError),
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub(crate) fn with_file_bytes<T, E>(
    path: &std::path::Path,
    f: impl FnOnce(&[u8]) -> Result<T, E>,
) -> Result<T, ReadError>
where
    ReadError: From<E>,
{
    let file = std::fs::File::open(path)?;
    // An empty file cannot be mapped on every platform.
    if file.metadata()?.len() == 0 {
        return Ok(f(&[])?);
    }
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    Ok(f(&map)?)
}

#[cfg(not(feature = "mmap"))]
pub(crate) fn with_file_bytes<T, E>(
    path: &std::path::Path,
    f: impl FnOnce(&[u8]) -> Result<T, E>,
) -> Result<T, ReadError>
where
    ReadError: From<E>,
{
    let bytes = std::fs::read(path)?;
    Ok(f(&bytes)?)
}
