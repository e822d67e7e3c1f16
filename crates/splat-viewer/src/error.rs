use std::path::PathBuf;

pub use pointfile::FormatError;

/// A model could not be read or built. The previously loaded model (if any)
/// stays current.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: pointfile::ReadError,
    },
    #[error("{model} model cannot load {source_kind} data")]
    SourceMismatch {
        model: &'static str,
        source_kind: &'static str,
    },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl LoadError {
    /// The parse error behind this failure, if a point line was malformed.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Self::Read {
                source: pointfile::ReadError::Format(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}

/// Device, surface or buffer allocation failed. Setup failures are fatal for
/// the session; an oversized buffer only fails the load that asked for it.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error(transparent)]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error(transparent)]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("{label} buffer needs {size} bytes, device allows {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },
}

/// Per-frame failures. None of these are recoverable by the renderer itself.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("timed out waiting for an in-flight frame to complete")]
    GateTimeout,
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}
