//! The contract the frame renderer draws through, its three implementations,
//! and the slot that holds whichever one is current.

pub mod point_cloud;
pub mod sample_box;
pub mod splat;

pub use self::{point_cloud::SimplePointCloudModel, sample_box::SampleBoxModel, splat::GaussianSplatModel};

use crate::{
    camera::ViewportDescriptor,
    error::LoadError,
    renderer::{pipelines::Pipelines, targets::RenderTargets},
};
use pointfile::{MalformedLinePolicy, PointCloud, Splat};
use std::path::{Path, PathBuf};

/// Which model to show and where its data lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelIdentifier {
    GaussianSplat(PathBuf),
    SimplePointCloud(PathBuf),
    SampleBox,
}

impl std::fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GaussianSplat(p) => write!(f, "splat:{}", p.display()),
            Self::SimplePointCloud(p) => write!(f, "points:{}", p.display()),
            Self::SampleBox => f.write_str("sample-box"),
        }
    }
}

/// Decoded, CPU-side model data. Reading it touches only the filesystem, so
/// it can happen on any thread.
#[derive(Debug)]
pub enum ModelSource {
    Points(PointCloud),
    Splats(Vec<Splat>),
    Builtin,
}

impl ModelSource {
    pub fn read(id: &ModelIdentifier, policy: MalformedLinePolicy) -> Result<Self, LoadError> {
        let read_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| LoadError::Read { path, source }
        };

        match id {
            ModelIdentifier::GaussianSplat(path) => pointfile::read_splats(path)
                .map(Self::Splats)
                .map_err(read_err(path.as_path())),
            ModelIdentifier::SimplePointCloud(path) => pointfile::read_points(path, policy)
                .map(Self::Points)
                .map_err(read_err(path.as_path())),
            ModelIdentifier::SampleBox => Ok(Self::Builtin),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Points(_) => "point cloud",
            Self::Splats(_) => "splat",
            Self::Builtin => "builtin",
        }
    }
}

/// Device-side handles a model needs to upload and draw.
pub struct ModelContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub pipelines: &'a Pipelines,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelStats {
    pub kind: &'static str,
    /// Points, splats or triangles.
    pub primitives: usize,
}

pub trait Model {
    /// Builds GPU resources from `source`, replacing any held before.
    fn load(&mut self, ctx: &ModelContext<'_>, source: ModelSource) -> Result<(), LoadError>;

    /// Records draws for every view into `encoder`. The targets are already
    /// cleared for this frame.
    fn render(
        &mut self,
        ctx: &ModelContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets<'_>,
        views: &[ViewportDescriptor],
    );

    fn stats(&self) -> ModelStats;
}

/// Maps an identifier to an empty model of the matching kind.
pub fn create_model(id: &ModelIdentifier) -> Box<dyn Model> {
    match id {
        ModelIdentifier::GaussianSplat(_) => Box::<GaussianSplatModel>::default(),
        ModelIdentifier::SimplePointCloud(_) => Box::<SimplePointCloudModel>::default(),
        ModelIdentifier::SampleBox => Box::<SampleBoxModel>::default(),
    }
}

/// Holds the current model with the identifier it was loaded from.
/// Replacement is all-or-nothing.
pub struct ModelSlot<M> {
    current: Option<(ModelIdentifier, M)>,
    generation: u64,
}

impl<M> Default for ModelSlot<M> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }
}

impl<M> ModelSlot<M> {
    pub fn identifier(&self) -> Option<&ModelIdentifier> {
        self.current.as_ref().map(|(id, _)| id)
    }

    #[inline]
    pub fn is_current(&self, id: &ModelIdentifier) -> bool {
        self.identifier() == Some(id)
    }

    /// Bumped on every successful replacement.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self) -> Option<&M> {
        self.current.as_ref().map(|(_, m)| m)
    }

    pub fn get_mut(&mut self) -> Option<&mut M> {
        self.current.as_mut().map(|(_, m)| m)
    }

    /// Installs a built model, dropping the previous one.
    pub fn install(&mut self, id: ModelIdentifier, model: M) {
        self.current = Some((id, model));
        self.generation += 1;
    }

    /// Builds and installs a model for `id` unless it is already current.
    /// Returns whether anything changed. On error the slot is untouched.
    pub fn load_with<F>(&mut self, id: &ModelIdentifier, build: F) -> Result<bool, LoadError>
    where
        F: FnOnce(&ModelIdentifier) -> Result<M, LoadError>,
    {
        if self.is_current(id) {
            return Ok(false);
        }
        let model = build(id)?;
        self.install(id.clone(), model);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mismatch() -> LoadError {
        LoadError::SourceMismatch {
            model: "test",
            source_kind: "test",
        }
    }

    #[test]
    fn loading_the_same_identifier_twice_builds_once() {
        let mut slot = ModelSlot::<u32>::default();
        let mut builds = 0;
        let id = ModelIdentifier::SimplePointCloud("a.txt".into());

        assert!(slot
            .load_with(&id, |_| {
                builds += 1;
                Ok(7)
            })
            .unwrap());
        let generation = slot.generation();

        assert!(!slot
            .load_with(&id, |_| {
                builds += 1;
                Ok(8)
            })
            .unwrap());

        assert_eq!(builds, 1);
        assert_eq!(slot.get(), Some(&7));
        assert_eq!(slot.generation(), generation);
    }

    #[test]
    fn new_identifier_replaces_model() {
        let mut slot = ModelSlot::<&str>::default();
        slot.load_with(&ModelIdentifier::SampleBox, |_| Ok("box")).unwrap();
        slot.load_with(&ModelIdentifier::GaussianSplat("s.splat".into()), |_| Ok("splat"))
            .unwrap();

        assert_eq!(slot.get(), Some(&"splat"));
        assert_eq!(slot.generation(), 2);
        assert!(slot.is_current(&ModelIdentifier::GaussianSplat("s.splat".into())));
    }

    #[test]
    fn failed_load_keeps_previous_model() {
        let mut slot = ModelSlot::<&str>::default();
        slot.load_with(&ModelIdentifier::SampleBox, |_| Ok("box")).unwrap();

        let bad = ModelIdentifier::SimplePointCloud("broken.txt".into());
        assert!(slot.load_with(&bad, |_| Err(mismatch())).is_err());

        assert_eq!(slot.get(), Some(&"box"));
        assert!(slot.is_current(&ModelIdentifier::SampleBox));
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn failed_first_load_leaves_slot_empty() {
        let mut slot = ModelSlot::<()>::default();
        let id = ModelIdentifier::SampleBox;
        assert!(slot.load_with(&id, |_| Err(mismatch())).is_err());
        assert!(slot.get().is_none());
        assert!(slot.identifier().is_none());
    }

    #[test]
    fn same_path_different_kind_is_a_different_model() {
        let a = ModelIdentifier::GaussianSplat("m.bin".into());
        let b = ModelIdentifier::SimplePointCloud("m.bin".into());
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn reads_point_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 255 255 255").unwrap();
        let id = ModelIdentifier::SimplePointCloud(file.path().to_path_buf());

        match ModelSource::read(&id, MalformedLinePolicy::Reject).unwrap() {
            ModelSource::Points(cloud) => assert_eq!(cloud.len(), 1),
            other => panic!("unexpected source {}", other.kind()),
        }
    }

    #[test]
    fn malformed_point_source_surfaces_format_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 zero 255 255 255").unwrap();
        let id = ModelIdentifier::SimplePointCloud(file.path().to_path_buf());

        let err = ModelSource::read(&id, MalformedLinePolicy::Reject).unwrap_err();
        let format = err.format_error().expect("format error");
        assert_eq!(format.line, 1);
        assert_eq!(format.token, "zero");
    }

    #[test]
    fn missing_splat_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let id = ModelIdentifier::GaussianSplat(dir.path().join("missing.splat"));
        let err = ModelSource::read(&id, MalformedLinePolicy::Reject).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.format_error().is_none());
    }

    #[test]
    fn sample_box_needs_no_file() {
        let source = ModelSource::read(&ModelIdentifier::SampleBox, MalformedLinePolicy::Reject)
            .unwrap();
        assert!(matches!(source, ModelSource::Builtin));
    }
}
