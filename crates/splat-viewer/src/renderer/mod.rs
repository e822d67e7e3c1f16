//! Frame orchestration: owns the GPU context, shared pipelines, the depth
//! target, the in-flight frame gate and the current model.

pub mod context;
pub mod loader;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    loader::ModelLoader,
    pipelines::Pipelines,
    targets::{DepthTarget, RenderTargets, DEPTH_FORMAT},
};
use crate::{
    camera::CameraState,
    error::{LoadError, RenderError},
    gate::{FrameGate, FramePermit, DEFAULT_FRAMES_IN_FLIGHT},
    model::{create_model, Model, ModelContext, ModelIdentifier, ModelSlot, ModelSource, ModelStats},
};
use glam::UVec2;
use pointfile::MalformedLinePolicy;
use std::time::{Duration, Instant};

/// How long a frame may wait for an in-flight slot before giving up.
pub const GATE_TIMEOUT: Duration = Duration::from_secs(5);

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
};

#[derive(Clone, Copy, Debug)]
pub struct RendererOptions {
    pub frames_in_flight: usize,
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            malformed_lines: MalformedLinePolicy::default(),
        }
    }
}

pub struct FrameRenderer {
    pub gfx: GfxContext,
    pipelines: Pipelines,
    depth: DepthTarget,
    gate: FrameGate,
    slot: ModelSlot<Box<dyn Model>>,
    policy: MalformedLinePolicy,
    loader: Option<ModelLoader>,
}

fn build_model(
    ctx: &ModelContext<'_>,
    id: &ModelIdentifier,
    source: ModelSource,
) -> Result<Box<dyn Model>, LoadError> {
    let started = Instant::now();
    let mut model = create_model(id);
    model.load(ctx, source)?;
    let ModelStats { kind, primitives } = model.stats();
    log::info!(
        "loaded {id}: {primitives} {kind} primitives in {:.2?}",
        started.elapsed()
    );
    Ok(model)
}

impl FrameRenderer {
    pub fn new(gfx: GfxContext, options: RendererOptions) -> Self {
        let pipelines = Pipelines::new(&gfx.device, gfx.color_format, DEPTH_FORMAT);
        let depth = DepthTarget::new(&gfx.device, UVec2::ONE);

        Self {
            gfx,
            pipelines,
            depth,
            gate: FrameGate::new(options.frames_in_flight),
            slot: ModelSlot::default(),
            policy: options.malformed_lines,
            loader: None,
        }
    }

    /// Reads and installs `id` on the calling thread. Returns `Ok(false)`
    /// when `id` is already current. On error the current model is kept.
    pub fn load(&mut self, id: &ModelIdentifier) -> Result<bool, LoadError> {
        // A synchronous load supersedes any background one.
        if let Some(loader) = self.loader.as_mut() {
            loader.cancel();
        }

        let ctx = ModelContext {
            device: &self.gfx.device,
            queue: &self.gfx.queue,
            pipelines: &self.pipelines,
        };
        let policy = self.policy;
        self.slot.load_with(id, |id| {
            let source = ModelSource::read(id, policy)?;
            build_model(&ctx, id, source)
        })
    }

    /// Starts reading `id` on the loader thread; [`poll_loads`](Self::poll_loads)
    /// installs it once ready. A newer request supersedes an older one.
    pub fn request_load(&mut self, id: &ModelIdentifier) {
        let policy = self.policy;
        let loader = self.loader.get_or_insert_with(|| ModelLoader::spawn(policy));

        if self.slot.is_current(id) {
            loader.cancel();
            return;
        }
        let seq = loader.request(id.clone());
        log::debug!("requested {id} (request {seq})");
    }

    /// Installs the newest finished background load, if any. `None` means
    /// nothing finished since the last call.
    pub fn poll_loads(&mut self) -> Option<Result<bool, LoadError>> {
        let done = self.loader.as_mut()?.poll()?;
        Some(self.install_loaded(done))
    }

    /// Blocks up to `timeout` for the pending background load.
    pub fn wait_for_load(&mut self, timeout: Duration) -> Option<Result<bool, LoadError>> {
        let done = self.loader.as_mut()?.wait(timeout)?;
        Some(self.install_loaded(done))
    }

    fn install_loaded(&mut self, done: loader::Completed) -> Result<bool, LoadError> {
        let loader::Completed { id, result } = done;
        if self.slot.is_current(&id) {
            return Ok(false);
        }
        let source = result?;

        let ctx = ModelContext {
            device: &self.gfx.device,
            queue: &self.gfx.queue,
            pipelines: &self.pipelines,
        };
        self.slot
            .load_with(&id, |id| build_model(&ctx, id, source))
    }

    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(ModelLoader::is_pending)
    }

    pub fn current_model(&self) -> Option<&ModelIdentifier> {
        self.slot.identifier()
    }

    pub fn model_stats(&self) -> Option<ModelStats> {
        self.slot.get().map(|m| m.stats())
    }

    /// Changes on every model replacement.
    pub fn model_generation(&self) -> u64 {
        self.slot.generation()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    pub fn max_frames_in_flight(&self) -> usize {
        self.gate.capacity()
    }

    /// Waits for a free in-flight slot, driving GPU completion callbacks.
    fn acquire_frame(&self) -> Result<FramePermit, RenderError> {
        self.gfx.device.poll(wgpu::Maintain::Poll);
        if let Some(permit) = self.gate.try_acquire() {
            return Ok(permit);
        }

        log::trace!("{} frames in flight; waiting", self.gate.in_flight());
        self.gfx.device.poll(wgpu::Maintain::Wait);
        self.gate
            .acquire_timeout(GATE_TIMEOUT)
            .ok_or(RenderError::GateTimeout)
    }

    /// Draws one frame of the current model into `target`, which must be
    /// `size` pixels and in the context's color format. Without a model the
    /// target is only cleared.
    pub fn render_frame(
        &mut self,
        target: &wgpu::TextureView,
        size: UVec2,
        camera: &CameraState,
    ) -> Result<(), RenderError> {
        let permit = self.acquire_frame()?;
        self.depth.ensure_size(&self.gfx.device, size);

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        if let Some(model) = self.slot.get_mut() {
            let ctx = ModelContext {
                device: &self.gfx.device,
                queue: &self.gfx.queue,
                pipelines: &self.pipelines,
            };
            let targets = RenderTargets {
                color: target,
                depth: &self.depth.view,
            };
            let views = [camera.viewport(size)];
            model.render(&ctx, &mut encoder, &targets, &views);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        self.gfx
            .queue
            .on_submitted_work_done(move || drop(permit));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    const SIZE: u32 = 64;

    fn renderer(options: RendererOptions) -> Option<FrameRenderer> {
        match pollster::block_on(GfxContext::headless(FORMAT)) {
            Ok(gfx) => Some(FrameRenderer::new(gfx, options)),
            Err(err) => {
                eprintln!("skipping GPU test: {err}");
                None
            }
        }
    }

    fn target(device: &wgpu::Device) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Copies the target back as tightly packed RGBA8 rows.
    fn read_pixels(gfx: &GfxContext, texture: &wgpu::Texture) -> Vec<u8> {
        // 64 px * 4 B is already a multiple of COPY_BYTES_PER_ROW_ALIGNMENT.
        let bytes_per_row = SIZE * 4;
        let buffer = gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback"),
            size: (bytes_per_row * SIZE) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(SIZE),
                },
            },
            texture.size(),
        );
        gfx.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |r| tx.send(r).unwrap());
        gfx.device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().unwrap();

        let pixels = slice.get_mapped_range().to_vec();
        buffer.unmap();
        pixels
    }

    fn alpha_at(pixels: &[u8], x: u32, y: u32) -> u8 {
        pixels[((y * SIZE + x) * 4 + 3) as usize]
    }

    #[test]
    fn loading_same_model_twice_keeps_resources() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };

        assert!(r.load(&ModelIdentifier::SampleBox).unwrap());
        let generation = r.model_generation();
        assert!(!r.load(&ModelIdentifier::SampleBox).unwrap());
        assert_eq!(r.model_generation(), generation);
        assert_eq!(r.model_stats().map(|s| s.primitives), Some(12));
    }

    #[test]
    fn failed_load_keeps_current_model() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        r.load(&ModelIdentifier::SampleBox).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 2 three 4 5 6").unwrap();
        let bad = ModelIdentifier::SimplePointCloud(file.path().to_path_buf());

        let err = r.load(&bad).unwrap_err();
        assert_eq!(err.format_error().map(|e| e.line), Some(1));
        assert_eq!(r.current_model(), Some(&ModelIdentifier::SampleBox));
    }

    #[test]
    fn sample_box_covers_the_centre_only() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        r.load(&ModelIdentifier::SampleBox).unwrap();

        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        r.render_frame(&view, UVec2::splat(SIZE), &CameraState::default())
            .unwrap();

        let pixels = read_pixels(&r.gfx, &texture);
        assert_eq!(alpha_at(&pixels, SIZE / 2, SIZE / 2), 255);
        assert_eq!(alpha_at(&pixels, 0, 0), 0);
        assert_eq!(alpha_at(&pixels, SIZE - 1, SIZE - 1), 0);
    }

    #[test]
    fn no_model_clears_to_transparent_black() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        r.render_frame(&view, UVec2::splat(SIZE), &CameraState::default())
            .unwrap();

        let pixels = read_pixels(&r.gfx, &texture);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_point_file_draws_nothing() {
        let options = RendererOptions {
            malformed_lines: MalformedLinePolicy::Skip,
            ..RendererOptions::default()
        };
        let Some(mut r) = renderer(options) else {
            return;
        };
        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let empty = tempfile::NamedTempFile::new().unwrap();
        let mut junk = tempfile::NamedTempFile::new().unwrap();
        writeln!(junk, "a b c d e f\n1 2 3\n").unwrap();

        for file in [&empty, &junk] {
            let id = ModelIdentifier::SimplePointCloud(file.path().to_path_buf());
            assert!(r.load(&id).unwrap());
            assert_eq!(r.model_stats().map(|s| s.primitives), Some(0));

            r.render_frame(&view, UVec2::splat(SIZE), &CameraState::default())
                .unwrap();
            let pixels = read_pixels(&r.gfx, &texture);
            assert!(pixels.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn empty_splat_file_draws_nothing() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        let id = ModelIdentifier::GaussianSplat(file.path().to_path_buf());
        assert!(r.load(&id).unwrap());
        assert_eq!(r.model_stats().map(|s| s.primitives), Some(0));

        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        r.render_frame(&view, UVec2::splat(SIZE), &CameraState::default())
            .unwrap();
        let pixels = read_pixels(&r.gfx, &texture);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn in_flight_frames_stay_within_capacity() {
        let options = RendererOptions {
            frames_in_flight: 2,
            ..RendererOptions::default()
        };
        let Some(mut r) = renderer(options) else {
            return;
        };
        r.load(&ModelIdentifier::SampleBox).unwrap();

        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut camera = CameraState::default();
        for _ in 0..10 {
            camera.apply_pan(glam::Vec2::new(3.0, 1.0));
            r.render_frame(&view, UVec2::splat(SIZE), &camera).unwrap();
            assert!(r.frames_in_flight() <= r.max_frames_in_flight());
        }

        r.gfx.device.poll(wgpu::Maintain::Wait);
        assert_eq!(r.frames_in_flight(), 0);
    }

    #[test]
    fn background_load_is_installed_on_poll() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 255 0 0\n1 0 0 0 255 0\n0 1 0 0 0 255").unwrap();
        let id = ModelIdentifier::SimplePointCloud(file.path().to_path_buf());

        r.request_load(&id);
        assert!(r.is_loading());
        let installed = r.wait_for_load(Duration::from_secs(10)).expect("load finished");
        assert!(installed.unwrap());
        assert_eq!(r.current_model(), Some(&id));
        assert_eq!(r.model_stats().map(|s| s.primitives), Some(3));

        // Asking again for the current model queues nothing.
        r.request_load(&id);
        assert!(!r.is_loading());
    }

    #[test]
    fn splat_scene_renders() {
        let Some(mut r) = renderer(RendererOptions::default()) else {
            return;
        };
        let splats = vec![
            pointfile::Splat::new([0.0; 3], [0.5; 3], [255, 255, 255, 255], [1.0, 0.0, 0.0, 0.0]),
            pointfile::Splat::new([0.3, 0.0, -1.0], [0.2; 3], [255, 0, 0, 200], [1.0, 0.0, 0.0, 0.0]),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.splat");
        pointfile::write_splats(std::fs::File::create(&path).unwrap(), &splats).unwrap();

        r.load(&ModelIdentifier::GaussianSplat(path)).unwrap();
        let texture = target(&r.gfx.device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        r.render_frame(&view, UVec2::splat(SIZE), &CameraState::default())
            .unwrap();

        let pixels = read_pixels(&r.gfx, &texture);
        assert!(alpha_at(&pixels, SIZE / 2, SIZE / 2) > 0);
        assert_eq!(alpha_at(&pixels, 0, 0), 0);
    }
}
