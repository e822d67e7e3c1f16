use crate::{
    camera::CameraState,
    config::Config,
    error::RenderError,
    gesture::GestureInterpreter,
    model::ModelIdentifier,
    platform::WindowGestures,
    renderer::{
        context::{GfxContext, WindowSurface},
        FrameRenderer,
    },
};
use anyhow::Result;
use glam::UVec2;
use std::sync::Arc;
use winit::{event::WindowEvent, window::Window};

pub struct App {
    pub renderer: FrameRenderer,
    pub surface: WindowSurface,
    pub gestures: GestureInterpreter,
    host: WindowGestures,
}

impl App {
    pub async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let (gfx, surface) = GfxContext::with_window(window).await?;
        let renderer = FrameRenderer::new(gfx, config.renderer_options());

        let mut camera = CameraState::new(config.fov_deg);
        camera.sensitivity = config.sensitivity;
        camera.twist_mode = config.twist_mode;

        Ok(Self {
            renderer,
            surface,
            gestures: GestureInterpreter::new(camera),
            host: WindowGestures::new(),
        })
    }

    /// Starts loading `id` in the background; the current model stays on
    /// screen until it is ready.
    pub fn open(&mut self, id: &ModelIdentifier) {
        log::info!("opening {id}");
        self.renderer.request_load(id);
    }

    /// Installs a finished background load, if any.
    pub fn poll_loads(&mut self) {
        match self.renderer.poll_loads() {
            Some(Ok(true)) => {}
            Some(Ok(false)) => log::debug!("model already current"),
            Some(Err(err)) => log::error!("failed to load model: {:#}", anyhow::Error::from(err)),
            None => {}
        }
    }

    /// Returns `true` if the event was consumed.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        if let WindowEvent::Resized(physical_size) = event {
            self.resize(*physical_size);
            return true;
        }
        self.host.handle_event(event, &mut self.gestures)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.surface.resize(&self.renderer.gfx.device, new_size);
    }

    /// Re-applies the current surface configuration.
    pub fn reconfigure(&mut self) {
        self.surface.reconfigure(&self.renderer.gfx.device);
    }

    pub fn render(&mut self) -> Result<(), RenderError> {
        let frame = self.surface.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let size = UVec2::new(frame.texture.width(), frame.texture.height());

        self.renderer
            .render_frame(&view, size, self.gestures.camera())?;
        frame.present();
        Ok(())
    }
}
