use crate::error::GpuError;
use std::sync::Arc;
use winit::window::Window;

/// Device, queue and the color format every pipeline renders into.
pub struct GfxContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
}

/// Swap chain state for a window-backed renderer.
pub struct WindowSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
}

impl GfxContext {
    /// Creates a graphics context and a surface bound to the given window.
    pub async fn with_window(window: Arc<Window>) -> Result<(Self, WindowSurface), GpuError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        // The surface must outlive the window; `Arc` guarantees this.
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = request_device(&adapter).await?;

        // Prefer sRGB; shaders decode vertex colors to linear.
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!(
            "GPU adapter: {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format
        );

        Ok((
            Self {
                device,
                queue,
                color_format: surface_format,
            },
            WindowSurface {
                surface,
                config,
                size,
            },
        ))
    }

    /// Creates a context with no surface, for offscreen rendering.
    pub async fn headless(color_format: wgpu::TextureFormat) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = request_device(&adapter).await?;

        Ok(Self {
            device,
            queue,
            color_format,
        })
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    // Default limits, except buffer sizes go as high as the adapter allows
    // so large scenes fit.
    let supported = adapter.limits();
    let required_limits = wgpu::Limits {
        max_buffer_size: supported.max_buffer_size,
        max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
        ..wgpu::Limits::default()
    };

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
            },
            None, // no trace
        )
        .await?;
    Ok((device, queue))
}

impl WindowSurface {
    /// Resizes the swap chain when the window size changes.
    pub fn resize(&mut self, device: &wgpu::Device, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(device, &self.config);
        }
    }

    /// Re-applies the current configuration, e.g. after `SurfaceError::Lost`.
    pub fn reconfigure(&mut self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }
}
