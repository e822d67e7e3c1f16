//! Entry point for the splat viewer.

use anyhow::Result;
use clap::Parser;
use splat_viewer::{app::App, config::Config, error::RenderError};
use std::sync::Arc;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::debug!("{config:?}");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Splat Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    // Async → sync.
    let mut app = pollster::block_on(App::new(window.clone(), &config))?;
    app.open(&config.model());

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(()) => {}
                            Err(RenderError::Surface(wgpu::SurfaceError::Lost)) => app.reconfigure(),
                            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                                log::error!("GPU out of memory, exiting");
                                elwt.exit();
                            }
                            Err(RenderError::GateTimeout) => {
                                log::error!("GPU stopped completing frames, exiting");
                                elwt.exit();
                            }
                            Err(e) => log::warn!("Render error: {e}"),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.poll_loads();
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
