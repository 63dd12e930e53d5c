use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use trigon_engine::FIXED_SIZE;
use trigon_engine::device::{GpuInit, SurfaceErrorAction, WindowSurface};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub title: String,
    pub gpu: GpuInit,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            title: "trigon".to_string(),
            gpu: GpuInit::default(),
        }
    }
}

/// Windowed host: owns the event loop and triggers one pass per redraw.
pub struct Runtime;

impl Runtime {
    pub fn run(config: StudioConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            surface: None,
            failure: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct AppState {
    config: StudioConfig,
    surface: Option<WindowSurface>,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn create_surface(&self, event_loop: &ActiveEventLoop) -> Result<WindowSurface> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(FIXED_SIZE.width, FIXED_SIZE.height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        WindowSurface::new(Arc::new(window), &self.config.gpu)
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        match self.create_surface(event_loop) {
            Ok(surface) => {
                surface.window().request_redraw();
                self.surface = Some(surface);
            }
            Err(err) => {
                log::error!("failed to create window surface: {err:#}");
                self.failure = Some(err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Redraws are driven by window events only.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.surface = None;
                event_loop.exit();
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                surface.window().request_redraw();
            }

            WindowEvent::RedrawRequested => {
                trigon_engine::render(surface);

                match surface.take_error_action() {
                    Some(SurfaceErrorAction::Fatal) => {
                        log::error!("swapchain lost for good; shutting down");
                        event_loop.exit();
                    }
                    Some(SurfaceErrorAction::Reconfigured) => surface.window().request_redraw(),
                    Some(SurfaceErrorAction::SkipFrame) | None => {}
                }
            }

            _ => {}
        }
    }
}
