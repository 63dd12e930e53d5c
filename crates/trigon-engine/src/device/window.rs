use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::surface::{Surface, SurfaceSize};

use super::init::{GpuInit, choose_surface_format};
use super::wgpu_ctx::WgpuContext;

/// High-level response after a swapchain error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next pass.
    Reconfigured,
    /// Transient error; skip the current pass.
    SkipFrame,
    /// Fatal error (commonly OOM); the host should shut down.
    Fatal,
}

/// Drawable surface backed by a winit window swapchain.
///
/// Owns the wgpu device/queue and the swapchain configuration. The window is
/// shared with the host, which keeps driving its event loop.
pub struct WindowSurface {
    window: Arc<Window>,

    /// Swapchain bound to the window.
    surface: wgpu::Surface<'static>,

    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active swapchain configuration. Its extent is the drawable size.
    config: wgpu::SurfaceConfiguration,

    /// Outcome of the last failed acquire, for the host to act on.
    last_error: Option<SurfaceErrorAction>,
}

impl WindowSurface {
    /// Creates a surface bound to `window`.
    pub fn new(window: Arc<Window>, init: &GpuInit) -> Result<Self> {
        pollster::block_on(Self::new_async(window, init))
    }

    pub async fn new_async(window: Arc<Window>, init: &GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = init.instance();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let (adapter, device, queue) = init.open_device(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            last_error: None,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Returns and clears the action recorded by the last failed acquire.
    pub fn take_error_action(&mut self) -> Option<SurfaceErrorAction> {
        self.last_error.take()
    }

    /// Converts a `SurfaceError` into a higher-level action, reconfiguring when useful.
    fn handle_surface_error(&mut self, err: &SurfaceError) -> SurfaceErrorAction {
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                if self.config.width > 0 && self.config.height > 0 {
                    self.surface.configure(&self.device, &self.config);
                }
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
            SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

impl Surface for WindowSurface {
    type Context = WgpuContext;

    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.config.width, self.config.height)
    }

    /// Asks the window for `size` and reconfigures the swapchain to it.
    ///
    /// The swapchain follows the requested size even if the window manager
    /// picks a different window size.
    fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() || size == self.size() {
            return;
        }

        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(size.width, size.height));

        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn acquire_context(&mut self) -> Result<WgpuContext> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                let action = self.handle_surface_error(&err);
                self.last_error = Some(action);
                anyhow::bail!("failed to acquire swapchain image ({action:?}): {err}");
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuContext::new(
            self.device.clone(),
            self.queue.clone(),
            view,
            self.config.format,
            self.size(),
            Some(frame),
        ))
    }

    /// Presents the swapchain image the context rendered into.
    fn present(&mut self, ctx: WgpuContext) {
        if let Some(frame) = ctx.into_frame() {
            self.window.pre_present_notify();
            frame.present();
        }
    }
}
