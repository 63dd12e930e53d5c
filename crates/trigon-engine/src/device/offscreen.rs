use anyhow::{Context, Result};

use crate::surface::{Surface, SurfaceSize};

use super::init::GpuInit;
use super::wgpu_ctx::WgpuContext;

/// Color format of offscreen targets. Readback returns tightly packed RGBA8.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Headless render target: a GPU texture that can be read back to host memory.
pub struct OffscreenSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    texture: wgpu::Texture,
    size: SurfaceSize,
}

impl OffscreenSurface {
    /// Opens a device without a window and allocates a target of `size`.
    pub fn new(init: &GpuInit, size: SurfaceSize) -> Result<Self> {
        pollster::block_on(Self::new_async(init, size))
    }

    pub async fn new_async(init: &GpuInit, size: SurfaceSize) -> Result<Self> {
        anyhow::ensure!(!size.is_empty(), "offscreen surface has zero size");

        let instance = init.instance();
        let (_adapter, device, queue) = init.open_device(&instance, None).await?;
        let texture = create_target(&device, size);

        Ok(Self {
            device,
            queue,
            texture,
            size,
        })
    }

    /// Copies the target into host memory as rows of RGBA8 pixels.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let SurfaceSize { width, height } = self.size;
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trigon readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trigon readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("device poll during readback failed")?;
        rx.recv()
            .context("readback callback was dropped")?
            .context("failed to map readback buffer")?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        staging.unmap();

        Ok(pixels)
    }
}

fn create_target(device: &wgpu::Device, size: SurfaceSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("trigon offscreen target"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

impl Surface for OffscreenSurface {
    type Context = WgpuContext;

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        if size == self.size || size.is_empty() {
            return;
        }
        self.texture = create_target(&self.device, size);
        self.size = size;
    }

    fn acquire_context(&mut self) -> Result<WgpuContext> {
        let view = self
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuContext::new(
            self.device.clone(),
            self.queue.clone(),
            view,
            OFFSCREEN_FORMAT,
            self.size,
            None,
        ))
    }

    fn present(&mut self, ctx: WgpuContext) {
        drop(ctx);
    }
}
