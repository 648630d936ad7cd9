//! Device, queue and window surface for the wgpu backend.

use crate::error::GpuError;

/// wgpu device and the surface it presents to.
///
/// ```ignore
/// let context = pollster::block_on(GpuContext::for_target(window.clone(), 1280, 720))?;
/// context.resize(1920, 1080);
/// ```
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    /// Surface format, size and present mode.
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Wrap resources whose surface is already configured with `config`.
    #[must_use]
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        Self {
            device,
            queue,
            surface,
            config,
        }
    }

    /// Acquires a surface for `target` along with an adapter and device, and
    /// configures it at `width` x `height` physical pixels.
    ///
    /// # Errors
    ///
    /// Fails when no surface can be created for the target, no adapter can
    /// present to it, or the device request is refused.
    pub async fn for_target(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Strip Chart Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        // colors are specified in display space, so avoid an sRGB target
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self::new(device, queue, surface, config))
    }

    /// Reconfigure at `width` x `height` physical pixels, at least 1x1. A no-op
    /// when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);

        if self.config.width != width || self.config.height != height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigures the surface with the current configuration, e.g. after it
    /// was lost.
    pub fn configure_surface(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Next frame's surface texture. Fails with `Lost` or `Outdated` when the
    /// surface needs [`configure_surface`](Self::configure_surface).
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    #[must_use]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Configured (width, height) in physical pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}
