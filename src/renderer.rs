use pathtracer_shared::TracerConfig;

use crate::error::RendererError;

/// Device, queue and presentation surface
pub struct RenderState {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
}

/// Performance tracking
pub struct PerformanceState {
    pub start_time: std::time::Instant,
    pub last_frame_time: std::time::Duration,
    pub frame_count: u64,
}

impl RenderState {
    pub async fn new(window: &winit::window::Window) -> Result<Self, RendererError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // The window is moved into the event loop and outlives the surface
        let surface = unsafe { instance.create_surface(window) }
            .map_err(|e| RendererError::UnsupportedBackend(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RendererError::AdapterUnavailable("no adapter is compatible with the window surface".to_string()))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        // Accumulation buffers grow with the window, so take the adapter's
        // full buffer limits rather than the portable defaults
        let adapter_limits = adapter.limits();
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default().using_resolution(adapter_limits.clone())
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Path Tracer Device"),
                    features: wgpu::Features::empty(),
                    limits,
                },
                None,
            )
            .await
            .map_err(|e| RendererError::AdapterUnavailable(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured GPU error: {}", error);
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RendererError::UnsupportedBackend("surface reports no supported formats".to_string()))?;
        log::info!("Surface format {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
        })
    }

    /// Reconfigure the surface for a new size. Returns false for a zero-sized
    /// window, which is left untouched.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) -> bool {
        if new_size.width == 0 || new_size.height == 0 {
            return false;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    /// Reconfigure with the current size after the surface was lost or outdated
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}

impl PerformanceState {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            last_frame_time: std::time::Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Count a frame; returns true when statistics were logged
    pub fn update_frame_count(&mut self, frame_start: std::time::Instant, samples: u32) -> bool {
        self.frame_count += 1;
        self.last_frame_time = frame_start.elapsed();

        if self.frame_count % TracerConfig::PERFORMANCE_STATS_INTERVAL != 0 {
            return false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let fps = self.frame_count as f32 / elapsed;
        log::info!(
            "FPS: {:.1}, last frame encode: {:.2}ms, accumulated samples: {}",
            fps,
            self.last_frame_time.as_secs_f32() * TracerConfig::MILLISECONDS_PER_SECOND,
            samples
        );
        true
    }
}

impl Default for PerformanceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_logged_on_interval() {
        let mut performance = PerformanceState::new();
        let logged: Vec<bool> = (0..TracerConfig::PERFORMANCE_STATS_INTERVAL * 2)
            .map(|_| performance.update_frame_count(std::time::Instant::now(), 1))
            .collect();

        assert_eq!(logged.iter().filter(|&&l| l).count(), 2);
        assert!(logged[TracerConfig::PERFORMANCE_STATS_INTERVAL as usize - 1]);
        assert_eq!(performance.frame_count, TracerConfig::PERFORMANCE_STATS_INTERVAL * 2);
    }
}
