use pathtracer_shared::TracerConfig;

use crate::accumulation::AccumulationState;
use crate::buffers::{SceneBuffers, ViewportResources};
use crate::camera::Camera;
use crate::error::RendererError;
use crate::pipeline::{self, Pipelines};
use crate::renderer::{PerformanceState, RenderState};
use crate::scene::Scene;

/// Progressive path tracer: owns every GPU resource and runs the per-frame
/// compute-then-render protocol.
pub struct PathTracer {
    render: RenderState,
    pipelines: Pipelines,
    scene_buffers: SceneBuffers,
    sampler: wgpu::Sampler,
    viewport: ViewportResources,
    accumulation: AccumulationState,
    performance: PerformanceState,
}

impl PathTracer {
    /// Acquire the GPU and build all resources for `scene`.
    ///
    /// The scene is validated before anything is uploaded.
    pub async fn new(window: &winit::window::Window, scene: &Scene) -> Result<Self, RendererError> {
        scene.validate()?;

        let render = RenderState::new(window).await?;
        let pipelines = pipeline::create_pipelines(&render.device, render.config.format).await?;
        let scene_buffers = SceneBuffers::new(&render.device, scene);

        let sampler = render.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let viewport = ViewportResources::new(
            &render.device,
            &render.queue,
            &pipelines,
            &scene_buffers,
            &sampler,
            render.config.width,
            render.config.height,
        );

        Ok(Self {
            render,
            pipelines,
            scene_buffers,
            sampler,
            viewport,
            accumulation: AccumulationState::new(),
            performance: PerformanceState::new(),
        })
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.render.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.render.aspect_ratio()
    }

    pub fn accumulation(&self) -> &AccumulationState {
        &self.accumulation
    }

    /// Reallocate everything sized by the viewport and restart accumulation
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>, camera: &mut Camera) {
        if !self.render.resize(new_size) {
            log::debug!("Ignoring resize to {}x{}", new_size.width, new_size.height);
            return;
        }

        self.viewport = ViewportResources::new(
            &self.render.device,
            &self.render.queue,
            &self.pipelines,
            &self.scene_buffers,
            &self.sampler,
            new_size.width,
            new_size.height,
        );
        self.accumulation.reset();
        camera.set_aspect_ratio(self.render.aspect_ratio());

        log::info!("Resized to {}x{}", new_size.width, new_size.height);
    }

    /// Trace one more sample and present it.
    ///
    /// With `accumulate` the sample is blended into the running average,
    /// otherwise the average restarts from this frame.
    pub fn render_frame(&mut self, camera: &mut Camera, accumulate: bool) -> Result<(), RendererError> {
        let frame_start = std::time::Instant::now();

        let output = match self.render.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.render.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring the next surface texture, skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(RendererError::DeviceLost("out of memory acquiring the surface texture".to_string()));
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let params = self.accumulation.advance(accumulate);
        camera.refresh_matrices();
        self.scene_buffers.write_frame(&self.render.queue, &camera.serialize(), &params);

        let mut encoder = self
            .render
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Path Trace Pass"),
            });

            compute_pass.set_pipeline(&self.pipelines.compute_pipeline);
            compute_pass.set_bind_group(0, self.viewport.compute_bind_group(params.read_slot), &[]);

            let (workgroups_x, workgroups_y) = self.viewport.dispatch_size();
            compute_pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Display Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            render_pass.set_pipeline(&self.pipelines.render_pipeline);
            render_pass.set_bind_group(0, &self.viewport.render_bind_group, &[]);
            render_pass.draw(0..TracerConfig::FULLSCREEN_VERTEX_COUNT, 0..1);
        }

        // Both passes in one submission: the display pass sees this frame's texture
        self.render.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.performance
            .update_frame_count(frame_start, params.frame_index.saturating_add(1));

        Ok(())
    }
}
