use pathtracer_shared::{CameraUniform, MaterialRecord, SphereRecord, TracerConfig, WorkgroupHelper};
use wgpu::util::DeviceExt;

use crate::accumulation::FrameParams;
use crate::pipeline::{Pipelines, OUTPUT_TEXTURE_FORMAT};
use crate::scene::Scene;

/// Scene storage and per-frame uniform buffers.
///
/// Sized once from the scene; only the uniforms change after creation.
pub struct SceneBuffers {
    pub spheres_buffer: wgpu::Buffer,
    pub materials_buffer: wgpu::Buffer,
    pub camera_buffer: wgpu::Buffer,
    pub frame_index_buffer: wgpu::Buffer,
    pub accumulate_buffer: wgpu::Buffer,
}

/// Resources whose size follows the viewport. Rebuilt on every resize.
pub struct ViewportResources {
    /// Traced resolution; smaller than the window when the window exceeds
    /// the device's buffer limits
    pub width: u32,
    pub height: u32,
    _output_texture: wgpu::Texture,
    _output_view: wgpu::TextureView,
    /// Ping-pong pair holding `(radiance sum, sample count)` per pixel
    accumulation_buffers: [wgpu::Buffer; 2],
    /// Entry `n` reads accumulation buffer `n` and writes the other one
    compute_bind_groups: [wgpu::BindGroup; 2],
    pub render_bind_group: wgpu::BindGroup,
}

/// Serialized records for a storage buffer; an empty list gets one zeroed
/// record of `record_floats` so the binding is never zero-sized.
fn non_empty(mut floats: Vec<f32>, record_floats: usize) -> Vec<f32> {
    if floats.is_empty() {
        floats.resize(record_floats, 0.0);
    }
    floats
}

/// Largest accumulation buffer the device can bind as storage
pub fn max_accumulation_bytes(limits: &wgpu::Limits) -> u64 {
    (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
}

/// Largest viewport whose accumulation buffer fits in `max_bytes`, keeping
/// the aspect ratio. Sizes that already fit are returned unchanged.
pub fn fit_viewport(width: u32, height: u32, max_bytes: u64) -> (u32, u32) {
    let max_texels = (max_bytes / TracerConfig::ACCUMULATION_TEXEL_SIZE).max(1);
    let texels = |w: u32, h: u32| w as u64 * h as u64;
    if texels(width, height) <= max_texels {
        return (width, height);
    }

    let scale = (max_texels as f64 / texels(width, height) as f64).sqrt();
    let mut fitted_width = ((width as f64 * scale) as u32).max(1);
    let mut fitted_height = ((height as f64 * scale) as u32).max(1);
    while texels(fitted_width, fitted_height) > max_texels {
        if fitted_width >= fitted_height {
            fitted_width -= 1;
        } else {
            fitted_height -= 1;
        }
    }
    (fitted_width, fitted_height)
}

impl SceneBuffers {
    pub fn new(device: &wgpu::Device, scene: &Scene) -> Self {
        let spheres = non_empty(scene.serialize_meshes(), SphereRecord::FLOATS);
        let materials = non_empty(scene.serialize_materials(), MaterialRecord::FLOATS);

        let spheres_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Spheres Buffer"),
            contents: bytemuck::cast_slice(&spheres),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let materials_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Materials Buffer"),
            contents: bytemuck::cast_slice(&materials),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Index Buffer"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let accumulate_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Accumulate Flag Buffer"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "Scene buffers: {} spheres, {} materials",
            scene.meshes().len(),
            scene.materials().len()
        );

        Self {
            spheres_buffer,
            materials_buffer,
            camera_buffer,
            frame_index_buffer,
            accumulate_buffer,
        }
    }

    /// Overwrite every per-frame uniform
    pub fn write_frame(&self, queue: &wgpu::Queue, camera: &[f32; CameraUniform::FLOATS], params: &FrameParams) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(camera));
        queue.write_buffer(&self.frame_index_buffer, 0, bytemuck::bytes_of(&params.frame_index));
        queue.write_buffer(&self.accumulate_buffer, 0, bytemuck::bytes_of(&params.accumulate_flag()));
    }
}

impl ViewportResources {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipelines: &Pipelines,
        scene_buffers: &SceneBuffers,
        sampler: &wgpu::Sampler,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        let max_bytes = max_accumulation_bytes(&device.limits());
        let (width, height) = fit_viewport(window_width, window_height, max_bytes);
        if (width, height) != (window_width, window_height) {
            log::warn!(
                "{}x{} exceeds the {} byte storage buffer limit, tracing at {}x{}",
                window_width,
                window_height,
                max_bytes,
                width,
                height
            );
        }

        let output_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Path Traced Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let buffer_size = WorkgroupHelper::accumulation_buffer_size(width, height);
        let create_accumulation = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: buffer_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let accumulation_buffers = [
            create_accumulation("Accumulation Buffer A"),
            create_accumulation("Accumulation Buffer B"),
        ];

        let compute_bind_groups = [
            Self::create_compute_bind_group(device, pipelines, scene_buffers, &output_view, &accumulation_buffers, 0),
            Self::create_compute_bind_group(device, pipelines, scene_buffers, &output_view, &accumulation_buffers, 1),
        ];

        let render_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &pipelines.render_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        log::debug!("Viewport resources allocated for {}x{}", width, height);

        let resources = Self {
            width,
            height,
            _output_texture: output_texture,
            _output_view: output_view,
            accumulation_buffers,
            compute_bind_groups,
            render_bind_group,
        };

        // The first accumulated frame must start from nothing
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Accumulation Clear Encoder"),
        });
        resources.clear_accumulation(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));

        resources
    }

    /// Zero both accumulation buffers on the GPU
    pub fn clear_accumulation(&self, encoder: &mut wgpu::CommandEncoder) {
        for buffer in &self.accumulation_buffers {
            encoder.clear_buffer(buffer, 0, None);
        }
    }

    fn create_compute_bind_group(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        scene_buffers: &SceneBuffers,
        output_view: &wgpu::TextureView,
        accumulation_buffers: &[wgpu::Buffer; 2],
        read_slot: usize,
    ) -> wgpu::BindGroup {
        let label = if read_slot == 0 {
            "Compute Bind Group A->B"
        } else {
            "Compute Bind Group B->A"
        };

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &pipelines.compute_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: accumulation_buffers[read_slot].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: accumulation_buffers[read_slot ^ 1].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: scene_buffers.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: scene_buffers.spheres_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: scene_buffers.materials_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: scene_buffers.frame_index_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: scene_buffers.accumulate_buffer.as_entire_binding(),
                },
            ],
        })
    }

    pub fn compute_bind_group(&self, read_slot: usize) -> &wgpu::BindGroup {
        &self.compute_bind_groups[read_slot & 1]
    }

    /// Workgroup grid covering the viewport
    pub fn dispatch_size(&self) -> (u32, u32) {
        WorkgroupHelper::dispatch_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scene_gets_placeholder_records() {
        let spheres = non_empty(Scene::new().serialize_meshes(), SphereRecord::FLOATS);
        assert_eq!(spheres, vec![0.0; SphereRecord::FLOATS]);

        let materials = non_empty(Scene::new().serialize_materials(), MaterialRecord::FLOATS);
        assert_eq!(materials.len(), MaterialRecord::FLOATS);

        let kept = non_empty(vec![1.0; SphereRecord::FLOATS * 2], SphereRecord::FLOATS);
        assert_eq!(kept.len(), SphereRecord::FLOATS * 2);
    }

    #[test]
    fn test_viewport_within_limits_is_unchanged() {
        let max_bytes = max_accumulation_bytes(&wgpu::Limits::default());
        assert_eq!(fit_viewport(1280, 720, max_bytes), (1280, 720));
        assert_eq!(fit_viewport(3840, 2160, max_bytes), (3840, 2160));
    }

    #[test]
    fn test_oversized_viewport_is_fitted_to_limits() {
        let max_bytes = max_accumulation_bytes(&wgpu::Limits::default());
        assert!(WorkgroupHelper::accumulation_buffer_size(5120, 2880) > max_bytes);

        let (width, height) = fit_viewport(5120, 2880, max_bytes);
        assert!(WorkgroupHelper::accumulation_buffer_size(width, height) <= max_bytes);
        assert!(width > 3800 && height > 2100);

        let aspect = width as f32 / height as f32;
        assert!((aspect - 5120.0 / 2880.0).abs() < 0.01);
    }

    #[test]
    fn test_tiny_limit_keeps_one_texel() {
        assert_eq!(fit_viewport(100, 100, 16), (1, 1));
        assert_eq!(fit_viewport(100, 100, 0), (1, 1));
    }
}
