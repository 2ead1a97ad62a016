use std::borrow::Cow;

use pathtracer_shared::CameraUniform;

use crate::error::RendererError;

const PATHTRACE_SHADER: &str = include_str!("../shaders/pathtrace.wgsl");
const DISPLAY_SHADER: &str = include_str!("../shaders/display.wgsl");

/// Output texture format written by the compute pass and sampled for display
pub const OUTPUT_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Compiled pipelines and the bind group layouts they were built from
pub struct Pipelines {
    pub compute_pipeline: wgpu::ComputePipeline,
    pub render_pipeline: wgpu::RenderPipeline,
    pub compute_bind_group_layout: wgpu::BindGroupLayout,
    pub render_bind_group_layout: wgpu::BindGroupLayout,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(size),
        },
        count: None,
    }
}

/// Compile a WGSL module, turning validation errors into [`RendererError`]
async fn compile_shader(device: &wgpu::Device, label: &str, source: &'static str) -> Result<wgpu::ShaderModule, RendererError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });

    match device.pop_error_scope().await {
        Some(error) => Err(RendererError::ShaderCompileFailed {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(module),
    }
}

pub async fn create_pipelines(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Pipelines, RendererError> {
    let pathtrace_module = compile_shader(device, "Path Trace Shader", PATHTRACE_SHADER).await?;
    let display_module = compile_shader(device, "Display Shader", DISPLAY_SHADER).await?;

    let compute_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Compute Bind Group Layout"),
        entries: &[
            // Binding 0: Tone-mapped output texture
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: OUTPUT_TEXTURE_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            // Binding 1: Previous accumulation
            storage_entry(1, true),
            // Binding 2: Next accumulation
            storage_entry(2, false),
            // Binding 3: Camera
            uniform_entry(3, std::mem::size_of::<CameraUniform>() as u64),
            // Binding 4: Spheres
            storage_entry(4, true),
            // Binding 5: Materials
            storage_entry(5, true),
            // Binding 6: Frame index
            uniform_entry(6, std::mem::size_of::<u32>() as u64),
            // Binding 7: Accumulate flag
            uniform_entry(7, std::mem::size_of::<u32>() as u64),
        ],
    });

    let render_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Render Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    // Entry point mismatches and binding/layout disagreements surface here
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Compute Pipeline Layout"),
        bind_group_layouts: &[&compute_bind_group_layout],
        push_constant_ranges: &[],
    });

    let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Compute Pipeline"),
        layout: Some(&compute_pipeline_layout),
        module: &pathtrace_module,
        entry_point: "main_cs",
    });

    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Render Pipeline Layout"),
        bind_group_layouts: &[&render_bind_group_layout],
        push_constant_ranges: &[],
    });

    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Render Pipeline"),
        layout: Some(&render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &display_module,
            entry_point: "main_vs",
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &display_module,
            entry_point: "main_fs",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    });

    if let Some(error) = device.pop_error_scope().await {
        return Err(RendererError::ShaderCompileFailed {
            label: "pipeline link".to_string(),
            message: error.to_string(),
        });
    }

    Ok(Pipelines {
        compute_pipeline,
        render_pipeline,
        compute_bind_group_layout,
        render_bind_group_layout,
    })
}
