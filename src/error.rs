use thiserror::Error;

/// Errors surfaced while bringing up the GPU path tracer or rendering a frame
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("graphics backend unavailable: {0}")]
    UnsupportedBackend(String),

    #[error("no usable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    #[error("failed to compile shader `{label}`: {message}")]
    ShaderCompileFailed { label: String, message: String },

    #[error("mesh {mesh} references material {material}, but the scene has {material_count} materials")]
    InvalidSceneReference {
        mesh: usize,
        material: u32,
        material_count: usize,
    },
}
