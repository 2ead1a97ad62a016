#![no_std]

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Configuration constants for the path tracer
pub struct TracerConfig;

impl TracerConfig {
    /// Must match `@workgroup_size` in `pathtrace.wgsl`
    pub const WORKGROUP_SIZE: (u32, u32) = (8, 8);
    pub const FULLSCREEN_VERTEX_COUNT: u32 = 6;
    pub const ACCUMULATION_TEXEL_SIZE: u64 = 16; // one vec4<f32> per pixel

    pub const CAMERA_TURN_VELOCITY: f32 = 0.001;
    pub const CAMERA_LERP_FACTOR: f32 = 0.95;
    pub const CAMERA_MOVE_SPEED: f32 = 3.0; // world units per second
    pub const REFERENCE_FRAME_RATE: f32 = 60.0;
    pub const SETTLE_THRESHOLD: f32 = 0.025;
    pub const WORLD_UP: [f32; 3] = [0.0, 1.0, 0.0];

    pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
    pub const NEAR_PLANE: f32 = 0.1;
    pub const FAR_PLANE: f32 = 1000.0;

    pub const INITIAL_WINDOW_SIZE: (u32, u32) = (1280, 720);
    pub const PERFORMANCE_STATS_INTERVAL: u64 = 120; // frames
    pub const MILLISECONDS_PER_SECOND: f32 = 1000.0;
}

/// Camera uniform consumed by the compute shader.
///
/// 144 bytes: inverse projection, inverse view, eye position and one pad
/// float. The shader traces rays from clip space back to world space, so
/// only the inverted matrices are uploaded.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CameraUniform {
    pub projection_inverse: [f32; 16],
    pub view_inverse: [f32; 16],
    pub position: [f32; 3],
    pub _padding: f32,
}

/// Sphere record in the mesh storage buffer.
///
/// Eight floats: `x, y, z, reserved, radius, material_index, pad, pad`.
/// Slot 3 is reserved and always zero. The material index is stored as a
/// float holding an integer value, exact up to 2^24.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SphereRecord {
    pub center: [f32; 3],
    pub _reserved: f32,
    pub radius: f32,
    pub material_index: f32,
    pub _padding: [f32; 2],
}

/// Material record in the material storage buffer.
///
/// Twelve floats: `albedo.xyz, pad, emission.xyz, pad, roughness,
/// emission_strength, pad, pad`.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialRecord {
    pub albedo: [f32; 3],
    pub _padding0: f32,
    pub emission_color: [f32; 3],
    pub _padding1: f32,
    pub roughness: f32,
    pub emission_strength: f32,
    pub _padding2: [f32; 2],
}

/// Reads one `T` from the front of a float slice.
fn record_from_floats<T: Pod>(floats: &[f32], len: usize) -> Option<T> {
    let floats = floats.get(..len)?;
    bytemuck::try_cast_slice::<f32, T>(floats).ok()?.first().copied()
}

impl CameraUniform {
    pub const FLOATS: usize = 36;

    pub fn new(projection_inverse: Mat4, view_inverse: Mat4, position: Vec3) -> Self {
        Self {
            projection_inverse: projection_inverse.to_cols_array(),
            view_inverse: view_inverse.to_cols_array(),
            position: position.to_array(),
            _padding: 0.0,
        }
    }

    pub fn to_floats(&self) -> [f32; Self::FLOATS] {
        let mut floats = [0.0; Self::FLOATS];
        floats.copy_from_slice(bytemuck::cast_slice(core::slice::from_ref(self)));
        floats
    }
}

impl SphereRecord {
    pub const FLOATS: usize = 8;

    pub fn new(center: [f32; 3], radius: f32, material_index: u32) -> Self {
        Self {
            center,
            _reserved: 0.0,
            radius,
            material_index: material_index as f32,
            _padding: [0.0; 2],
        }
    }

    pub fn material_index(&self) -> u32 {
        self.material_index as u32
    }

    pub fn from_floats(floats: &[f32]) -> Option<Self> {
        record_from_floats(floats, Self::FLOATS)
    }
}

impl MaterialRecord {
    pub const FLOATS: usize = 12;

    pub fn new(albedo: [f32; 3], roughness: f32, emission_color: [f32; 3], emission_strength: f32) -> Self {
        Self {
            albedo,
            _padding0: 0.0,
            emission_color,
            _padding1: 0.0,
            roughness,
            emission_strength,
            _padding2: [0.0; 2],
        }
    }

    pub fn from_floats(floats: &[f32]) -> Option<Self> {
        record_from_floats(floats, Self::FLOATS)
    }
}

/// Helper functions for compute dispatch sizing
pub struct WorkgroupHelper;

impl WorkgroupHelper {
    /// Workgroup grid covering a `width` x `height` viewport
    pub fn dispatch_size(width: u32, height: u32) -> (u32, u32) {
        let (group_x, group_y) = TracerConfig::WORKGROUP_SIZE;
        let workgroups_x = (width + group_x - 1) / group_x;
        let workgroups_y = (height + group_y - 1) / group_y;
        (workgroups_x, workgroups_y)
    }

    /// Size in bytes of one accumulation buffer for the viewport
    pub fn accumulation_buffer_size(width: u32, height: u32) -> u64 {
        let texels = (width as u64 * height as u64).max(1);
        texels * TracerConfig::ACCUMULATION_TEXEL_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn test_record_sizes_match_shader_layout() {
        assert_eq!(size_of::<CameraUniform>(), 144);
        assert_eq!(size_of::<SphereRecord>(), SphereRecord::FLOATS * 4);
        assert_eq!(size_of::<MaterialRecord>(), MaterialRecord::FLOATS * 4);
    }

    #[test]
    fn test_sphere_record_layout() {
        let record = SphereRecord::new([1.0, 2.0, 3.0], 10.0, 7);
        let floats: &[f32] = bytemuck::cast_slice(core::slice::from_ref(&record));

        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 10.0, 7.0, 0.0, 0.0]);
        assert_eq!(record.material_index(), 7);
    }

    #[test]
    fn test_material_record_layout() {
        let record = MaterialRecord::new([0.1, 0.2, 0.3], 0.5, [1.0, 0.9, 0.8], 4.0);
        let floats: &[f32] = bytemuck::cast_slice(core::slice::from_ref(&record));

        assert_eq!(floats, &[0.1, 0.2, 0.3, 0.0, 1.0, 0.9, 0.8, 0.0, 0.5, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_records_read_back_from_floats() {
        let floats = [0.0, -1.0, 2.5, 0.0, 1.0, 3.0, 0.0, 0.0, 99.0];
        let record = SphereRecord::from_floats(&floats).unwrap();
        assert_eq!(record.center, [0.0, -1.0, 2.5]);
        assert_eq!(record.radius, 1.0);
        assert_eq!(record.material_index(), 3);

        assert!(SphereRecord::from_floats(&floats[..7]).is_none());
        assert!(MaterialRecord::from_floats(&floats).is_none());
    }

    #[test]
    fn test_camera_uniform_floats() {
        let uniform = CameraUniform::new(Mat4::IDENTITY, Mat4::from_scale(Vec3::splat(2.0)), Vec3::new(0.0, 0.0, -6.0));
        let floats = uniform.to_floats();

        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[5], 1.0);
        assert_eq!(floats[16], 2.0);
        assert_eq!(floats[31], 1.0);
        assert_eq!(&floats[32..], &[0.0, 0.0, -6.0, 0.0]);
    }

    #[test]
    fn test_dispatch_size_rounds_up() {
        assert_eq!(WorkgroupHelper::dispatch_size(800, 600), (100, 75));
        assert_eq!(WorkgroupHelper::dispatch_size(801, 601), (101, 76));
        assert_eq!(WorkgroupHelper::dispatch_size(1, 1), (1, 1));
        assert_eq!(WorkgroupHelper::dispatch_size(0, 0), (0, 0));
    }

    #[test]
    fn test_accumulation_buffer_size() {
        assert_eq!(WorkgroupHelper::accumulation_buffer_size(4, 2), 128);
        assert_eq!(WorkgroupHelper::accumulation_buffer_size(0, 0), 16);
    }
}
