use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec2, Vec3};
use pathtracer_shared::{CameraUniform, TracerConfig};

use crate::math::{clamp_pitch, easing_factor, spherical_to_cartesian, wrap_angle};

/// How forward and vertical input moves the camera
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementMode {
    /// Forward stays level regardless of pitch, vertical is world-up
    Walk,
    /// Forward follows the view direction, vertical follows the camera's up
    Fly,
}

impl MovementMode {
    pub fn toggled(self) -> Self {
        match self {
            MovementMode::Walk => MovementMode::Fly,
            MovementMode::Fly => MovementMode::Walk,
        }
    }
}

/// First-person camera with damped movement.
///
/// Movement input only changes `target_position`; [`Camera::settle`] eases
/// `position` toward it. `rotation` holds pitch (x) and yaw (y) in radians,
/// and the basis vectors are always derived from it.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target_position: Vec3,
    pub rotation: Vec3,
    pub mode: MovementMode,

    forward: Vec3,
    right: Vec3,
    up: Vec3,
    previous_forward: Vec3,
    turned: bool,

    field_of_view: f32,
    aspect_ratio: f32,
    near_clip_plane: f32,
    far_clip_plane: f32,
    projection_inverse: Mat4,
    view_inverse: Mat4,
}

impl Camera {
    /// Create a camera at the origin facing +Z. `field_of_view` is in degrees.
    pub fn new(field_of_view: f32, aspect_ratio: f32, near_clip_plane: f32, far_clip_plane: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target_position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            mode: MovementMode::Walk,
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            // Equal to `forward`, so a camera that never moves counts as
            // settled from its first tick
            previous_forward: Vec3::Z,
            turned: false,
            field_of_view: field_of_view.to_radians(),
            aspect_ratio,
            near_clip_plane,
            far_clip_plane,
            projection_inverse: Mat4::IDENTITY,
            view_inverse: Mat4::IDENTITY,
        };
        camera.refresh_matrices();
        camera
    }

    /// Camera with the default lens for the given aspect ratio
    pub fn with_aspect_ratio(aspect_ratio: f32) -> Self {
        Self::new(
            TracerConfig::DEFAULT_FOV_DEGREES,
            aspect_ratio,
            TracerConfig::NEAR_PLANE,
            TracerConfig::FAR_PLANE,
        )
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Place the camera without easing
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.target_position = position;
    }

    /// Turn by a pointer delta in pixels
    pub fn apply_look(&mut self, delta: Vec2) {
        let delta = delta * TracerConfig::CAMERA_TURN_VELOCITY;

        let pitch = clamp_pitch(self.rotation.x - delta.y);
        let yaw = wrap_angle(self.rotation.y + delta.x);
        self.rotation.x = pitch;
        self.rotation.y = yaw;

        self.forward = spherical_to_cartesian(yaw, pitch);
        self.right = spherical_to_cartesian(yaw + FRAC_PI_2, 0.0);
        self.up = self.forward.cross(self.right);
    }

    /// Move sideways; positive is to the right
    pub fn truck(&mut self, amount: f32) {
        self.target_position += self.right * amount;
    }

    /// Move along the camera's up vector
    pub fn pedestal(&mut self, amount: f32) {
        self.target_position += self.up * amount;
    }

    /// Move along the view direction, including its pitch
    pub fn dolly(&mut self, amount: f32) {
        self.target_position += self.forward * amount;
    }

    pub fn move_y(&mut self, amount: f32) {
        self.target_position.y += amount;
    }

    /// Move forward on the horizontal plane, ignoring pitch
    pub fn move_z(&mut self, amount: f32) {
        let level_forward = self.right.cross(Vec3::from(TracerConfig::WORLD_UP));
        self.target_position += level_forward * amount;
    }

    /// Forward movement according to the current [`MovementMode`]
    pub fn advance(&mut self, amount: f32) {
        match self.mode {
            MovementMode::Walk => self.move_z(amount),
            MovementMode::Fly => self.dolly(amount),
        }
    }

    /// Vertical movement according to the current [`MovementMode`]
    pub fn rise(&mut self, amount: f32) {
        match self.mode {
            MovementMode::Walk => self.move_y(amount),
            MovementMode::Fly => self.pedestal(amount),
        }
    }

    /// Ease `position` toward `target_position` and close the tick.
    ///
    /// The easing decays by `CAMERA_LERP_FACTOR` per reference tick, so the
    /// feel does not depend on the refresh rate.
    pub fn settle(&mut self, delta_seconds: f32) {
        let factor = easing_factor(
            TracerConfig::CAMERA_LERP_FACTOR,
            delta_seconds,
            TracerConfig::REFERENCE_FRAME_RATE,
        );
        self.position = self.target_position.lerp(self.position, factor);

        self.turned = self.forward != self.previous_forward;
        self.previous_forward = self.forward;
    }

    /// True once position has converged and the view did not turn last tick
    pub fn is_settled(&self, threshold: f32) -> bool {
        let offset = (self.target_position - self.position).abs();
        offset.cmplt(Vec3::splat(threshold)).all() && !self.turned
    }

    pub fn refresh_matrices(&mut self) {
        self.projection_inverse = Mat4::perspective_lh(
            self.field_of_view,
            self.aspect_ratio,
            self.near_clip_plane,
            self.far_clip_plane,
        )
        .inverse();
        self.view_inverse = Mat4::look_at_lh(self.position, self.position + self.forward, self.up).inverse();
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform::new(self.projection_inverse, self.view_inverse, self.position)
    }

    /// `[projection_inverse(16), view_inverse(16), position(3), pad]`
    pub fn serialize(&self) -> [f32; CameraUniform::FLOATS] {
        self.uniform().to_floats()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::with_aspect_ratio(1.0)
    }
}
