use std::collections::HashSet;
use std::f32::consts::FRAC_1_SQRT_2;

use glam::Vec2;
use pathtracer_shared::TracerConfig;
use winit::event::{ElementState, MouseButton, VirtualKeyCode};

use crate::camera::Camera;

/// Input handling state
///
/// Collects held keys and drag deltas between frames; [`InputState::apply`]
/// turns them into camera movement once per frame.
pub struct InputState {
    held_keys: HashSet<VirtualKeyCode>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    look_delta: Vec2,
    toggle_mode: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held_keys: HashSet::new(),
            mouse_pressed: false,
            last_mouse_pos: None,
            look_delta: Vec2::ZERO,
            toggle_mode: false,
        }
    }

    /// Handle keyboard events
    pub fn handle_keyboard(&mut self, key: VirtualKeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if key == VirtualKeyCode::F && !self.held_keys.contains(&key) {
                    self.toggle_mode = true;
                }
                self.held_keys.insert(key);
            }
            ElementState::Released => {
                self.held_keys.remove(&key);
            }
        }
    }

    /// Handle mouse input events
    pub fn handle_mouse_input(&mut self, button: MouseButton, button_state: ElementState) {
        if button == MouseButton::Left {
            self.mouse_pressed = button_state == ElementState::Pressed;
        }
    }

    /// Handle cursor movement, accumulating a look delta while dragging
    pub fn handle_cursor_moved(&mut self, position: winit::dpi::PhysicalPosition<f64>) {
        if self.mouse_pressed {
            if let Some(last_pos) = self.last_mouse_pos {
                let delta_x = position.x - last_pos.0;
                let delta_y = position.y - last_pos.1;
                self.look_delta += Vec2::new(delta_x as f32, delta_y as f32);
            }
        }

        self.last_mouse_pos = Some((position.x, position.y));
    }

    /// Drop held keys, e.g. when the window loses focus
    pub fn clear(&mut self) {
        self.held_keys.clear();
        self.mouse_pressed = false;
        self.look_delta = Vec2::ZERO;
    }

    fn axis(&self, positive: VirtualKeyCode, negative: VirtualKeyCode) -> f32 {
        let mut value = 0.0;
        if self.held_keys.contains(&positive) {
            value += 1.0;
        }
        if self.held_keys.contains(&negative) {
            value -= 1.0;
        }
        value
    }

    /// Apply this frame's input to the camera. Returns whether anything moved it.
    pub fn apply(&mut self, camera: &mut Camera, delta_seconds: f32) -> bool {
        let mut applied = false;

        if self.toggle_mode {
            self.toggle_mode = false;
            camera.mode = camera.mode.toggled();
            log::info!("Camera movement mode: {:?}", camera.mode);
            applied = true;
        }

        if self.look_delta != Vec2::ZERO {
            camera.apply_look(self.look_delta);
            self.look_delta = Vec2::ZERO;
            applied = true;
        }

        let forward = self.axis(VirtualKeyCode::W, VirtualKeyCode::S);
        let sideways = self.axis(VirtualKeyCode::D, VirtualKeyCode::A);
        let vertical = self.axis(VirtualKeyCode::Space, VirtualKeyCode::LShift);

        let mut step = TracerConfig::CAMERA_MOVE_SPEED * delta_seconds;
        // Diagonal moves cover the same distance as straight ones
        if forward != 0.0 && sideways != 0.0 {
            step *= FRAC_1_SQRT_2;
        }

        if forward != 0.0 {
            camera.advance(forward * step);
            applied = true;
        }
        if sideways != 0.0 {
            camera.truck(sideways * step);
            applied = true;
        }
        if vertical != 0.0 {
            camera.rise(vertical * step);
            applied = true;
        }

        applied
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MovementMode;
    use glam::Vec3;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_no_input_leaves_camera_untouched() {
        let mut input = InputState::new();
        let mut camera = Camera::default();

        assert!(!input.apply(&mut camera, 1.0 / 60.0));
        assert_eq!(camera.target_position, Vec3::ZERO);
    }

    #[test]
    fn test_held_keys_move_target() {
        let mut input = InputState::new();
        let mut camera = Camera::default();

        input.handle_keyboard(VirtualKeyCode::W, ElementState::Pressed);
        input.handle_keyboard(VirtualKeyCode::D, ElementState::Pressed);
        assert!(input.apply(&mut camera, 1.0));

        let step = TracerConfig::CAMERA_MOVE_SPEED * FRAC_1_SQRT_2;
        assert!(camera.target_position.abs_diff_eq(Vec3::new(step, 0.0, step), 1e-5));

        input.handle_keyboard(VirtualKeyCode::W, ElementState::Released);
        input.handle_keyboard(VirtualKeyCode::D, ElementState::Released);
        assert!(!input.apply(&mut camera, 1.0));
    }

    #[test]
    fn test_diagonal_speed_matches_straight() {
        let mut input = InputState::new();
        let mut straight = Camera::default();
        input.handle_keyboard(VirtualKeyCode::W, ElementState::Pressed);
        input.apply(&mut straight, 1.0);

        let mut diagonal = Camera::default();
        input.handle_keyboard(VirtualKeyCode::D, ElementState::Pressed);
        input.apply(&mut diagonal, 1.0);

        let straight_distance = straight.target_position.length();
        let diagonal_distance = diagonal.target_position.length();
        assert!((straight_distance - TracerConfig::CAMERA_MOVE_SPEED).abs() < 1e-4);
        assert!((diagonal_distance - straight_distance).abs() < 1e-4);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut input = InputState::new();
        let mut camera = Camera::default();

        input.handle_keyboard(VirtualKeyCode::Space, ElementState::Pressed);
        input.handle_keyboard(VirtualKeyCode::LShift, ElementState::Pressed);
        assert!(!input.apply(&mut camera, 1.0));
    }

    #[test]
    fn test_drag_turns_camera() {
        let mut input = InputState::new();
        let mut camera = Camera::default();

        input.handle_cursor_moved(PhysicalPosition::new(10.0, 10.0));
        input.handle_cursor_moved(PhysicalPosition::new(50.0, 10.0));
        assert!(!input.apply(&mut camera, 1.0 / 60.0));

        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        input.handle_cursor_moved(PhysicalPosition::new(150.0, 10.0));
        assert!(input.apply(&mut camera, 1.0 / 60.0));
        assert!((camera.rotation.y - 100.0 * TracerConfig::CAMERA_TURN_VELOCITY).abs() < 1e-6);
    }

    #[test]
    fn test_mode_toggles_once_per_press() {
        let mut input = InputState::new();
        let mut camera = Camera::default();

        input.handle_keyboard(VirtualKeyCode::F, ElementState::Pressed);
        // Key repeat delivers more presses without a release
        input.handle_keyboard(VirtualKeyCode::F, ElementState::Pressed);
        assert!(input.apply(&mut camera, 1.0 / 60.0));
        assert_eq!(camera.mode, MovementMode::Fly);

        assert!(!input.apply(&mut camera, 1.0 / 60.0));
        assert_eq!(camera.mode, MovementMode::Fly);
    }
}
