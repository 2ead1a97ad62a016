use crate::camera::Camera;

/// Per-frame values uploaded to the compute shader
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameParams {
    pub frame_index: u32,
    pub accumulate: bool,
    /// Accumulation buffer the compute pass reads; it writes the other one
    pub read_slot: usize,
}

impl FrameParams {
    /// Value of the accumulate-flag uniform
    pub fn accumulate_flag(&self) -> u32 {
        self.accumulate as u32
    }
}

/// Progressive accumulation state.
///
/// The frame index counts frames since the last reset. The accumulation
/// storage is a ping-pong pair, so every frame reads one buffer and writes
/// the other.
#[derive(Clone, Debug, Default)]
pub struct AccumulationState {
    frame_index: u32,
    accumulate: bool,
    read_slot: usize,
}

impl AccumulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Step to the next frame, restarting the run when `accumulate` is false
    pub fn advance(&mut self, accumulate: bool) -> FrameParams {
        if accumulate {
            self.frame_index = self.frame_index.saturating_add(1);
        } else {
            if self.accumulate {
                log::debug!("Accumulation reset after {} frames", self.frame_index);
            }
            self.frame_index = 0;
        }
        self.accumulate = accumulate;

        let params = FrameParams {
            frame_index: self.frame_index,
            accumulate,
            read_slot: self.read_slot,
        };
        self.read_slot ^= 1;
        params
    }

    /// Forget the current run, e.g. after the accumulation storage was reallocated
    pub fn reset(&mut self) {
        self.frame_index = 0;
        self.accumulate = false;
        self.read_slot = 0;
    }
}

/// Whether this frame may blend into the running average
pub fn should_accumulate(camera: &Camera, input_applied: bool, threshold: f32) -> bool {
    !input_applied && camera.is_settled(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use pathtracer_shared::TracerConfig;

    #[test]
    fn test_reset_is_idempotent() {
        let mut state = AccumulationState::new();
        state.advance(true);
        state.advance(true);

        assert_eq!(state.advance(false).frame_index, 0);
        assert_eq!(state.advance(false).frame_index, 0);
        assert_eq!(state.frame_index(), 0);
    }

    #[test]
    fn test_accumulation_progression() {
        let mut state = AccumulationState::new();
        let mut indices = vec![state.advance(false).frame_index];
        for _ in 0..5 {
            indices.push(state.advance(true).frame_index);
        }

        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(state.accumulate);
    }

    #[test]
    fn test_read_slot_alternates() {
        let mut state = AccumulationState::new();
        let slots: Vec<usize> = (0..4).map(|i| state.advance(i % 3 != 0).read_slot).collect();
        assert_eq!(slots, vec![0, 1, 0, 1]);

        state.reset();
        assert_eq!(state.advance(true).read_slot, 0);
    }

    #[test]
    fn test_reset_restarts_run() {
        let mut state = AccumulationState::new();
        for _ in 0..3 {
            state.advance(true);
        }
        state.reset();

        assert_eq!(state.frame_index(), 0);
        assert!(!state.accumulate);
        assert_eq!(state.advance(true).frame_index, 1);
    }

    #[test]
    fn test_accumulate_flag_values() {
        let mut state = AccumulationState::new();
        assert_eq!(state.advance(false).accumulate_flag(), 0);
        assert_eq!(state.advance(true).accumulate_flag(), 1);
    }

    #[test]
    fn test_still_camera_accumulates_for_ten_ticks() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, 0.0, -6.0));
        let mut state = AccumulationState::new();

        for _ in 0..10 {
            camera.settle(1.0 / 60.0);
            let accumulate = should_accumulate(&camera, false, TracerConfig::SETTLE_THRESHOLD);
            assert!(accumulate);
            state.advance(accumulate);
        }

        assert!(camera.is_settled(0.025));
        assert_eq!(state.frame_index(), 10);
    }

    #[test]
    fn test_camera_motion_resets_accumulation() {
        let mut camera = Camera::default();
        let mut state = AccumulationState::new();
        for _ in 0..4 {
            camera.settle(1.0 / 60.0);
            state.advance(should_accumulate(&camera, false, TracerConfig::SETTLE_THRESHOLD));
        }
        assert_eq!(state.frame_index(), 4);

        camera.apply_look(Vec2::new(25.0, 0.0));
        camera.settle(1.0 / 60.0);
        let params = state.advance(should_accumulate(&camera, true, TracerConfig::SETTLE_THRESHOLD));
        assert_eq!(params.frame_index, 0);
        assert!(!params.accumulate);
    }
}
