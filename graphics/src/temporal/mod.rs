//! State carried from one frame to the next.
//!
//! - **Jitter**: a sub-pixel offset injected into the projection each frame
//!   ([`JitterSequence`]).
//! - **Camera history**: the uniform block's previous matrices are a direct
//!   field copy of the current ones, made at the end of every frame. The
//!   previous color/velocity *images* are refreshed by copy passes in the
//!   graph instead.
//! - **Exposure**: resolved on the device, read back after the frame
//!   completes and applied on the next frame ([`exposure`]).

pub mod exposure;
mod jitter;

pub use exposure::{AutoExposureData, HISTOGRAM_BINS, HistogramParams, ResolveParams};
pub use jitter::{JITTER_PERIOD, JitterSequence, apply_jitter, sequence_offset};

use stratus_core::camera::Camera;
use stratus_core::math::Vec2;

use crate::types::Extent3d;
use crate::uniforms::{CameraMatrices, GlobalUniformBlock};

/// Temporal bookkeeping for the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalState {
    jitter: JitterSequence,
    history_valid: bool,
    exposure: f32,
    elapsed_time: f32,
    frame_counter: u32,
}

impl Default for TemporalState {
    fn default() -> Self {
        Self {
            jitter: JitterSequence::new(),
            history_valid: false,
            exposure: 1.0,
            elapsed_time: 0.0,
            frame_counter: 0,
        }
    }
}

impl TemporalState {
    /// Fresh state: no history, exposure 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// The jitter sequence.
    pub fn jitter(&self) -> &JitterSequence {
        &self.jitter
    }

    /// Exposure the next frame will apply.
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Returns `true` once a frame has populated the camera history.
    pub fn has_history(&self) -> bool {
        self.history_valid
    }

    /// Fill the current camera, timing and exposure of `globals`.
    ///
    /// On the very first frame the previous matrices are set equal to the
    /// current ones. After that they are only written by [`end_frame`](Self::end_frame).
    pub fn begin_frame(
        &mut self,
        globals: &mut GlobalUniformBlock,
        camera: &Camera,
        extent: Extent3d,
        delta_time: f32,
    ) {
        let jitter = self.jitter.advance(extent);
        let mut projection = camera.projection();
        apply_jitter(&mut projection, jitter);
        globals.current = CameraMatrices::new(camera.view(), projection, jitter);
        if !self.history_valid {
            globals.previous = globals.current;
            self.history_valid = true;
        }

        self.elapsed_time += delta_time;
        globals.camera_position = camera.position;
        globals.near = camera.near;
        globals.far = camera.far;
        globals.resolution = Vec2::new(extent.width as f32, extent.height as f32);
        globals.delta_time = delta_time;
        globals.elapsed_time = self.elapsed_time;
        globals.frame_counter = self.frame_counter;
        globals.exposure = self.exposure;
    }

    /// Copy this frame's camera into the previous slot.
    pub fn end_frame(&mut self, globals: &mut GlobalUniformBlock) {
        globals.rotate_history();
        self.frame_counter = self.frame_counter.wrapping_add(1);
    }

    /// Take the exposure resolved by the frame that just completed.
    ///
    /// Non-finite or non-positive values are ignored and the last good
    /// exposure is kept.
    pub fn apply_exposure_readback(&mut self, data: &AutoExposureData) {
        if data.exposure.is_finite() && data.exposure > 0.0 {
            self.exposure = data.exposure;
        } else {
            log::warn!(
                "TemporalState: ignoring invalid exposure readback {}",
                data.exposure
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::math::Vec3;

    fn extent() -> Extent3d {
        Extent3d::new_2d(320, 180)
    }

    #[test]
    fn test_first_frame_previous_equals_current() {
        let mut state = TemporalState::new();
        let mut globals = GlobalUniformBlock::default();
        state.begin_frame(&mut globals, &Camera::default(), extent(), 0.016);
        assert_eq!(globals.previous, globals.current);
    }

    #[test]
    fn test_previous_is_prior_current() {
        let mut state = TemporalState::new();
        let mut globals = GlobalUniformBlock::default();
        let mut camera = Camera::default();

        state.begin_frame(&mut globals, &camera, extent(), 0.016);
        let first = globals.current;
        state.end_frame(&mut globals);

        camera.position = Vec3::new(3.0, 1.0, 2.0);
        state.begin_frame(&mut globals, &camera, extent(), 0.016);
        assert_eq!(globals.previous, first);
        assert_ne!(globals.current, first);
    }

    #[test]
    fn test_jitter_enters_projection() {
        let mut state = TemporalState::new();
        let mut globals = GlobalUniformBlock::default();
        let camera = Camera::default();
        state.begin_frame(&mut globals, &camera, extent(), 0.016);

        let unjittered = camera.projection();
        let jitter = globals.current.jitter;
        assert_ne!(jitter, Vec2::zeros());
        assert_eq!(globals.current.projection[(0, 3)], unjittered[(0, 3)] + jitter.x);
        assert_eq!(globals.current.projection[(1, 3)], unjittered[(1, 3)] + jitter.y);
    }

    #[test]
    fn test_exposure_applies_next_frame() {
        let mut state = TemporalState::new();
        let mut globals = GlobalUniformBlock::default();
        state.begin_frame(&mut globals, &Camera::default(), extent(), 0.016);
        assert_eq!(globals.exposure, 1.0);

        state.apply_exposure_readback(&AutoExposureData {
            exposure: 0.5,
            ..Default::default()
        });
        assert_eq!(globals.exposure, 1.0);

        state.end_frame(&mut globals);
        state.begin_frame(&mut globals, &Camera::default(), extent(), 0.016);
        assert_eq!(globals.exposure, 0.5);
    }

    #[test]
    fn test_invalid_exposure_is_ignored() {
        let mut state = TemporalState::new();
        state.apply_exposure_readback(&AutoExposureData {
            exposure: f32::NAN,
            ..Default::default()
        });
        assert_eq!(state.exposure(), 1.0);
    }

    #[test]
    fn test_history_survives_extent_change() {
        let mut state = TemporalState::new();
        let mut globals = GlobalUniformBlock::default();
        let mut camera = Camera::default();
        state.begin_frame(&mut globals, &camera, extent(), 0.016);
        let first = globals.current;
        state.end_frame(&mut globals);
        assert!(state.has_history());

        camera.position = Vec3::new(9.0, 9.0, 9.0);
        state.begin_frame(&mut globals, &camera, Extent3d::new_2d(96, 64), 0.016);
        assert_eq!(globals.previous, first);
        assert_ne!(globals.previous, globals.current);
    }
}
