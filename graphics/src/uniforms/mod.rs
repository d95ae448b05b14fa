//! Per-frame uniform state.
//!
//! [`GlobalUniformBlock`] is the semantic host-side block: camera matrices
//! for this frame and the previous one, lights, timing, exposure and the
//! live [`PostProcessSettings`]. [`FrameContext`] wraps it together with the
//! frame slot and is threaded by reference through every pass body.
//!
//! Only the wire copy ([`GpuGlobals`]) lives in ring-buffered GPU memory.

mod settings;
mod wire;

pub use settings::{
    AmbientOcclusionSettings, CompositionSettings, DepthOfFieldSettings, ExposureSettings,
    PostProcessSettings, SunSettings, TerrainSettings, ToneMappingSettings,
};
pub use wire::{
    GpuCameraMatrices, GpuGlobals, GpuPointLight, GpuPostProcess, GpuSpotLight, camera_to_wire,
    globals_to_wire, point_light_to_wire, settings_to_wire, spot_light_to_wire,
};

use stratus_core::math::{Mat4, Vec2, Vec3, Vec4, inverse_or_identity};
use stratus_core::scene::{SceneSnapshot, WorldPointLight, WorldSpotLight};

use crate::scheduler::FrameSlot;
use crate::types::Extent3d;

/// Capacity of the point light array.
pub const MAX_POINT_LIGHTS: usize = 16;

/// Capacity of the spot light array.
pub const MAX_SPOT_LIGHTS: usize = 16;

/// Camera matrices for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// Projection including the jitter offset.
    pub projection: Mat4,
    pub inverse_projection: Mat4,
    pub view: Mat4,
    pub inverse_view: Mat4,
    pub projection_view: Mat4,
    pub inverse_projection_view: Mat4,
    /// `projection_view * (0, 1, 0, 0)`, used by terrain clipping.
    pub terrain_clip_trick: Vec4,
    /// Sub-pixel offset in normalized device units.
    pub jitter: Vec2,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            inverse_projection: Mat4::identity(),
            view: Mat4::identity(),
            inverse_view: Mat4::identity(),
            projection_view: Mat4::identity(),
            inverse_projection_view: Mat4::identity(),
            terrain_clip_trick: Vec4::new(0.0, 1.0, 0.0, 0.0),
            jitter: Vec2::zeros(),
        }
    }
}

impl CameraMatrices {
    /// Derive all products from a view and an already jittered projection.
    pub fn new(view: Mat4, projection: Mat4, jitter: Vec2) -> Self {
        let projection_view = projection * view;
        Self {
            projection,
            inverse_projection: inverse_or_identity(&projection),
            view,
            inverse_view: inverse_or_identity(&view),
            projection_view,
            inverse_projection_view: inverse_or_identity(&projection_view),
            terrain_clip_trick: projection_view * Vec4::new(0.0, 1.0, 0.0, 0.0),
            jitter,
        }
    }
}

/// Host-side global uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalUniformBlock {
    pub current: CameraMatrices,
    pub previous: CameraMatrices,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
    /// Drawable size in pixels.
    pub resolution: Vec2,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Seconds since start.
    pub elapsed_time: f32,
    pub frame_counter: u32,
    /// Exposure applied by tone mapping this frame.
    pub exposure: f32,
    pub settings: PostProcessSettings,
    point_lights: Vec<WorldPointLight>,
    spot_lights: Vec<WorldSpotLight>,
}

impl Default for GlobalUniformBlock {
    fn default() -> Self {
        Self {
            current: CameraMatrices::default(),
            previous: CameraMatrices::default(),
            camera_position: Vec3::zeros(),
            near: 0.1,
            far: 1000.0,
            resolution: Vec2::zeros(),
            delta_time: 0.0,
            elapsed_time: 0.0,
            frame_counter: 0,
            exposure: 1.0,
            settings: PostProcessSettings::default(),
            point_lights: Vec::with_capacity(MAX_POINT_LIGHTS),
            spot_lights: Vec::with_capacity(MAX_SPOT_LIGHTS),
        }
    }
}

impl GlobalUniformBlock {
    /// Point lights accumulated this frame.
    pub fn point_lights(&self) -> &[WorldPointLight] {
        &self.point_lights
    }

    /// Spot lights accumulated this frame.
    pub fn spot_lights(&self) -> &[WorldSpotLight] {
        &self.spot_lights
    }

    /// Reset both light counts to zero.
    pub fn reset_lights(&mut self) {
        self.point_lights.clear();
        self.spot_lights.clear();
    }

    /// Append a point light. Returns `false` if the array is full.
    pub fn push_point_light(&mut self, light: WorldPointLight) -> bool {
        if self.point_lights.len() >= MAX_POINT_LIGHTS {
            return false;
        }
        self.point_lights.push(light);
        true
    }

    /// Append a spot light. Returns `false` if the array is full.
    pub fn push_spot_light(&mut self, light: WorldSpotLight) -> bool {
        if self.spot_lights.len() >= MAX_SPOT_LIGHTS {
            return false;
        }
        self.spot_lights.push(light);
        true
    }

    /// Re-accumulate the light arrays from a scene snapshot.
    ///
    /// Returns the number of lights dropped because an array was full.
    pub fn gather_lights(&mut self, snapshot: &SceneSnapshot) -> usize {
        self.reset_lights();
        let mut dropped = 0;
        for light in &snapshot.point_lights {
            if !self.push_point_light(*light) {
                dropped += 1;
            }
        }
        for light in &snapshot.spot_lights {
            if !self.push_spot_light(*light) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::warn!("GlobalUniformBlock: dropped {} lights over capacity", dropped);
        }
        dropped
    }

    /// Make this frame's camera the previous one.
    pub fn rotate_history(&mut self) {
        self.previous = self.current;
    }

    /// Wire representation.
    pub fn to_wire(&self) -> GpuGlobals {
        globals_to_wire(self)
    }
}

/// Everything a pass body may know about the frame being rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    pub globals: GlobalUniformBlock,
    /// Slot of the uniform rings written for this frame.
    pub slot: FrameSlot,
    /// Running submission count when this frame was started.
    pub submission: u64,
    /// Drawable extent.
    pub extent: Extent3d,
    /// World matrices of the objects drawn this frame, in slot order.
    pub objects: Vec<Mat4>,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            globals: GlobalUniformBlock::default(),
            slot: FrameSlot::new(0),
            submission: 0,
            extent: Extent3d::new_2d(1, 1),
            objects: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::math::perspective_rh;
    use stratus_core::scene::PointLight;

    fn point_light(x: f32) -> WorldPointLight {
        WorldPointLight {
            position: Vec3::new(x, 0.0, 0.0),
            light: PointLight {
                color: Vec3::new(1.0, 1.0, 1.0),
                intensity: 1.0,
                range: 5.0,
            },
        }
    }

    #[test]
    fn test_camera_products() {
        let view = Mat4::new_translation(&Vec3::new(0.0, -2.0, -5.0));
        let projection = perspective_rh(1.0, 1.5, 0.1, 100.0);
        let camera = CameraMatrices::new(view, projection, Vec2::new(0.001, -0.002));

        assert_eq!(camera.projection_view, projection * view);
        assert_eq!(
            camera.terrain_clip_trick,
            camera.projection_view.column(1).into_owned()
        );
        let identity = camera.projection_view * camera.inverse_projection_view;
        assert!((identity - Mat4::identity()).abs().max() < 1e-4);
    }

    #[test]
    fn test_light_capacity() {
        let mut block = GlobalUniformBlock::default();
        for i in 0..MAX_POINT_LIGHTS {
            assert!(block.push_point_light(point_light(i as f32)));
        }
        assert!(!block.push_point_light(point_light(99.0)));
        assert_eq!(block.point_lights().len(), MAX_POINT_LIGHTS);

        block.reset_lights();
        assert!(block.point_lights().is_empty());
    }

    #[test]
    fn test_gather_lights_resets_counts() {
        let mut block = GlobalUniformBlock::default();
        let snapshot = SceneSnapshot {
            objects: Vec::new(),
            point_lights: (0..20).map(|i| point_light(i as f32)).collect(),
            spot_lights: Vec::new(),
        };
        assert_eq!(block.gather_lights(&snapshot), 4);
        assert_eq!(block.gather_lights(&snapshot), 4);
        assert_eq!(block.point_lights().len(), MAX_POINT_LIGHTS);
    }

    #[test]
    fn test_rotate_history_copies_current() {
        let mut block = GlobalUniformBlock::default();
        block.current.view = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        block.rotate_history();
        assert_eq!(block.previous, block.current);
    }

    #[test]
    fn test_frame_context_default() {
        let frame = FrameContext::default();
        assert_eq!(frame.slot.index(), 0);
        assert_eq!(frame.globals.exposure, 1.0);
    }
}
