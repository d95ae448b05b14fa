//! Per-run state handed to the application handler.

use stratus_core::camera::Camera;
use stratus_core::scene::Scene;

/// Camera, scene and frame timing owned by the driver.
///
/// Handlers mutate the camera and scene between iterations; the driver
/// snapshots the scene right before each frame.
#[derive(Debug)]
pub struct AppContext {
    pub(crate) camera: Camera,
    pub(crate) scene: Scene,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) frame_number: u64,
    pub(crate) delta_time: f32,
    pub(crate) elapsed_time: f32,
}

impl AppContext {
    pub(crate) fn new(width: u32, height: u32, delta_time: f32) -> Self {
        let mut camera = Camera::default();
        camera.resize(width, height);
        Self {
            camera,
            scene: Scene::new(),
            width,
            height,
            frame_number: 0,
            delta_time,
            elapsed_time: 0.0,
        }
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.camera.resize(width, height);
    }

    pub(crate) fn advance(&mut self) {
        self.frame_number += 1;
        self.elapsed_time += self.delta_time;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Current drawable width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current drawable height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Loop iterations completed so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Seconds per iteration.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Simulated seconds since the loop started.
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }
}
