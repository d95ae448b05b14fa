//! Common utilities for frame loop integration tests.
//!
//! Everything runs on the software backend with a headless surface and a
//! manually driven window.

#![allow(dead_code)]

use std::sync::Arc;

use stratus_core::camera::Camera;
use stratus_core::scene::SceneSnapshot;
use stratus_graphics::backend::{BackendError, KernelContext, ResourceId};
use stratus_graphics::renderer::{COMPOSITION_PIPELINE, names};
use stratus_graphics::uniforms::GpuGlobals;
use stratus_graphics::{
    DummyBackend, Extent3d, FrameOutcome, FrameSlot, GraphicsDevice, HeadlessSurface,
    ManualWindow, Renderer, RendererConfig,
};

/// Frame time used by every test frame.
pub const DELTA_TIME: f32 = 1.0 / 60.0;

/// A renderer wired to a software device.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub renderer: Renderer<HeadlessSurface>,
    pub window: ManualWindow,
    pub camera: Camera,
    pub scene: SceneSnapshot,
}

impl TestContext {
    /// Renderer of `width`x`height` with `frames` frame slots.
    pub fn new(width: u32, height: u32, frames: u32) -> Self {
        Self::with_config(width, height, RendererConfig::default().with_frames_in_flight(frames))
    }

    pub fn with_config(width: u32, height: u32, config: RendererConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let backend = Arc::new(DummyBackend::new().with_log_capacity(256));
        let device = GraphicsDevice::new(backend.clone());
        let surface = HeadlessSurface::new(Extent3d::new_2d(width, height), 2);
        let renderer = match Renderer::new(device, surface, config) {
            Ok(renderer) => renderer,
            Err(error) => panic!("renderer setup failed: {error}"),
        };

        Self {
            backend,
            renderer,
            window: ManualWindow::new(width, height),
            camera: Camera::default(),
            scene: SceneSnapshot::default(),
        }
    }

    /// Make composition fill the color image with `value`.
    pub fn compose_constant(&self, value: [f32; 4]) {
        self.renderer.device().register_kernel(
            COMPOSITION_PIPELINE,
            Arc::new(move |ctx: &mut KernelContext<'_>| -> Result<(), BackendError> {
                ctx.set_texture_value(0, Some(value))
            }),
        );
    }

    /// Run one loop iteration.
    pub fn frame(&mut self) -> FrameOutcome {
        match self
            .renderer
            .render_frame(&mut self.window, &self.camera, &self.scene, DELTA_TIME)
        {
            Ok(outcome) => outcome,
            Err(error) => panic!("frame failed: {error}"),
        }
    }

    /// Run one iteration that must present, returning its slot.
    pub fn presented_frame(&mut self) -> FrameSlot {
        match self.frame() {
            FrameOutcome::Presented { slot, .. } => slot,
            other => panic!("expected a presented frame, got {other:?}"),
        }
    }

    /// Wire globals last written to `slot`.
    pub fn globals_in_slot(&self, slot: FrameSlot) -> GpuGlobals {
        let bytes = self
            .renderer
            .globals_ring()
            .read(self.renderer.device(), slot)
            .unwrap();
        bytemuck::pod_read_unaligned(&bytes)
    }

    /// Software contents of a registry image.
    pub fn image_value(&self, name: &str) -> Option<[f32; 4]> {
        let texture = self.renderer.registry().texture(name).unwrap();
        self.backend.texture_value(texture.id()).flatten()
    }

    /// Software contents of the last presented image.
    pub fn presented_value(&self) -> Option<[f32; 4]> {
        let texture = self.renderer.surface().last_presented()?;
        self.backend.texture_value(texture.id()).flatten()
    }

    /// Id pair (resolved, previous color) of the history copy.
    pub fn history_ids(&self) -> (ResourceId, ResourceId) {
        let registry = self.renderer.registry();
        (
            registry.texture(names::RESOLVED).unwrap().id(),
            registry.texture(names::PREVIOUS_COLOR).unwrap().id(),
        )
    }
}
