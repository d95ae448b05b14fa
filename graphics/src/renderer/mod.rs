//! The stock deferred renderer.
//!
//! [`Renderer`] ties the frame machinery together: it declares the stock
//! resources, builds and compiles the stock pass set, and runs one loop
//! iteration per [`render_frame`](Renderer::render_frame) call:
//!
//! 1. honour a close request or a pending resize,
//! 2. ask the pipeline reloader to reload,
//! 3. acquire a presentable image (skip the frame if there is none),
//! 4. update the temporal state and write the frame's uniforms,
//! 5. record the compiled graph, submit and present,
//! 6. resolve GPU timings and read the exposure back for the next frame.
//!
//! # Example
//!
//! ```ignore
//! let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
//! let surface = HeadlessSurface::new(Extent3d::new_2d(1280, 720), 2);
//! let mut renderer = Renderer::new(device, surface, RendererConfig::default())?;
//!
//! loop {
//!     match renderer.render_frame(&mut window, &camera, &scene.snapshot(), dt)? {
//!         FrameOutcome::CloseRequested => break,
//!         FrameOutcome::Resized(extent) => camera.resize(extent.width, extent.height),
//!         _ => {}
//!     }
//! }
//! ```

mod kernels;
mod passes;
mod resources;

pub use kernels::{
    COMPOSITION_PIPELINE, HISTORY_WEIGHT, TAA_PIPELINE, TONE_MAPPING_PIPELINE, ToneMapParams,
    register_reference_kernels, taa_kernel, temporal_blend, tone_mapping_kernel,
};
pub use passes::build_frame_passes;
pub use resources::{declare_stock_resources, names};

use std::sync::Arc;

use stratus_core::camera::Camera;
use stratus_core::scene::SceneSnapshot;

use crate::backend::SubmissionIndex;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::graph::{CompiledGraph, PassGraph};
use crate::metrics::{DEFAULT_HISTORY_CAPACITY, DEFAULT_QUERY_CAPACITY, MetricInstrumentation};
use crate::reload::{PipelineReloader, report_reload};
use crate::resources::{ResourceRegistry, UniformRing};
use crate::scheduler::{FrameScheduler, FrameSlot, OBJECT_TRANSFORM_SIZE};
use crate::swapchain::Surface;
use crate::temporal::exposure::read_exposure;
use crate::temporal::{AutoExposureData, TemporalState};
use crate::types::Extent3d;
use crate::uniforms::{FrameContext, GpuGlobals, PostProcessSettings};
use crate::window::WindowState;

/// Terrain patches along each edge of the grid.
const TERRAIN_GRID: u32 = 64;

/// Bytes per terrain vertex (position and uv).
const TERRAIN_VERTEX_SIZE: u64 = 20;

/// Optional effects. Changing them rebuilds the pass set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureToggles {
    pub screen_space_reflections: bool,
    pub depth_of_field: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            screen_space_reflections: true,
            depth_of_field: true,
        }
    }
}

/// Renderer construction options.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Frame slots; `None` uses the surface's frames in flight.
    pub frames_in_flight: Option<u32>,
    pub features: FeatureToggles,
    /// Samples kept per metric series.
    pub history_capacity: usize,
    /// Passes that can be timed.
    pub query_capacity: u32,
    /// Object transforms per frame slot.
    pub object_capacity: u32,
    pub terrain_vertex_buffer_size: u64,
    pub terrain_index_buffer_size: u64,
    pub terrain_index_count: u32,
    pub terrain_normal_map_size: u32,
    pub shadow_map_size: u32,
    pub bloom_mips: u32,
    /// Register host kernels for the software backend.
    pub register_reference_kernels: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let vertices = u64::from(TERRAIN_GRID + 1).pow(2);
        let indices = TERRAIN_GRID * TERRAIN_GRID * 4;
        Self {
            frames_in_flight: None,
            features: FeatureToggles::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            query_capacity: DEFAULT_QUERY_CAPACITY,
            object_capacity: 1024,
            terrain_vertex_buffer_size: vertices * TERRAIN_VERTEX_SIZE,
            terrain_index_buffer_size: u64::from(indices) * 4,
            terrain_index_count: indices,
            terrain_normal_map_size: 1024,
            shadow_map_size: 4096,
            bloom_mips: 4,
            register_reference_kernels: true,
        }
    }
}

impl RendererConfig {
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = Some(frames.max(1));
        self
    }

    pub fn with_features(mut self, features: FeatureToggles) -> Self {
        self.features = features;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_query_capacity(mut self, capacity: u32) -> Self {
        self.query_capacity = capacity;
        self
    }

    pub fn with_object_capacity(mut self, capacity: u32) -> Self {
        self.object_capacity = capacity.max(1);
        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.max(1);
        self
    }

    pub fn with_reference_kernels(mut self, enabled: bool) -> Self {
        self.register_reference_kernels = enabled;
        self
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was rendered and presented.
    Presented {
        slot: FrameSlot,
        submission: SubmissionIndex,
    },
    /// No image was available, or the window is minimized.
    Skipped,
    /// The surface and size-dependent resources were recreated.
    Resized(Extent3d),
    /// The window asked to close; nothing was rendered.
    CloseRequested,
}

/// Stock frame renderer over a presentation surface.
pub struct Renderer<S: Surface> {
    device: Arc<GraphicsDevice>,
    surface: S,
    registry: ResourceRegistry,
    graph: PassGraph,
    compiled: CompiledGraph,
    scheduler: FrameScheduler,
    temporal: TemporalState,
    metrics: MetricInstrumentation,
    frame: FrameContext,
    globals_ring: UniformRing,
    objects_ring: UniformRing,
    reloader: Option<Box<dyn PipelineReloader>>,
    config: RendererConfig,
    features: FeatureToggles,
}

impl<S: Surface> Renderer<S> {
    /// Declare and realize the stock resources at the surface size and
    /// compile the stock pass set.
    pub fn new(
        device: Arc<GraphicsDevice>,
        surface: S,
        config: RendererConfig,
    ) -> Result<Self, GraphicsError> {
        stratus_core::profile_function!();

        let frames = config
            .frames_in_flight
            .unwrap_or_else(|| surface.max_frames_in_flight())
            .max(1);
        let extent = surface.extent();

        let mut registry = ResourceRegistry::new(device.clone());
        declare_stock_resources(&mut registry, &config, surface.format())?;
        registry.realize(extent)?;

        if config.register_reference_kernels && !register_reference_kernels(&device) {
            log::debug!("Renderer: backend '{}' runs its own pipelines", device.name());
        }
        device.write_buffer(
            registry.buffer(names::AUTO_EXPOSURE)?,
            0,
            bytemuck::bytes_of(&AutoExposureData::default()),
        )?;

        let globals_ring = UniformRing::new(
            &device,
            std::mem::size_of::<GpuGlobals>() as u64,
            frames,
            "globals",
        )?;
        let objects_ring = UniformRing::new(
            &device,
            u64::from(config.object_capacity) * OBJECT_TRANSFORM_SIZE,
            frames,
            "objects",
        )?;

        let features = config.features;
        let mut graph = PassGraph::new();
        let compiled = Self::build(&mut graph, &registry, &config, features)?;

        log::info!(
            "Renderer: {}x{} with {} frame slots, {} passes",
            extent.width,
            extent.height,
            frames,
            graph.pass_count()
        );

        Ok(Self {
            device,
            surface,
            registry,
            graph,
            compiled,
            scheduler: FrameScheduler::new(frames).with_swapchain_name(names::SWAPCHAIN),
            temporal: TemporalState::new(),
            metrics: MetricInstrumentation::new(config.query_capacity, config.history_capacity),
            frame: FrameContext {
                extent,
                ..FrameContext::default()
            },
            globals_ring,
            objects_ring,
            reloader: None,
            config,
            features,
        })
    }

    /// Install a pipeline reloader, polled once per loop iteration.
    pub fn with_reloader(mut self, reloader: impl PipelineReloader + 'static) -> Self {
        self.reloader = Some(Box::new(reloader));
        self
    }

    pub fn set_reloader(&mut self, reloader: Option<Box<dyn PipelineReloader>>) {
        self.reloader = reloader;
    }

    fn build(
        graph: &mut PassGraph,
        registry: &ResourceRegistry,
        config: &RendererConfig,
        features: FeatureToggles,
    ) -> Result<CompiledGraph, GraphicsError> {
        graph.clear();
        build_frame_passes(graph, registry, config, features)?;
        Ok(graph.compile(registry)?)
    }

    /// Rebuild and recompile the pass set.
    pub fn rebuild(&mut self) -> Result<(), GraphicsError> {
        self.compiled = Self::build(&mut self.graph, &self.registry, &self.config, self.features)?;
        self.metrics.reset_queries();
        log::info!(
            "Renderer: rebuilt {} passes with {} barriers",
            self.graph.pass_count(),
            self.compiled.barrier_count()
        );
        Ok(())
    }

    /// Change the optional effects, rebuilding only if they differ.
    pub fn set_features(&mut self, features: FeatureToggles) -> Result<(), GraphicsError> {
        if features == self.features {
            return Ok(());
        }
        log::info!("Renderer: features changed to {:?}", features);
        self.features = features;
        self.rebuild()
    }

    /// Recreate the surface and every size-dependent resource.
    ///
    /// The camera history carries across the resize; only images are rebuilt.
    pub fn resize(&mut self, extent: Extent3d) -> Result<(), GraphicsError> {
        stratus_core::profile_function!();
        self.device.wait_idle()?;
        self.surface.resize(&self.device, extent)?;
        let created = self.registry.realize(extent)?;
        self.frame.extent = extent;
        self.rebuild()?;
        log::info!(
            "Renderer: resized to {}x{}, {} resources recreated",
            extent.width,
            extent.height,
            created
        );
        Ok(())
    }

    /// Run one loop iteration.
    pub fn render_frame(
        &mut self,
        window: &mut dyn WindowState,
        camera: &Camera,
        scene: &SceneSnapshot,
        delta_time: f32,
    ) -> Result<FrameOutcome, GraphicsError> {
        stratus_core::profile_function!();

        if window.close_requested() {
            return Ok(FrameOutcome::CloseRequested);
        }

        if window.resize_pending() {
            let size = window.drawable_size();
            if size.is_empty() {
                log::debug!("Renderer: drawable size is empty, skipping frame");
                return Ok(FrameOutcome::Skipped);
            }
            self.resize(size)?;
            window.acknowledge_resize();
            return Ok(FrameOutcome::Resized(size));
        }

        if let Some(reloader) = self.reloader.as_mut() {
            report_reload(&reloader.reload_all());
        }

        let Some(slot) = self.scheduler.acquire(&mut self.surface, &mut self.registry)? else {
            return Ok(FrameOutcome::Skipped);
        };

        self.temporal
            .begin_frame(&mut self.frame.globals, camera, self.frame.extent, delta_time);
        self.frame.globals.gather_lights(scene);
        self.frame.objects.clone_from(&scene.objects);

        let submission = match self.submit_frame() {
            Ok(submission) => submission,
            Err(error) => {
                self.scheduler.abandon();
                return Err(error);
            }
        };

        self.metrics
            .resolve_frame(&self.device, self.frame.globals.elapsed_time);
        let exposure = read_exposure(&self.device, self.registry.buffer(names::AUTO_EXPOSURE)?)?;
        self.temporal.apply_exposure_readback(&exposure);
        self.temporal.end_frame(&mut self.frame.globals);

        stratus_core::profile_plot!("gpu ms", f64::from(self.metrics.total_gpu_time_ms()));
        stratus_core::frame_mark!();
        Ok(FrameOutcome::Presented { slot, submission })
    }

    fn submit_frame(&mut self) -> Result<SubmissionIndex, GraphicsError> {
        self.scheduler.write_uniforms(
            &self.device,
            &mut self.frame,
            &self.globals_ring,
            Some(&self.objects_ring),
        )?;
        self.scheduler.execute(
            &mut self.graph,
            &self.compiled,
            &self.frame,
            &self.registry,
            &mut self.metrics,
        )?;
        self.scheduler.present(&self.device, &mut self.surface)
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &PassGraph {
        &self.graph
    }

    pub fn compiled(&self) -> &CompiledGraph {
        &self.compiled
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn temporal(&self) -> &TemporalState {
        &self.temporal
    }

    pub fn metrics(&self) -> &MetricInstrumentation {
        &self.metrics
    }

    /// The last frame's context.
    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    /// Uniform ring holding the wire globals of every slot.
    pub fn globals_ring(&self) -> &UniformRing {
        &self.globals_ring
    }

    pub fn features(&self) -> FeatureToggles {
        self.features
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Live post-processing settings, picked up by the next frame.
    pub fn settings_mut(&mut self) -> &mut PostProcessSettings {
        &mut self.frame.globals.settings
    }

    /// Wait for the device and release every registry resource.
    pub fn shutdown(mut self) -> Result<(), GraphicsError> {
        self.device.wait_idle()?;
        self.registry.release_all();
        self.device.collect_garbage();
        log::info!("Renderer: shut down");
        Ok(())
    }
}

impl<S: Surface> std::fmt::Debug for Renderer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("extent", &self.frame.extent)
            .field("passes", &self.graph.pass_count())
            .field("features", &self.features)
            .field("submissions", &self.scheduler.submission_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::swapchain::HeadlessSurface;
    use crate::window::ManualWindow;

    fn renderer(config: RendererConfig) -> Renderer<HeadlessSurface> {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let surface = HeadlessSurface::new(Extent3d::new_2d(128, 64), 2);
        Renderer::new(device, surface, config).unwrap()
    }

    #[test]
    fn test_close_request_renders_nothing() {
        let mut renderer = renderer(RendererConfig::default());
        let mut window = ManualWindow::new(128, 64);
        window.request_close();
        let outcome = renderer
            .render_frame(&mut window, &Camera::default(), &SceneSnapshot::default(), 0.016)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::CloseRequested);
        assert_eq!(renderer.scheduler().submission_count(), 0);
    }

    #[test]
    fn test_presented_frames_advance_submissions() {
        let mut renderer = renderer(RendererConfig::default());
        let mut window = ManualWindow::new(128, 64);
        for _ in 0..3 {
            let outcome = renderer
                .render_frame(&mut window, &Camera::default(), &SceneSnapshot::default(), 0.016)
                .unwrap();
            assert!(matches!(outcome, FrameOutcome::Presented { .. }));
        }
        assert_eq!(renderer.scheduler().submission_count(), 3);
        assert_eq!(renderer.surface().presented_count(), 3);
    }

    #[test]
    fn test_set_features_rebuilds_only_on_change() {
        let mut renderer = renderer(RendererConfig::default());
        let before = renderer.graph().pass_count();
        renderer.set_features(FeatureToggles::default()).unwrap();
        assert_eq!(renderer.graph().pass_count(), before);

        renderer
            .set_features(FeatureToggles {
                screen_space_reflections: false,
                depth_of_field: true,
            })
            .unwrap();
        assert_eq!(renderer.graph().pass_count(), before - 1);
        assert!(renderer.graph().find("screen space reflections").is_none());
    }

    #[test]
    fn test_empty_drawable_skips_without_resizing() {
        let mut renderer = renderer(RendererConfig::default());
        let mut window = ManualWindow::new(128, 64);
        window.resize(0, 64);
        let outcome = renderer
            .render_frame(&mut window, &Camera::default(), &SceneSnapshot::default(), 0.016)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(renderer.frame().extent, Extent3d::new_2d(128, 64));
        assert!(window.resize_pending());
    }

    #[test]
    fn test_config_builders() {
        let config = RendererConfig::default()
            .with_frames_in_flight(0)
            .with_object_capacity(8)
            .with_reference_kernels(false);
        assert_eq!(config.frames_in_flight, Some(1));
        assert_eq!(config.object_capacity, 8);
        assert!(!config.register_reference_kernels);
        assert_eq!(config.terrain_index_count, 64 * 64 * 4);
    }
}
