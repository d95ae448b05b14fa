//! Frame scheduling.
//!
//! The [`FrameScheduler`] drives one frame through four stages:
//!
//! | Stage | Call | Effect |
//! |-------|------|--------|
//! | Acquire | [`acquire`](FrameScheduler::acquire) | Obtain the presentable image, bind it to the registry |
//! | WriteUniforms | [`write_uniforms`](FrameScheduler::write_uniforms) | Pick the frame slot, copy the uniform snapshot into it |
//! | Execute | [`execute`](FrameScheduler::execute) | Run the compiled pass graph |
//! | Present | [`present`](FrameScheduler::present) | Submit, present, wait, bump the submission count |
//!
//! The scheduler only guarantees correct slot indexing
//! (`submission_count mod ring_size`). Completion is awaited synchronously at
//! the end of [`present`](FrameScheduler::present), so a slot is never
//! rewritten while the device may still read it.
//!
//! # Example
//!
//! ```ignore
//! let Some(slot) = scheduler.acquire(&mut surface, &mut registry)? else {
//!     return Ok(FrameOutcome::Skipped);
//! };
//! scheduler.write_uniforms(&device, &mut frame, &globals_ring, Some(&objects_ring))?;
//! scheduler.execute(&mut graph, &compiled, &frame, &registry, &mut metrics)?;
//! let submission = scheduler.present(&device, &mut surface)?;
//! ```

mod slot;

pub use slot::FrameSlot;

use stratus_core::math::mat4_to_cols_array_2d;

use crate::backend::SubmissionIndex;
use crate::command::CommandEncoder;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::graph::{CompiledGraph, PassGraph, PassObserver};
use crate::resources::{ResourceRegistry, UniformRing};
use crate::swapchain::{Surface, SurfaceImage};
use crate::uniforms::FrameContext;

/// Size of one object transform in the per-object ring.
pub const OBJECT_TRANSFORM_SIZE: u64 = 64;

/// Where the current frame is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameStage {
    /// No frame in progress.
    #[default]
    Idle,
    /// A presentable image is held.
    Acquired,
    /// The frame slot holds this frame's uniforms.
    UniformsWritten,
    /// Commands are recorded and ready to submit.
    Executed,
}

/// Sequences the per-frame stages and owns the submission count.
#[derive(Debug)]
pub struct FrameScheduler {
    ring_size: u32,
    submission_count: u64,
    stage: FrameStage,
    image: Option<SurfaceImage>,
    encoder: Option<CommandEncoder>,
    swapchain: String,
}

impl FrameScheduler {
    /// Create a scheduler for `ring_size` frames in flight.
    pub fn new(ring_size: u32) -> Self {
        Self {
            ring_size: ring_size.max(1),
            submission_count: 0,
            stage: FrameStage::Idle,
            image: None,
            encoder: None,
            swapchain: "swapchain".to_string(),
        }
    }

    /// Registry name the acquired image is imported under.
    pub fn with_swapchain_name(mut self, name: impl Into<String>) -> Self {
        self.swapchain = name.into();
        self
    }

    /// Number of frame slots.
    pub fn ring_size(&self) -> u32 {
        self.ring_size
    }

    /// Frames presented so far.
    pub fn submission_count(&self) -> u64 {
        self.submission_count
    }

    /// Current stage.
    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    /// Slot the next (or current) frame writes.
    pub fn current_slot(&self) -> FrameSlot {
        FrameSlot::from_submission(self.submission_count, self.ring_size)
    }

    /// Image held since acquire, if any.
    pub fn acquired_image(&self) -> Option<&SurfaceImage> {
        self.image.as_ref()
    }

    fn expect_stage(&self, expected: FrameStage, requested: FrameStage) -> Result<(), GraphicsError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(GraphicsError::InvalidFrameStage {
                current: self.stage,
                requested,
            })
        }
    }

    /// Acquire the next presentable image.
    ///
    /// Returns `Ok(None)` without touching any state when the surface has no
    /// image available; the caller skips the frame and retries next
    /// iteration.
    pub fn acquire(
        &mut self,
        surface: &mut dyn Surface,
        registry: &mut ResourceRegistry,
    ) -> Result<Option<FrameSlot>, GraphicsError> {
        self.expect_stage(FrameStage::Idle, FrameStage::Acquired)?;

        let Some(image) = surface.acquire(registry.device())? else {
            log::warn!(
                "FrameScheduler: no presentable image for frame {}, skipping",
                self.submission_count
            );
            return Ok(None);
        };
        registry.import_texture(&self.swapchain, image.texture().clone())?;

        log::trace!(
            "FrameScheduler: acquired image {} for frame {}",
            image.index(),
            self.submission_count
        );
        self.image = Some(image);
        self.stage = FrameStage::Acquired;
        Ok(Some(self.current_slot()))
    }

    /// Copy the frame's uniform snapshot into its slot.
    ///
    /// Object transforms beyond the object ring's capacity are dropped with
    /// a warning.
    pub fn write_uniforms(
        &mut self,
        device: &GraphicsDevice,
        frame: &mut FrameContext,
        globals: &UniformRing,
        objects: Option<&UniformRing>,
    ) -> Result<FrameSlot, GraphicsError> {
        self.expect_stage(FrameStage::Acquired, FrameStage::UniformsWritten)?;

        let slot = self.current_slot();
        frame.slot = slot;
        frame.submission = self.submission_count;
        globals.write_pod(device, slot, &frame.globals.to_wire())?;

        if let Some(ring) = objects {
            let capacity = (ring.element_size() / OBJECT_TRANSFORM_SIZE) as usize;
            if frame.objects.len() > capacity {
                log::warn!(
                    "FrameScheduler: {} objects exceed the transform ring capacity of {}",
                    frame.objects.len(),
                    capacity
                );
            }
            let transforms: Vec<[[f32; 4]; 4]> = frame
                .objects
                .iter()
                .take(capacity)
                .map(mat4_to_cols_array_2d)
                .collect();
            ring.write(device, slot, bytemuck::cast_slice(&transforms))?;
        }

        log::trace!("FrameScheduler: uniforms written to {}", slot);
        self.stage = FrameStage::UniformsWritten;
        Ok(slot)
    }

    /// Record the compiled graph for this frame.
    pub fn execute(
        &mut self,
        graph: &mut PassGraph,
        compiled: &CompiledGraph,
        frame: &FrameContext,
        registry: &ResourceRegistry,
        observer: &mut dyn PassObserver,
    ) -> Result<(), GraphicsError> {
        self.expect_stage(FrameStage::UniformsWritten, FrameStage::Executed)?;

        let mut encoder = CommandEncoder::new();
        graph.execute(compiled, frame, registry, &mut encoder, observer)?;
        self.encoder = Some(encoder);
        self.stage = FrameStage::Executed;
        Ok(())
    }

    /// Submit the recorded work, present and wait for completion.
    ///
    /// Once the work is submitted the frame counts, even if presenting
    /// fails; the submission is still waited on before the error returns.
    pub fn present(
        &mut self,
        device: &GraphicsDevice,
        surface: &mut dyn Surface,
    ) -> Result<SubmissionIndex, GraphicsError> {
        self.expect_stage(FrameStage::Executed, FrameStage::Idle)?;

        let (Some(encoder), Some(image)) = (self.encoder.take(), self.image.take()) else {
            self.stage = FrameStage::Idle;
            return Err(GraphicsError::InvalidFrameStage {
                current: FrameStage::Executed,
                requested: FrameStage::Idle,
            });
        };

        self.stage = FrameStage::Idle;
        let submission = device.submit(encoder.finish())?;
        self.submission_count += 1;

        if let Err(error) = surface.present(image) {
            log::warn!("FrameScheduler: present failed after {:?}: {}", submission, error);
            if let Err(wait_error) = device.wait_for(submission) {
                log::error!("FrameScheduler: wait for {:?} failed: {}", submission, wait_error);
            }
            return Err(error);
        }
        device.wait_for(submission)?;
        device.collect_garbage();

        log::debug!(
            "FrameScheduler: presented frame {} as {:?}",
            self.submission_count,
            submission
        );
        Ok(submission)
    }

    /// Drop a frame in progress after a failure.
    ///
    /// The submission count is not advanced, so the next frame reuses the
    /// same slot.
    pub fn abandon(&mut self) {
        if self.stage != FrameStage::Idle {
            log::warn!("FrameScheduler: abandoning frame in stage {:?}", self.stage);
        }
        self.image = None;
        self.encoder = None;
        self.stage = FrameStage::Idle;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::DummyBackend;
    use crate::command::Command;
    use crate::graph::{Pass, ResourceRole};
    use crate::resources::ResourceLifetime;
    use crate::swapchain::HeadlessSurface;
    use crate::types::{Extent3d, TextureFormat, TextureUsage};
    use crate::uniforms::GpuGlobals;

    struct Fixture {
        device: Arc<GraphicsDevice>,
        surface: HeadlessSurface,
        registry: ResourceRegistry,
        globals: UniformRing,
        graph: PassGraph,
    }

    fn fixture() -> Fixture {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let surface = HeadlessSurface::new(Extent3d::new_2d(64, 32), 2);
        let mut registry = ResourceRegistry::new(device.clone());
        registry
            .declare(
                "swapchain",
                TextureFormat::Bgra8UnormSrgb,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_DST,
                ResourceLifetime::Imported,
            )
            .unwrap();
        registry.realize(Extent3d::new_2d(64, 32)).unwrap();
        let globals =
            UniformRing::new(&device, std::mem::size_of::<GpuGlobals>() as u64, 2, "globals")
                .unwrap();
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                Pass::graphics("clear", |ctx| {
                    let target = ctx.texture("swapchain")?.clone();
                    ctx.encoder()
                        .clear_texture(&target, crate::types::ClearValue::color(0.0, 0.0, 0.0, 1.0));
                    Ok(())
                })
                .writes("swapchain", ResourceRole::ColorAttachment),
            )
            .unwrap();
        Fixture {
            device,
            surface,
            registry,
            globals,
            graph,
        }
    }

    fn run_frame(f: &mut Fixture, scheduler: &mut FrameScheduler, frame: &mut FrameContext) -> FrameSlot {
        let compiled = f.graph.compile(&f.registry).unwrap();
        scheduler.acquire(&mut f.surface, &mut f.registry).unwrap().unwrap();
        let slot = scheduler
            .write_uniforms(&f.device, frame, &f.globals, None)
            .unwrap();
        scheduler
            .execute(&mut f.graph, &compiled, frame, &f.registry, &mut ())
            .unwrap();
        scheduler.present(&f.device, &mut f.surface).unwrap();
        slot
    }

    #[test]
    fn test_slot_sequence() {
        let mut f = fixture();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();

        let slots: Vec<u32> = (0..5)
            .map(|_| run_frame(&mut f, &mut scheduler, &mut frame).index())
            .collect();
        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(scheduler.submission_count(), 5);
        assert_eq!(f.surface.presented_count(), 5);
    }

    #[test]
    fn test_out_of_order_stage_is_rejected() {
        let mut f = fixture();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();

        let err = scheduler
            .write_uniforms(&f.device, &mut frame, &f.globals, None)
            .unwrap_err();
        assert_eq!(
            err,
            GraphicsError::InvalidFrameStage {
                current: FrameStage::Idle,
                requested: FrameStage::UniformsWritten,
            }
        );
        assert!(scheduler.present(&f.device, &mut f.surface).is_err());
    }

    #[test]
    fn test_failed_acquire_mutates_nothing() {
        let mut f = fixture();
        f.surface.fail_next_acquires(1);
        let mut scheduler = FrameScheduler::new(2);

        assert_eq!(scheduler.acquire(&mut f.surface, &mut f.registry).unwrap(), None);
        assert_eq!(scheduler.stage(), FrameStage::Idle);
        assert_eq!(scheduler.submission_count(), 0);
        assert!(f.registry.texture("swapchain").is_err());

        assert!(scheduler.acquire(&mut f.surface, &mut f.registry).unwrap().is_some());
    }

    #[test]
    fn test_uniforms_land_in_slot() {
        let mut f = fixture();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();
        frame.globals.exposure = 3.0;

        run_frame(&mut f, &mut scheduler, &mut frame);
        let bytes = f.globals.read(&f.device, FrameSlot::new(0)).unwrap();
        let wire: GpuGlobals = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(wire.time_exposure[2], 3.0);
    }

    #[test]
    fn test_object_transforms_are_truncated_to_capacity() {
        let mut f = fixture();
        let objects = UniformRing::new(&f.device, OBJECT_TRANSFORM_SIZE * 2, 2, "objects").unwrap();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();
        frame.objects = vec![stratus_core::math::Mat4::identity(); 3];

        scheduler.acquire(&mut f.surface, &mut f.registry).unwrap();
        scheduler
            .write_uniforms(&f.device, &mut frame, &f.globals, Some(&objects))
            .unwrap();
        let bytes = objects.read(&f.device, FrameSlot::new(0)).unwrap();
        assert_eq!(bytes.len() as u64, OBJECT_TRANSFORM_SIZE * 2);
        assert_eq!(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 1.0);
    }

    #[test]
    fn test_failed_present_still_retires_the_slot() {
        let mut f = fixture();
        f.device = GraphicsDevice::new(Arc::new(DummyBackend::new().with_manual_completion(true)));
        f.registry = ResourceRegistry::new(f.device.clone());
        f.registry
            .declare(
                "swapchain",
                TextureFormat::Bgra8UnormSrgb,
                TextureUsage::RENDER_ATTACHMENT,
                ResourceLifetime::Imported,
            )
            .unwrap();
        f.globals =
            UniformRing::new(&f.device, std::mem::size_of::<GpuGlobals>() as u64, 2, "globals")
                .unwrap();
        let compiled = f.graph.compile(&f.registry).unwrap();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();

        f.surface.fail_next_presents(1);
        scheduler.acquire(&mut f.surface, &mut f.registry).unwrap().unwrap();
        scheduler
            .write_uniforms(&f.device, &mut frame, &f.globals, None)
            .unwrap();
        scheduler
            .execute(&mut f.graph, &compiled, &frame, &f.registry, &mut ())
            .unwrap();
        let err = scheduler.present(&f.device, &mut f.surface).unwrap_err();
        assert_eq!(err, GraphicsError::SurfaceLost);

        assert_eq!(scheduler.submission_count(), 1);
        assert_eq!(scheduler.current_slot(), FrameSlot::new(1));
        assert_eq!(f.device.completed_submission(), f.device.last_submission());
        assert_eq!(f.surface.presented_count(), 0);

        assert_eq!(run_frame(&mut f, &mut scheduler, &mut frame), FrameSlot::new(1));
        assert_eq!(f.surface.presented_count(), 1);
    }

    #[test]
    fn test_abandon_keeps_slot() {
        let mut f = fixture();
        let mut scheduler = FrameScheduler::new(2);

        scheduler.acquire(&mut f.surface, &mut f.registry).unwrap();
        scheduler.abandon();
        assert_eq!(scheduler.stage(), FrameStage::Idle);
        assert_eq!(scheduler.current_slot(), FrameSlot::new(0));
    }

    #[test]
    fn test_present_submits_recorded_commands() {
        let mut f = fixture();
        let backend = Arc::new(DummyBackend::new());
        f.device = GraphicsDevice::new(backend.clone());
        f.registry = ResourceRegistry::new(f.device.clone());
        f.registry
            .declare(
                "swapchain",
                TextureFormat::Bgra8UnormSrgb,
                TextureUsage::RENDER_ATTACHMENT,
                ResourceLifetime::Imported,
            )
            .unwrap();
        f.globals =
            UniformRing::new(&f.device, std::mem::size_of::<GpuGlobals>() as u64, 2, "globals")
                .unwrap();
        let mut scheduler = FrameScheduler::new(2);
        let mut frame = FrameContext::default();

        run_frame(&mut f, &mut scheduler, &mut frame);
        let log = backend.submission_log();
        assert_eq!(log.len(), 1);
        assert!(log[0]
            .commands
            .iter()
            .any(|command| matches!(command, Command::ClearTexture { .. })));
    }
}
