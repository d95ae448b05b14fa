//! # Stratus Graphics
//!
//! Frame orchestration for the Stratus renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`PassGraph`] - Declarative description of passes; the compiler derives
//!   order and barriers from the resources each pass reads and writes
//! - [`ResourceRegistry`] - Named images and buffers with lifetime, size and
//!   mip policies, realized against the render extent
//! - [`FrameScheduler`] - Acquire, uniform upload, execution and present
//!   over a ring of frame slots
//! - [`TemporalState`] - Jitter, camera history and the auto-exposure loop
//! - [`MetricInstrumentation`] - Per-pass GPU timings folded into categories
//! - [`Renderer`] - The stock deferred frame built from all of the above
//! - [`Backend`] - Trait for device implementations, with [`DummyBackend`] as
//!   a software device for tests and headless runs
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stratus_graphics::{DummyBackend, GraphicsDevice, HeadlessSurface, Renderer, RendererConfig};
//!
//! let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
//! let surface = HeadlessSurface::new(Extent3d::new_2d(1280, 720), 2);
//! let mut renderer = Renderer::new(device, surface, RendererConfig::default())?;
//! renderer.render_frame(&mut window, &camera, &scene.snapshot(), 1.0 / 60.0)?;
//! ```

pub mod backend;
pub mod command;
pub mod device;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod reload;
pub mod renderer;
pub mod resources;
pub mod scheduler;
pub mod swapchain;
pub mod temporal;
pub mod types;
pub mod uniforms;
pub mod window;

// Re-export main types for convenience
pub use backend::{Backend, BackendError, DummyBackend, SubmissionIndex};
pub use command::{CommandEncoder, CommandStream};
pub use device::GraphicsDevice;
pub use error::GraphicsError;
pub use graph::{CompiledGraph, GraphError, Pass, PassGraph, PassHandle, ResourceRole};
pub use metrics::{MetricInstrumentation, ScrollingBuffer};
pub use reload::{PipelineReloader, ReloadStatus};
pub use renderer::{FeatureToggles, FrameOutcome, Renderer, RendererConfig};
pub use resources::{RegistryError, ResourceLifetime, ResourceRegistry};
pub use scheduler::{FrameScheduler, FrameSlot, FrameStage};
pub use swapchain::{HeadlessSurface, Surface};
pub use temporal::TemporalState;
pub use types::{
    BufferDescriptor, BufferUsage, ClearValue, Extent3d, TextureDescriptor, TextureFormat,
    TextureUsage,
};
pub use uniforms::{FrameContext, GlobalUniformBlock, PostProcessSettings};
pub use window::{ManualWindow, WindowState};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Stratus Graphics v{} initialized", VERSION);
}
