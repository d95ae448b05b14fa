//! GPU backend abstraction layer.
//!
//! The frame orchestration code never talks to a GPU API directly. It
//! records a [`CommandStream`](crate::command::CommandStream) and hands it
//! to a [`Backend`] through the [`GraphicsDevice`](crate::GraphicsDevice).
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: software device that executes clears, copies, buffer
//!   writes and registered host kernels in memory. Used by tests and the
//!   headless app.
//!
//! # Host kernels
//!
//! Compute pipelines are compiled shaders on a real GPU. A software backend
//! cannot run those, so it accepts [`HostKernel`]s registered under the
//! pipeline name instead. Dispatches to pipelines without a kernel are
//! recorded and otherwise ignored.

mod dummy;
mod error;
mod kernel;

use std::fmt;
use std::sync::Arc;

pub use dummy::{DummyBackend, SubmissionRecord};
pub use error::BackendError;
pub use kernel::{HostKernel, KernelContext};

use crate::command::CommandStream;
use crate::types::{BufferDescriptor, TextureDescriptor};

/// Identifier of a device-owned texture or buffer.
///
/// Ids are unique for the lifetime of a [`GraphicsDevice`](crate::GraphicsDevice)
/// and never reused, so a stale id can never alias a newer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic index of a submitted command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionIndex(pub u64);

/// A GPU backend.
///
/// All methods take `&self`; implementations synchronize internally.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Create a texture under the given id.
    fn create_texture(&self, id: ResourceId, descriptor: &TextureDescriptor)
    -> Result<(), BackendError>;

    /// Destroy a texture. Unknown ids are ignored.
    fn destroy_texture(&self, id: ResourceId);

    /// Create a buffer under the given id.
    fn create_buffer(&self, id: ResourceId, descriptor: &BufferDescriptor)
    -> Result<(), BackendError>;

    /// Destroy a buffer. Unknown ids are ignored.
    fn destroy_buffer(&self, id: ResourceId);

    /// Write host data into a buffer.
    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), BackendError>;

    /// Read buffer contents back to the host.
    fn read_buffer(&self, id: ResourceId, offset: u64, size: u64) -> Result<Vec<u8>, BackendError>;

    /// Submit a recorded command stream for execution.
    fn submit(&self, stream: CommandStream) -> Result<SubmissionIndex, BackendError>;

    /// The latest submission known to have completed, if any.
    fn completed_submission(&self) -> Option<SubmissionIndex>;

    /// Block until the given submission has completed.
    fn wait_for(&self, submission: SubmissionIndex) -> Result<(), BackendError>;

    /// Block until all submitted work has completed.
    fn wait_idle(&self) -> Result<(), BackendError>;

    /// Nanoseconds per timestamp tick.
    fn timestamp_period_ns(&self) -> f32;

    /// Read resolved timestamp queries. Unresolved queries read as `None`.
    fn read_timestamps(&self, first_query: u32, count: u32) -> Vec<Option<u64>>;

    /// Register a host implementation of a compute pipeline.
    ///
    /// Returns `false` if the backend executes real shaders and ignores
    /// host kernels.
    fn register_kernel(&self, _pipeline: &str, _kernel: Arc<dyn HostKernel>) -> bool {
        false
    }
}
