//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources
//! and submitting recorded work. It wraps a [`Backend`] and adds id
//! allocation, validation and deferred destruction on top of it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::{Mutex, RwLock};

use crate::backend::{Backend, HostKernel, ResourceId, SubmissionIndex};
use crate::command::CommandStream;
use crate::error::GraphicsError;
use crate::resources::{Buffer, Texture};
use crate::types::{BufferDescriptor, TextureDescriptor, mip_chain_length};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
        }
    }
}

#[derive(Debug)]
enum Retired {
    Texture(Arc<Texture>),
    Buffer(Arc<Buffer>),
}

/// A graphics device for creating GPU resources.
///
/// # Deferred destruction
///
/// Frames may still be in flight when a resource is replaced, for example
/// during a resize. [`retire_texture`](Self::retire_texture) and
/// [`retire_buffer`](Self::retire_buffer) park the resource until the last
/// submission made before the call has completed; [`collect_garbage`]
/// destroys everything whose guard submission is done.
///
/// [`collect_garbage`]: Self::collect_garbage
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
pub struct GraphicsDevice {
    backend: Arc<dyn Backend>,
    capabilities: DeviceCapabilities,
    next_id: AtomicU64,
    last_submission: Mutex<Option<SubmissionIndex>>,
    retired: Mutex<Vec<(Option<SubmissionIndex>, Retired)>>,
    // Weak references for live-resource accounting.
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
}

impl GraphicsDevice {
    /// Create a device on top of a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        log::info!("GraphicsDevice: using {} backend", backend.name());
        Arc::new(Self {
            backend,
            capabilities: DeviceCapabilities::default(),
            next_id: AtomicU64::new(1),
            last_submission: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
        })
    }

    /// Get the backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn allocate_id(&self) -> ResourceId {
        ResourceId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size is zero, exceeds device limits or
    /// the backend allocation fails.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<Arc<Buffer>, GraphicsError> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let id = self.allocate_id();
        self.backend.create_buffer(id, descriptor)?;
        let buffer = Arc::new(Buffer::new(id, descriptor.clone()));
        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "GraphicsDevice: created buffer {:?} {}, size={}",
            descriptor.label,
            id,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or exceed device limits,
    /// if the mip count is outside `1..=mip_chain_length`, or if the backend
    /// allocation fails.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.size.width > max_dim
            || descriptor.size.height > max_dim
            || descriptor.size.depth > max_dim
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }

        if descriptor.size.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        let max_mips = mip_chain_length(descriptor.size.width, descriptor.size.height);
        if descriptor.mip_level_count == 0 || descriptor.mip_level_count > max_mips {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level count {} outside 1..={max_mips}",
                descriptor.mip_level_count
            )));
        }

        let id = self.allocate_id();
        self.backend.create_texture(id, descriptor)?;
        let texture = Arc::new(Texture::new(id, descriptor.clone()));
        self.textures.write().push(Arc::downgrade(&texture));

        log::trace!(
            "GraphicsDevice: created texture {:?} {}, size={}x{}",
            descriptor.label,
            id,
            descriptor.size.width,
            descriptor.size.height
        );

        Ok(texture)
    }

    /// Hand a texture back for destruction once in-flight work is done.
    pub fn retire_texture(&self, texture: Arc<Texture>) {
        let guard = *self.last_submission.lock();
        log::trace!("GraphicsDevice: retiring texture {}", texture.id());
        self.retired.lock().push((guard, Retired::Texture(texture)));
    }

    /// Hand a buffer back for destruction once in-flight work is done.
    pub fn retire_buffer(&self, buffer: Arc<Buffer>) {
        let guard = *self.last_submission.lock();
        log::trace!("GraphicsDevice: retiring buffer {}", buffer.id());
        self.retired.lock().push((guard, Retired::Buffer(buffer)));
    }

    /// Destroy retired resources whose guard submission has completed.
    ///
    /// Returns the number of resources destroyed.
    pub fn collect_garbage(&self) -> usize {
        let completed = self.backend.completed_submission();
        let mut retired = self.retired.lock();
        let before = retired.len();
        retired.retain(|(guard, resource)| {
            let done = match guard {
                None => true,
                Some(guard) => completed.is_some_and(|completed| completed >= *guard),
            };
            if done {
                match resource {
                    Retired::Texture(texture) => self.backend.destroy_texture(texture.id()),
                    Retired::Buffer(buffer) => self.backend.destroy_buffer(buffer.id()),
                }
            }
            !done
        });
        let destroyed = before - retired.len();
        drop(retired);

        if destroyed > 0 {
            log::debug!("GraphicsDevice: destroyed {} retired resources", destroyed);
            self.buffers.write().retain(|w| w.strong_count() > 0);
            self.textures.write().retain(|w| w.strong_count() > 0);
        }
        destroyed
    }

    /// Number of retired resources still waiting for destruction.
    pub fn pending_destruction_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Write host data into a buffer.
    pub fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<(), GraphicsError> {
        self.backend.write_buffer(buffer.id(), offset, data)?;
        Ok(())
    }

    /// Read buffer contents back to the host.
    pub fn read_buffer(&self, buffer: &Buffer, offset: u64, size: u64) -> Result<Vec<u8>, GraphicsError> {
        Ok(self.backend.read_buffer(buffer.id(), offset, size)?)
    }

    /// Submit a recorded command stream.
    pub fn submit(&self, stream: CommandStream) -> Result<SubmissionIndex, GraphicsError> {
        let index = self.backend.submit(stream)?;
        *self.last_submission.lock() = Some(index);
        Ok(index)
    }

    /// The most recent submission, if any.
    pub fn last_submission(&self) -> Option<SubmissionIndex> {
        *self.last_submission.lock()
    }

    /// The latest submission known to have completed, if any.
    pub fn completed_submission(&self) -> Option<SubmissionIndex> {
        self.backend.completed_submission()
    }

    /// Block until a submission has completed.
    pub fn wait_for(&self, submission: SubmissionIndex) -> Result<(), GraphicsError> {
        self.backend.wait_for(submission)?;
        Ok(())
    }

    /// Block until the device is idle, then destroy every retired resource.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.backend.wait_idle()?;
        self.collect_garbage();
        Ok(())
    }

    /// Read resolved timestamp queries.
    pub fn read_timestamps(&self, first_query: u32, count: u32) -> Vec<Option<u64>> {
        self.backend.read_timestamps(first_query, count)
    }

    /// Nanoseconds per timestamp tick.
    pub fn timestamp_period_ns(&self) -> f32 {
        self.backend.timestamp_period_ns()
    }

    /// Register a host implementation of a compute pipeline.
    pub fn register_kernel(&self, pipeline: &str, kernel: Arc<dyn HostKernel>) -> bool {
        self.backend.register_kernel(pipeline, kernel)
    }

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("backend", &self.backend.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    fn create_test_device() -> (Arc<DummyBackend>, Arc<GraphicsDevice>) {
        let backend = Arc::new(DummyBackend::new().with_manual_completion(true));
        let device = GraphicsDevice::new(backend.clone());
        (backend, device)
    }

    fn color_target(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT,
        )
    }

    #[test]
    fn test_device_name() {
        let (_, device) = create_test_device();
        assert_eq!(device.name(), "Dummy");
    }

    #[test]
    fn test_create_buffer() {
        let (backend, device) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(device.buffer_count(), 1);
        assert_eq!(backend.live_buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let (_, device) = create_test_device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_texture_zero_size() {
        let (_, device) = create_test_device();
        assert!(device.create_texture(&color_target(0, 512)).is_err());
    }

    #[test]
    fn test_create_texture_too_many_mips() {
        let (_, device) = create_test_device();
        assert!(device.create_texture(&color_target(8, 8).with_mip_levels(4)).is_ok());
        assert!(device.create_texture(&color_target(8, 8).with_mip_levels(5)).is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let (_, device) = create_test_device();
        let a = device.create_texture(&color_target(4, 4)).unwrap();
        let b = device.create_texture(&color_target(4, 4)).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_retired_texture_waits_for_submission() {
        let (backend, device) = create_test_device();
        let texture = device.create_texture(&color_target(64, 64)).unwrap();
        let id = texture.id();
        let submission = device.submit(CommandStream::default()).unwrap();

        device.retire_texture(texture);
        assert_eq!(device.collect_garbage(), 0);
        assert!(backend.has_texture(id));

        device.wait_for(submission).unwrap();
        assert_eq!(device.collect_garbage(), 1);
        assert!(!backend.has_texture(id));
        assert_eq!(device.texture_count(), 0);
    }

    #[test]
    fn test_wait_idle_destroys_everything() {
        let (backend, device) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM))
            .unwrap();
        device.submit(CommandStream::default()).unwrap();
        device.retire_buffer(buffer);
        assert_eq!(device.pending_destruction_count(), 1);

        device.wait_idle().unwrap();
        assert_eq!(device.pending_destruction_count(), 0);
        assert_eq!(backend.live_buffer_count(), 0);
    }

    #[test]
    fn test_buffer_round_trip() {
        let (_, device) = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(8, BufferUsage::MAP_READ))
            .unwrap();
        device.write_buffer(&buffer, 0, &[9; 8]).unwrap();
        assert_eq!(device.read_buffer(&buffer, 2, 4).unwrap(), vec![9; 4]);
        assert!(device.read_buffer(&buffer, 6, 4).is_err());
    }
}
