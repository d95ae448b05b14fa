//! GPU buffer resource.

use crate::backend::ResourceId;
use crate::types::BufferDescriptor;

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and are
/// reference-counted. Host access goes through
/// [`GraphicsDevice::write_buffer`] and [`GraphicsDevice::read_buffer`].
///
/// [`GraphicsDevice::create_buffer`]: crate::GraphicsDevice::create_buffer
/// [`GraphicsDevice::write_buffer`]: crate::GraphicsDevice::write_buffer
/// [`GraphicsDevice::read_buffer`]: crate::GraphicsDevice::read_buffer
pub struct Buffer {
    id: ResourceId,
    descriptor: BufferDescriptor,
}

impl Buffer {
    /// Create a new buffer (called by GraphicsDevice).
    pub(crate) fn new(id: ResourceId, descriptor: BufferDescriptor) -> Self {
        Self { id, descriptor }
    }

    /// Device id of the buffer.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);
