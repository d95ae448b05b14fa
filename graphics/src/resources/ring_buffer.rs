//! Per-frame-slot uniform storage.
//!
//! A [`UniformRing`] pre-allocates one region per frame in flight inside a
//! single host-visible buffer. The host writes only the region of the slot
//! it currently owns; the device reads the other regions for frames that are
//! still in flight.
//!
//! ```text
//! slot:    0            1            2
//!       |--------|...|--------|...|--------|...|
//!       ^ 0          ^ stride     ^ 2 * stride
//! stride = align_up(element_size, 256)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let ring = UniformRing::new(&device, size_of::<GpuGlobals>() as u64, 2, "globals")?;
//! ring.write_pod(&device, frame.slot, &globals)?;
//! ```

use std::sync::Arc;

use bytemuck::Pod;
use stratus_core::math::align_up;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::scheduler::FrameSlot;
use crate::types::{BufferDescriptor, BufferUsage};

/// Ring of per-slot uniform regions in one buffer.
pub struct UniformRing {
    buffer: Arc<Buffer>,
    element_size: u64,
    slot_stride: u64,
    slot_count: u32,
}

impl UniformRing {
    /// Alignment of every slot region (256 bytes).
    ///
    /// This matches the typical minimum uniform buffer offset alignment
    /// required by most GPUs.
    pub const SLOT_ALIGNMENT: u64 = 256;

    /// Create a ring with `slot_count` regions of `element_size` bytes.
    pub fn new(
        device: &GraphicsDevice,
        element_size: u64,
        slot_count: u32,
        label: &str,
    ) -> Result<Self, GraphicsError> {
        if element_size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "uniform ring element size cannot be zero".to_string(),
            ));
        }
        if slot_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "uniform ring needs at least one slot".to_string(),
            ));
        }

        let slot_stride = align_up(element_size, Self::SLOT_ALIGNMENT);
        let descriptor = BufferDescriptor::new(
            slot_stride * u64::from(slot_count),
            BufferUsage::UNIFORM | BufferUsage::STORAGE | BufferUsage::COPY_DST,
        )
        .with_label(format!("{label}_ring"));
        let buffer = device.create_buffer(&descriptor)?;

        log::debug!(
            "UniformRing '{}': {} slots, stride {} bytes",
            label,
            slot_count,
            slot_stride
        );

        Ok(Self {
            buffer,
            element_size,
            slot_stride,
            slot_count,
        })
    }

    /// Get the underlying GPU buffer.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    /// Distance between consecutive slot regions.
    pub fn slot_stride(&self) -> u64 {
        self.slot_stride
    }

    /// Number of slots.
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Byte offset of a slot's region.
    pub fn slot_offset(&self, slot: FrameSlot) -> Result<u64, GraphicsError> {
        if slot.index() >= self.slot_count {
            return Err(GraphicsError::InvalidParameter(format!(
                "frame slot {} out of range for a ring of {}",
                slot.index(),
                self.slot_count
            )));
        }
        Ok(self.slot_stride * u64::from(slot.index()))
    }

    /// Write raw bytes at the start of a slot's region.
    pub fn write(
        &self,
        device: &GraphicsDevice,
        slot: FrameSlot,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        if data.len() as u64 > self.element_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} bytes do not fit a {}-byte uniform slot",
                data.len(),
                self.element_size
            )));
        }
        let offset = self.slot_offset(slot)?;
        device.write_buffer(&self.buffer, offset, data)
    }

    /// Write a plain-old-data value into a slot.
    pub fn write_pod<T: Pod>(
        &self,
        device: &GraphicsDevice,
        slot: FrameSlot,
        value: &T,
    ) -> Result<(), GraphicsError> {
        self.write(device, slot, bytemuck::bytes_of(value))
    }

    /// Read a slot's whole element back.
    pub fn read(&self, device: &GraphicsDevice, slot: FrameSlot) -> Result<Vec<u8>, GraphicsError> {
        let offset = self.slot_offset(slot)?;
        device.read_buffer(&self.buffer, offset, self.element_size)
    }

    /// Hand the buffer back to the device for deferred destruction.
    pub fn release(self, device: &GraphicsDevice) {
        device.retire_buffer(self.buffer);
    }
}

impl std::fmt::Debug for UniformRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformRing")
            .field("element_size", &self.element_size)
            .field("slot_stride", &self.slot_stride)
            .field("slot_count", &self.slot_count)
            .field("buffer", &self.buffer.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_ring_layout() {
        let device = create_test_device();
        let ring = UniformRing::new(&device, 100, 3, "test").unwrap();

        assert_eq!(ring.slot_stride(), 256);
        assert_eq!(ring.buffer().size(), 768);
        assert_eq!(ring.slot_offset(FrameSlot::new(0)).unwrap(), 0);
        assert_eq!(ring.slot_offset(FrameSlot::new(2)).unwrap(), 512);
        assert!(ring.slot_offset(FrameSlot::new(3)).is_err());
    }

    #[test]
    fn test_ring_stride_exact_multiple() {
        let device = create_test_device();
        let ring = UniformRing::new(&device, 512, 2, "test").unwrap();
        assert_eq!(ring.slot_stride(), 512);
    }

    #[test]
    fn test_slots_are_independent() {
        let device = create_test_device();
        let ring = UniformRing::new(&device, 4, 2, "test").unwrap();

        ring.write_pod(&device, FrameSlot::new(0), &1u32).unwrap();
        ring.write_pod(&device, FrameSlot::new(1), &2u32).unwrap();

        assert_eq!(ring.read(&device, FrameSlot::new(0)).unwrap(), 1u32.to_le_bytes());
        assert_eq!(ring.read(&device, FrameSlot::new(1)).unwrap(), 2u32.to_le_bytes());
    }

    #[test]
    fn test_oversized_write_rejected() {
        let device = create_test_device();
        let ring = UniformRing::new(&device, 4, 2, "test").unwrap();
        assert!(ring.write(&device, FrameSlot::new(0), &[0; 8]).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        let device = create_test_device();
        assert!(UniformRing::new(&device, 0, 2, "test").is_err());
        assert!(UniformRing::new(&device, 16, 0, "test").is_err());
    }
}
