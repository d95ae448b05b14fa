//! Backend error types.

use thiserror::Error;

use super::ResourceId;

/// Errors that can occur in backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// No texture with this id exists.
    #[error("unknown texture {0}")]
    UnknownTexture(ResourceId),
    /// No buffer with this id exists.
    #[error("unknown buffer {0}")]
    UnknownBuffer(ResourceId),
    /// A host access exceeded the buffer bounds.
    #[error("buffer access out of bounds: offset {offset} + size {size} exceeds {capacity}")]
    OutOfBounds { offset: u64, size: u64, capacity: u64 },
    /// Copy source and destination are not compatible.
    #[error("copy mismatch: {0}")]
    CopyMismatch(String),
    /// A dispatch binding is missing or has the wrong kind.
    #[error("binding {index} of pipeline '{pipeline}' is missing or has the wrong kind")]
    InvalidBinding { pipeline: String, index: usize },
    /// A host kernel reported a failure.
    #[error("kernel '{pipeline}' failed: {reason}")]
    KernelFailed { pipeline: String, reason: String },
    /// The device was lost.
    #[error("GPU device lost")]
    DeviceLost,
}
