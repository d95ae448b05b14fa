//! GPU resources.
//!
//! This module contains the resource types handed out by [`GraphicsDevice`]
//! and the components that own them:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture/image
//! - [`ResourceRegistry`] - named resources shared by passes, recreated on resize
//! - [`UniformRing`] - per-frame-slot uniform storage
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod buffer;
mod registry;
mod ring_buffer;
mod texture;

pub use buffer::Buffer;
pub use registry::{
    BufferDeclaration, DeclaredUsage, ImageDeclaration, MipPolicy, RegistryError, ResourceInfo,
    ResourceInstance, ResourceKind, ResourceLifetime, ResourceRegistry, SizePolicy,
};
pub use ring_buffer::UniformRing;
pub use texture::Texture;
