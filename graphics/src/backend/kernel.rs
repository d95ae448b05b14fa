//! Host kernels: CPU implementations of compute pipelines for the software backend.

use std::collections::HashMap;

use bytemuck::Pod;

use super::{BackendError, ResourceId};
use crate::command::Binding;
use crate::types::{Extent3d, TextureDescriptor};

/// Software model of an image: one texel value for the whole image.
///
/// This is enough to verify copies, clears and whole-image statistics
/// without storing per-texel data.
#[derive(Debug, Clone)]
pub(crate) struct SoftTexture {
    pub(crate) descriptor: TextureDescriptor,
    pub(crate) contents: Option<[f32; 4]>,
}

/// Software device memory.
#[derive(Debug, Default)]
pub(crate) struct SoftwareMemory {
    pub(crate) textures: HashMap<ResourceId, SoftTexture>,
    pub(crate) buffers: HashMap<ResourceId, Vec<u8>>,
}

/// A CPU implementation of a compute pipeline.
pub trait HostKernel: Send + Sync {
    /// Execute one dispatch.
    fn dispatch(&self, ctx: &mut KernelContext<'_>) -> Result<(), BackendError>;
}

impl<F> HostKernel for F
where
    F: Fn(&mut KernelContext<'_>) -> Result<(), BackendError> + Send + Sync,
{
    fn dispatch(&self, ctx: &mut KernelContext<'_>) -> Result<(), BackendError> {
        self(ctx)
    }
}

/// View of the resources bound to one dispatch.
pub struct KernelContext<'a> {
    pipeline: &'a str,
    groups: [u32; 3],
    bindings: &'a [Binding],
    push_constants: &'a [u8],
    memory: &'a mut SoftwareMemory,
}

impl<'a> KernelContext<'a> {
    pub(crate) fn new(
        pipeline: &'a str,
        groups: [u32; 3],
        bindings: &'a [Binding],
        push_constants: &'a [u8],
        memory: &'a mut SoftwareMemory,
    ) -> Self {
        Self {
            pipeline,
            groups,
            bindings,
            push_constants,
            memory,
        }
    }

    /// Pipeline name of the dispatch.
    pub fn pipeline(&self) -> &str {
        self.pipeline
    }

    /// Workgroup counts.
    pub fn groups(&self) -> [u32; 3] {
        self.groups
    }

    /// Decode the push constants as `T`.
    pub fn push_constants<T: Pod>(&self) -> Result<T, BackendError> {
        bytemuck::try_pod_read_unaligned(self.push_constants).map_err(|err| {
            BackendError::KernelFailed {
                pipeline: self.pipeline.to_string(),
                reason: format!("push constants do not match the expected layout: {err}"),
            }
        })
    }

    fn invalid(&self, index: usize) -> BackendError {
        BackendError::InvalidBinding {
            pipeline: self.pipeline.to_string(),
            index,
        }
    }

    fn texture_id(&self, index: usize) -> Result<ResourceId, BackendError> {
        match self.bindings.get(index) {
            Some(Binding::Texture(id)) => Ok(*id),
            _ => Err(self.invalid(index)),
        }
    }

    fn buffer_id(&self, index: usize) -> Result<ResourceId, BackendError> {
        match self.bindings.get(index) {
            Some(Binding::Buffer(id)) => Ok(*id),
            _ => Err(self.invalid(index)),
        }
    }

    /// Texel value of a bound texture, `None` if its contents are undefined.
    pub fn texture_value(&self, index: usize) -> Result<Option<[f32; 4]>, BackendError> {
        let id = self.texture_id(index)?;
        self.memory
            .textures
            .get(&id)
            .map(|texture| texture.contents)
            .ok_or(BackendError::UnknownTexture(id))
    }

    /// Size of a bound texture.
    pub fn texture_extent(&self, index: usize) -> Result<Extent3d, BackendError> {
        let id = self.texture_id(index)?;
        self.memory
            .textures
            .get(&id)
            .map(|texture| texture.descriptor.size)
            .ok_or(BackendError::UnknownTexture(id))
    }

    /// Overwrite a bound texture's contents.
    pub fn set_texture_value(
        &mut self,
        index: usize,
        value: Option<[f32; 4]>,
    ) -> Result<(), BackendError> {
        let id = self.texture_id(index)?;
        let texture = self
            .memory
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        texture.contents = value;
        Ok(())
    }

    /// Contents of a bound buffer.
    pub fn buffer(&self, index: usize) -> Result<&[u8], BackendError> {
        let id = self.buffer_id(index)?;
        self.memory
            .buffers
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(BackendError::UnknownBuffer(id))
    }

    /// Mutable contents of a bound buffer.
    pub fn buffer_mut(&mut self, index: usize) -> Result<&mut [u8], BackendError> {
        let id = self.buffer_id(index)?;
        self.memory
            .buffers
            .get_mut(&id)
            .map(Vec::as_mut_slice)
            .ok_or(BackendError::UnknownBuffer(id))
    }
}
