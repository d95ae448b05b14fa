//! Per-pass execution context.

use std::sync::Arc;

use super::GraphError;
use super::resource_usage::ResourceUse;
use crate::command::CommandEncoder;
use crate::error::GraphicsError;
use crate::resources::{Buffer, ResourceRegistry, Texture};
use crate::scheduler::FrameSlot;
use crate::uniforms::FrameContext;

/// What a pass body sees while it executes.
///
/// Registry lookups are restricted to the pass's declared uses, so a body
/// cannot silently touch a resource the compiler did not order it against.
pub struct PassContext<'a> {
    pass: &'a str,
    uses: &'a [ResourceUse],
    frame: &'a FrameContext,
    registry: &'a ResourceRegistry,
    encoder: &'a mut CommandEncoder,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        pass: &'a str,
        uses: &'a [ResourceUse],
        frame: &'a FrameContext,
        registry: &'a ResourceRegistry,
        encoder: &'a mut CommandEncoder,
    ) -> Self {
        Self {
            pass,
            uses,
            frame,
            registry,
            encoder,
        }
    }

    /// Name of the executing pass.
    pub fn pass_name(&self) -> &str {
        self.pass
    }

    /// The frame being rendered.
    pub fn frame(&self) -> &FrameContext {
        self.frame
    }

    /// The frame slot whose uniforms this frame uses.
    pub fn slot(&self) -> FrameSlot {
        self.frame.slot
    }

    /// The pass's declared uses.
    pub fn uses(&self) -> &[ResourceUse] {
        self.uses
    }

    fn check_declared(&self, resource: &str) -> Result<(), GraphicsError> {
        if self.uses.iter().any(|usage| usage.resource == resource) {
            Ok(())
        } else {
            Err(GraphError::UndeclaredUse {
                pass: self.pass.to_string(),
                resource: resource.to_string(),
            }
            .into())
        }
    }

    /// Look up a declared image.
    pub fn texture(&self, resource: &str) -> Result<&'a Arc<Texture>, GraphicsError> {
        self.check_declared(resource)?;
        Ok(self.registry.texture(resource)?)
    }

    /// Look up a declared buffer.
    pub fn buffer(&self, resource: &str) -> Result<&'a Arc<Buffer>, GraphicsError> {
        self.check_declared(resource)?;
        Ok(self.registry.buffer(resource)?)
    }

    /// The command encoder for this frame.
    pub fn encoder(&mut self) -> &mut CommandEncoder {
        self.encoder
    }
}
