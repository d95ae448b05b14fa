//! Pass types.

use super::context::PassContext;
use super::resource_usage::{ResourceRole, ResourceUse};
use crate::error::GraphicsError;

/// Execution body of a pass.
///
/// Bodies are opaque to the graph: they only record commands through the
/// [`PassContext`] they receive.
pub type PassBody = Box<dyn FnMut(&mut PassContext<'_>) -> Result<(), GraphicsError> + Send>;

/// The kind of GPU work a pass performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Graphics pass (vertex/fragment shaders, rasterization).
    Graphics,
    /// Compute pass (compute shaders).
    Compute,
    /// Transfer pass (copy operations).
    Transfer,
}

/// A pass in the pass graph.
///
/// A pass is a named unit of work with a fixed set of [`ResourceUse`]s and
/// an opaque body. Configure it fully before adding it to the graph:
///
/// ```ignore
/// let pass = Pass::compute("ssao blur", |ctx| {
///     ctx.encoder().dispatch("ssao_blur", [60, 34, 1], Vec::new(), &[]);
///     Ok(())
/// })
/// .reads("ssao", ResourceRole::Sampled)
/// .writes("ssao blur", ResourceRole::Storage)
/// .with_category("Ambient Occlusion");
/// ```
pub struct Pass {
    pub(super) name: String,
    kind: PassKind,
    pub(super) uses: Vec<ResourceUse>,
    category: Option<String>,
    pub(super) body: PassBody,
}

impl Pass {
    /// Create a new pass.
    pub fn new<F>(name: impl Into<String>, kind: PassKind, body: F) -> Self
    where
        F: FnMut(&mut PassContext<'_>) -> Result<(), GraphicsError> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind,
            uses: Vec::new(),
            category: None,
            body: Box::new(body),
        }
    }

    /// Create a graphics pass.
    pub fn graphics<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut PassContext<'_>) -> Result<(), GraphicsError> + Send + 'static,
    {
        Self::new(name, PassKind::Graphics, body)
    }

    /// Create a compute pass.
    pub fn compute<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut PassContext<'_>) -> Result<(), GraphicsError> + Send + 'static,
    {
        Self::new(name, PassKind::Compute, body)
    }

    /// Create a transfer pass.
    pub fn transfer<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut PassContext<'_>) -> Result<(), GraphicsError> + Send + 'static,
    {
        Self::new(name, PassKind::Transfer, body)
    }

    /// Add a usage declaration.
    pub fn with_use(mut self, usage: ResourceUse) -> Self {
        self.uses.push(usage);
        self
    }

    /// Declare a read.
    pub fn reads(self, resource: &str, role: ResourceRole) -> Self {
        self.with_use(ResourceUse::read(resource, role))
    }

    /// Declare a write.
    pub fn writes(self, resource: &str, role: ResourceRole) -> Self {
        self.with_use(ResourceUse::write(resource, role))
    }

    /// Declare a read-modify-write.
    pub fn read_writes(self, resource: &str, role: ResourceRole) -> Self {
        self.with_use(ResourceUse::read_write(resource, role))
    }

    /// Declare a read of the previous frame's contents.
    pub fn reads_history(self, resource: &str, role: ResourceRole) -> Self {
        self.with_use(ResourceUse::read_history(resource, role))
    }

    /// Set the metric category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Get the pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass kind.
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Declared resource uses, in declaration order.
    pub fn uses(&self) -> &[ResourceUse] {
        &self.uses
    }

    /// Metric category, defaulting to the pass name.
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(&self.name)
    }

    /// Check if this pass declares any use of `resource`.
    pub fn declares(&self, resource: &str) -> bool {
        self.uses.iter().any(|usage| usage.resource == resource)
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("uses", &self.uses)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Access;

    #[test]
    fn test_pass_builder() {
        let pass = Pass::graphics("composition", |_| Ok(()))
            .reads("albedo", ResourceRole::Sampled)
            .writes("color", ResourceRole::ColorAttachment)
            .with_category("Composition");

        assert_eq!(pass.name(), "composition");
        assert_eq!(pass.kind(), PassKind::Graphics);
        assert_eq!(pass.uses().len(), 2);
        assert_eq!(pass.uses()[1].access, Access::Write);
        assert_eq!(pass.category(), "Composition");
        assert!(pass.declares("albedo"));
        assert!(!pass.declares("depth"));
    }

    #[test]
    fn test_category_defaults_to_name() {
        let pass = Pass::transfer("copy image - color", |_| Ok(()));
        assert_eq!(pass.category(), "copy image - color");
    }
}
