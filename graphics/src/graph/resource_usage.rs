//! Resource usage declarations for dependency analysis and barrier placement.
//!
//! Every pass lists the registry resources it touches as [`ResourceUse`]s.
//! The graph compiler derives execution order and barriers from these
//! declarations alone, so a pass body must never touch anything it did not
//! declare.

use std::ops::Range;

use crate::resources::ResourceKind;
use crate::types::{BufferUsage, TextureUsage};

/// How a pass accesses a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Reads contents written earlier in this frame.
    Read,
    /// Overwrites the contents.
    Write,
    /// Reads and then modifies the contents.
    ReadWrite,
    /// Reads the contents carried in from the previous frame.
    ///
    /// The reader is ordered before the first writer of this frame.
    ReadHistory,
}

impl Access {
    /// Check if this access reads the resource.
    pub fn is_read(self) -> bool {
        !matches!(self, Self::Write)
    }

    /// Check if this access writes the resource.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Check if this access reads the previous frame's contents.
    pub fn is_history(self) -> bool {
        matches!(self, Self::ReadHistory)
    }
}

/// The binding role a resource plays in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRole {
    /// Color render target.
    ColorAttachment,
    /// Depth/stencil render target.
    DepthAttachment,
    /// Depth test without depth writes.
    DepthReadOnly,
    /// Sampled in a shader.
    Sampled,
    /// Storage image or storage buffer.
    Storage,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
    /// Uniform buffer.
    Uniform,
    /// Vertex buffer.
    Vertex,
    /// Index buffer.
    Index,
    /// Indirect draw arguments.
    Indirect,
}

impl ResourceRole {
    /// Check if a resource of this kind can play this role.
    pub fn accepts(self, kind: ResourceKind) -> bool {
        match self {
            Self::ColorAttachment | Self::DepthAttachment | Self::DepthReadOnly | Self::Sampled => {
                kind == ResourceKind::Image
            }
            Self::Uniform | Self::Vertex | Self::Index | Self::Indirect => {
                kind == ResourceKind::Buffer
            }
            Self::Storage | Self::TransferSrc | Self::TransferDst => true,
        }
    }

    /// Check if this role can read.
    pub fn can_read(self) -> bool {
        !matches!(self, Self::TransferDst)
    }

    /// Check if this role can write.
    pub fn can_write(self) -> bool {
        matches!(
            self,
            Self::ColorAttachment | Self::DepthAttachment | Self::Storage | Self::TransferDst
        )
    }

    /// Check if this role permits the given access.
    pub fn allows(self, access: Access) -> bool {
        (!access.is_read() || self.can_read()) && (!access.is_write() || self.can_write())
    }

    /// Texture usage flags an image needs to play this role.
    pub fn texture_usage(self) -> TextureUsage {
        match self {
            Self::ColorAttachment | Self::DepthAttachment | Self::DepthReadOnly => {
                TextureUsage::RENDER_ATTACHMENT
            }
            Self::Sampled => TextureUsage::TEXTURE_BINDING,
            Self::Storage => TextureUsage::STORAGE_BINDING,
            Self::TransferSrc => TextureUsage::COPY_SRC,
            Self::TransferDst => TextureUsage::COPY_DST,
            Self::Uniform | Self::Vertex | Self::Index | Self::Indirect => TextureUsage::empty(),
        }
    }

    /// Buffer usage flags a buffer needs to play this role.
    pub fn buffer_usage(self) -> BufferUsage {
        match self {
            Self::Storage => BufferUsage::STORAGE,
            Self::TransferSrc => BufferUsage::COPY_SRC,
            Self::TransferDst => BufferUsage::COPY_DST,
            Self::Uniform => BufferUsage::UNIFORM,
            Self::Vertex => BufferUsage::VERTEX,
            Self::Index => BufferUsage::INDEX,
            Self::Indirect => BufferUsage::INDIRECT,
            Self::ColorAttachment | Self::DepthAttachment | Self::DepthReadOnly | Self::Sampled => {
                BufferUsage::empty()
            }
        }
    }
}

/// A range of mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MipRange {
    /// First level.
    pub base: u32,
    /// Number of levels, or `None` for every level from `base` on.
    pub count: Option<u32>,
}

impl Default for MipRange {
    fn default() -> Self {
        Self::level(0)
    }
}

impl MipRange {
    /// A single level.
    pub fn level(level: u32) -> Self {
        Self {
            base: level,
            count: Some(1),
        }
    }

    /// `count` levels starting at `base`.
    pub fn levels(base: u32, count: u32) -> Self {
        Self {
            base,
            count: Some(count),
        }
    }

    /// Every level of the image.
    pub fn all() -> Self {
        Self {
            base: 0,
            count: None,
        }
    }

    /// Resolve against an image with `total` levels.
    ///
    /// Returns `None` if the range is empty or out of bounds.
    pub fn resolve(self, total: u32) -> Option<Range<u32>> {
        let count = self.count.unwrap_or(total.saturating_sub(self.base));
        let end = self.base.checked_add(count)?;
        (count > 0 && end <= total).then_some(self.base..end)
    }
}

/// A pass's declared intent on one registry resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUse {
    /// Registry name of the resource.
    pub resource: String,
    /// How the resource is accessed.
    pub access: Access,
    /// The role the resource plays.
    pub role: ResourceRole,
    /// Accessed mip levels (ignored for buffers).
    pub mips: MipRange,
}

impl ResourceUse {
    /// Create a new usage declaration on mip level 0.
    pub fn new(resource: impl Into<String>, access: Access, role: ResourceRole) -> Self {
        Self {
            resource: resource.into(),
            access,
            role,
            mips: MipRange::default(),
        }
    }

    /// Read access.
    pub fn read(resource: impl Into<String>, role: ResourceRole) -> Self {
        Self::new(resource, Access::Read, role)
    }

    /// Write access.
    pub fn write(resource: impl Into<String>, role: ResourceRole) -> Self {
        Self::new(resource, Access::Write, role)
    }

    /// Read-modify-write access.
    pub fn read_write(resource: impl Into<String>, role: ResourceRole) -> Self {
        Self::new(resource, Access::ReadWrite, role)
    }

    /// Read of the previous frame's contents.
    pub fn read_history(resource: impl Into<String>, role: ResourceRole) -> Self {
        Self::new(resource, Access::ReadHistory, role)
    }

    /// Set the mip range.
    pub fn with_mips(mut self, mips: MipRange) -> Self {
        self.mips = mips;
        self
    }

    /// Restrict to a single mip level.
    pub fn mip(self, level: u32) -> Self {
        self.with_mips(MipRange::level(level))
    }
}
