//! Named GPU resources with automatic recreation on resize.
//!
//! The [`ResourceRegistry`] owns every image and buffer that passes share.
//! Passes refer to resources by name only; all creation and destruction
//! funnels through [`ResourceRegistry::realize`] and
//! [`ResourceRegistry::release_all`].
//!
//! # Lifetimes
//!
//! - [`ResourceLifetime::Persistent`]: survives frames and graph rebuilds.
//!   History buffers rely on this.
//! - [`ResourceLifetime::Transient`]: contents are discarded at the start of
//!   every graph execution.
//! - [`ResourceLifetime::Imported`]: owned elsewhere and bound each frame
//!   with [`ResourceRegistry::import_texture`] (the presentable image).
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ResourceRegistry::new(device.clone());
//! registry.declare("color", TextureFormat::Rgba16Float, usage, ResourceLifetime::Persistent)?;
//! registry.declare_image(
//!     "bloom",
//!     ImageDeclaration::new(TextureFormat::Rgba16Float, usage, ResourceLifetime::Persistent)
//!         .with_mips(MipPolicy::Fixed(4)),
//! )?;
//! registry.realize(Extent3d::new_2d(1280, 720))?;
//! let color = registry.texture("color")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::command::CommandEncoder;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, Texture};
use crate::types::{
    BufferDescriptor, BufferUsage, Extent3d, TextureDescriptor, TextureFormat, TextureUsage,
    mip_chain_length,
};

/// Lifetime class of a registry resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceLifetime {
    /// Survives across frames and graph rebuilds.
    Persistent,
    /// Valid only within one graph execution.
    Transient,
    /// Owned outside the registry and imported every frame.
    Imported,
}

/// How an image's dimensions derive from the render extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizePolicy {
    /// Half resolution if the name starts with a half-resolution prefix,
    /// full resolution otherwise.
    #[default]
    Automatic,
    /// Exactly the render extent.
    FullResolution,
    /// Half the render extent, rounded down.
    HalfResolution,
    /// Fixed dimensions, never recreated on resize.
    Fixed { width: u32, height: u32 },
}

/// How many mip levels an image has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipPolicy {
    /// A single level.
    #[default]
    Single,
    /// A fixed number of levels, clamped to the full chain of the image size.
    Fixed(u32),
    /// The full chain, `floor(log2(max(w, h))) + 1`.
    FullChain,
}

/// Kind of a registry resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Buffer,
}

/// Declared usage flags of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredUsage {
    Image(TextureUsage),
    Buffer(BufferUsage),
}

impl DeclaredUsage {
    /// Kind of resource these flags belong to.
    pub fn kind(self) -> ResourceKind {
        match self {
            Self::Image(_) => ResourceKind::Image,
            Self::Buffer(_) => ResourceKind::Buffer,
        }
    }
}

/// Declaration of a registry image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDeclaration {
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub lifetime: ResourceLifetime,
    pub size: SizePolicy,
    pub mips: MipPolicy,
}

impl ImageDeclaration {
    /// Create a declaration with automatic size and a single mip level.
    pub fn new(format: TextureFormat, usage: TextureUsage, lifetime: ResourceLifetime) -> Self {
        Self {
            format,
            usage,
            lifetime,
            size: SizePolicy::Automatic,
            mips: MipPolicy::Single,
        }
    }

    /// Set the size policy.
    pub fn with_size(mut self, size: SizePolicy) -> Self {
        self.size = size;
        self
    }

    /// Set the mip policy.
    pub fn with_mips(mut self, mips: MipPolicy) -> Self {
        self.mips = mips;
        self
    }
}

/// Declaration of a registry buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDeclaration {
    pub size: u64,
    pub usage: BufferUsage,
    pub lifetime: ResourceLifetime,
}

/// Summary of a declared resource, used by graph validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceInfo {
    pub lifetime: ResourceLifetime,
    pub usage: DeclaredUsage,
}

/// The backing object currently bound to a name.
#[derive(Debug, Clone)]
pub enum ResourceInstance {
    Texture(Arc<Texture>),
    Buffer(Arc<Buffer>),
}

/// Errors raised by registry declarations and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No resource with this name was declared.
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
    /// The name was already declared with another lifetime class.
    #[error("resource '{name}' already declared as {declared:?}, cannot redeclare as {requested:?}")]
    LifetimeConflict {
        name: String,
        declared: ResourceLifetime,
        requested: ResourceLifetime,
    },
    /// The name was already declared as the other kind of resource.
    #[error("resource '{0}' already declared as a different kind")]
    KindConflict(String),
    /// The resource has no backing instance yet.
    #[error("resource '{0}' is not realized")]
    NotRealized(String),
    /// The resource is a buffer, not an image.
    #[error("resource '{0}' is not an image")]
    NotAnImage(String),
    /// The resource is an image, not a buffer.
    #[error("resource '{0}' is not a buffer")]
    NotABuffer(String),
    /// Only imported resources can be bound from outside.
    #[error("resource '{0}' is not declared as imported")]
    NotImported(String),
}

impl RegistryError {
    /// Returns `true` for declaration mistakes, which must abort startup.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::NotRealized(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Declaration {
    Image(ImageDeclaration),
    Buffer(BufferDeclaration),
}

impl Declaration {
    fn lifetime(&self) -> ResourceLifetime {
        match self {
            Self::Image(image) => image.lifetime,
            Self::Buffer(buffer) => buffer.lifetime,
        }
    }

    fn kind(&self) -> ResourceKind {
        match self {
            Self::Image(_) => ResourceKind::Image,
            Self::Buffer(_) => ResourceKind::Buffer,
        }
    }
}

#[derive(Debug)]
struct Entry {
    name: String,
    declaration: Declaration,
    instance: Option<ResourceInstance>,
}

/// Owner of every named image and buffer.
#[derive(Debug)]
pub struct ResourceRegistry {
    device: Arc<GraphicsDevice>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    half_resolution_prefixes: Vec<String>,
    extent: Option<Extent3d>,
}

impl ResourceRegistry {
    /// Name prefixes sized at half resolution under [`SizePolicy::Automatic`].
    pub const DEFAULT_HALF_RESOLUTION_PREFIXES: [&'static str; 2] = ["ssao", "clouds"];

    /// Create an empty registry.
    pub fn new(device: Arc<GraphicsDevice>) -> Self {
        Self {
            device,
            entries: Vec::new(),
            index: HashMap::new(),
            half_resolution_prefixes: Self::DEFAULT_HALF_RESOLUTION_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            extent: None,
        }
    }

    /// Replace the half-resolution name prefixes.
    pub fn with_half_resolution_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.half_resolution_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Get the device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Extent of the last successful realize.
    pub fn extent(&self) -> Option<Extent3d> {
        self.extent
    }

    /// Declare an image with automatic sizing and a single mip level.
    pub fn declare(
        &mut self,
        name: &str,
        format: TextureFormat,
        usage: TextureUsage,
        lifetime: ResourceLifetime,
    ) -> Result<(), RegistryError> {
        self.declare_image(name, ImageDeclaration::new(format, usage, lifetime))
    }

    /// Declare an image.
    pub fn declare_image(
        &mut self,
        name: &str,
        declaration: ImageDeclaration,
    ) -> Result<(), RegistryError> {
        self.insert(name, Declaration::Image(declaration))
    }

    /// Declare a buffer of `size` bytes.
    pub fn declare_buffer(
        &mut self,
        name: &str,
        size: u64,
        usage: BufferUsage,
        lifetime: ResourceLifetime,
    ) -> Result<(), RegistryError> {
        self.insert(
            name,
            Declaration::Buffer(BufferDeclaration {
                size,
                usage,
                lifetime,
            }),
        )
    }

    fn insert(&mut self, name: &str, declaration: Declaration) -> Result<(), RegistryError> {
        let Some(&index) = self.index.get(name) else {
            log::trace!("ResourceRegistry: declared '{}' as {:?}", name, declaration.lifetime());
            self.index.insert(name.to_string(), self.entries.len());
            self.entries.push(Entry {
                name: name.to_string(),
                declaration,
                instance: None,
            });
            return Ok(());
        };

        let entry = &mut self.entries[index];
        if entry.declaration.lifetime() != declaration.lifetime() {
            return Err(RegistryError::LifetimeConflict {
                name: name.to_string(),
                declared: entry.declaration.lifetime(),
                requested: declaration.lifetime(),
            });
        }
        if entry.declaration.kind() != declaration.kind() {
            return Err(RegistryError::KindConflict(name.to_string()));
        }
        if entry.declaration != declaration {
            log::debug!("ResourceRegistry: updated declaration of '{}'", name);
            entry.declaration = declaration;
        }
        Ok(())
    }

    /// Returns `true` if the name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.index
            .get(name)
            .map(|&index| &self.entries[index])
            .ok_or_else(|| RegistryError::UnknownResource(name.to_string()))
    }

    /// Lifetime and usage of a declared resource.
    pub fn info(&self, name: &str) -> Result<ResourceInfo, RegistryError> {
        let entry = self.entry(name)?;
        let usage = match &entry.declaration {
            Declaration::Image(image) => DeclaredUsage::Image(image.usage),
            Declaration::Buffer(buffer) => DeclaredUsage::Buffer(buffer.usage),
        };
        Ok(ResourceInfo {
            lifetime: entry.declaration.lifetime(),
            usage,
        })
    }

    /// Number of mip levels an image has, or will have once realized.
    ///
    /// Fails with [`RegistryError::NotRealized`] for a full-chain image that
    /// has no size yet.
    pub fn mip_levels(&self, name: &str) -> Result<u32, RegistryError> {
        let entry = self.entry(name)?;
        let Declaration::Image(image) = &entry.declaration else {
            return Err(RegistryError::NotAnImage(name.to_string()));
        };
        if let Some(ResourceInstance::Texture(texture)) = &entry.instance {
            return Ok(texture.mip_level_count());
        }
        let extent = match (image.size, self.extent) {
            (SizePolicy::Fixed { width, height }, _) => Extent3d::new_2d(width, height),
            (_, Some(extent)) => self.image_extent(name, image, extent),
            (_, None) => match image.mips {
                MipPolicy::Single => return Ok(1),
                MipPolicy::Fixed(count) => return Ok(count.max(1)),
                MipPolicy::FullChain => return Err(RegistryError::NotRealized(name.to_string())),
            },
        };
        Ok(Self::mip_count(image.mips, extent))
    }

    fn image_extent(&self, name: &str, image: &ImageDeclaration, extent: Extent3d) -> Extent3d {
        match image.size {
            SizePolicy::FullResolution => extent,
            SizePolicy::HalfResolution => extent.half(),
            SizePolicy::Fixed { width, height } => Extent3d::new_2d(width, height),
            SizePolicy::Automatic => {
                let half = self
                    .half_resolution_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()));
                if half { extent.half() } else { extent }
            }
        }
    }

    fn mip_count(mips: MipPolicy, size: Extent3d) -> u32 {
        let chain = mip_chain_length(size.width, size.height);
        match mips {
            MipPolicy::Single => 1,
            MipPolicy::Fixed(count) => count.clamp(1, chain),
            MipPolicy::FullChain => chain,
        }
    }

    fn desired_texture(&self, entry: &Entry, image: &ImageDeclaration, extent: Extent3d) -> TextureDescriptor {
        let size = self.image_extent(&entry.name, image, extent);
        TextureDescriptor::new_2d(size.width, size.height, image.format, image.usage)
            .with_mip_levels(Self::mip_count(image.mips, size))
            .with_label(entry.name.clone())
    }

    /// Create or recreate every owned resource for the render extent.
    ///
    /// Instances whose descriptor is unchanged are kept, so calling this
    /// twice with the same extent creates nothing the second time. Before
    /// replacing anything the device is drained, so no in-flight execution
    /// can still reference a replaced instance.
    ///
    /// Every replacement is created before any old instance is retired. If a
    /// creation fails, the registry keeps its previous extent and instances.
    ///
    /// Returns the number of instances created.
    pub fn realize(&mut self, extent: Extent3d) -> Result<usize, GraphicsError> {
        if extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot realize resources at {}x{}",
                extent.width, extent.height
            )));
        }

        enum Desired {
            Texture(TextureDescriptor),
            Buffer(BufferDescriptor),
        }

        let mut changes = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let desired = match &entry.declaration {
                Declaration::Image(image) if image.lifetime == ResourceLifetime::Imported => {
                    continue;
                }
                Declaration::Image(image) => {
                    Desired::Texture(self.desired_texture(entry, image, extent))
                }
                Declaration::Buffer(buffer) if buffer.lifetime == ResourceLifetime::Imported => {
                    continue;
                }
                Declaration::Buffer(buffer) => Desired::Buffer(
                    BufferDescriptor::new(buffer.size, buffer.usage).with_label(entry.name.clone()),
                ),
            };
            let unchanged = match (&entry.instance, &desired) {
                (Some(ResourceInstance::Texture(texture)), Desired::Texture(descriptor)) => {
                    texture.descriptor() == descriptor
                }
                (Some(ResourceInstance::Buffer(buffer)), Desired::Buffer(descriptor)) => {
                    buffer.descriptor() == descriptor
                }
                _ => false,
            };
            if !unchanged {
                changes.push((index, desired));
            }
        }

        if changes.is_empty() {
            self.extent = Some(extent);
            log::debug!(
                "ResourceRegistry: realize at {}x{} changed nothing",
                extent.width,
                extent.height
            );
            return Ok(0);
        }

        self.device.wait_idle()?;

        let mut staged = Vec::with_capacity(changes.len());
        for (index, desired) in changes {
            let created = match desired {
                Desired::Texture(descriptor) => self
                    .device
                    .create_texture(&descriptor)
                    .map(ResourceInstance::Texture),
                Desired::Buffer(descriptor) => self
                    .device
                    .create_buffer(&descriptor)
                    .map(ResourceInstance::Buffer),
            };
            match created {
                Ok(instance) => staged.push((index, instance)),
                Err(error) => {
                    log::error!(
                        "ResourceRegistry: realize at {}x{} failed on '{}': {}",
                        extent.width,
                        extent.height,
                        self.entries[index].name,
                        error
                    );
                    for (_, instance) in staged {
                        Self::retire(&self.device, instance);
                    }
                    self.device.collect_garbage();
                    return Err(error);
                }
            }
        }

        let created = staged.len();
        for (index, instance) in staged {
            if let Some(old) = self.entries[index].instance.replace(instance) {
                Self::retire(&self.device, old);
            }
        }
        self.extent = Some(extent);
        self.device.collect_garbage();

        log::info!(
            "ResourceRegistry: realized {} resources at {}x{}",
            created,
            extent.width,
            extent.height
        );
        Ok(created)
    }

    fn retire(device: &GraphicsDevice, instance: ResourceInstance) {
        match instance {
            ResourceInstance::Texture(texture) => device.retire_texture(texture),
            ResourceInstance::Buffer(buffer) => device.retire_buffer(buffer),
        }
    }

    /// Bind an externally owned texture to an imported name.
    pub fn import_texture(&mut self, name: &str, texture: Arc<Texture>) -> Result<(), RegistryError> {
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| RegistryError::UnknownResource(name.to_string()))?;
        let entry = &mut self.entries[index];
        match &entry.declaration {
            Declaration::Image(image) if image.lifetime == ResourceLifetime::Imported => {
                entry.instance = Some(ResourceInstance::Texture(texture));
                Ok(())
            }
            Declaration::Image(_) => Err(RegistryError::NotImported(name.to_string())),
            Declaration::Buffer(_) => Err(RegistryError::NotAnImage(name.to_string())),
        }
    }

    /// Current backing instance of a name.
    pub fn get(&self, name: &str) -> Result<ResourceInstance, RegistryError> {
        self.entry(name)?
            .instance
            .clone()
            .ok_or_else(|| RegistryError::NotRealized(name.to_string()))
    }

    /// Current backing texture of an image name.
    pub fn texture(&self, name: &str) -> Result<&Arc<Texture>, RegistryError> {
        let entry = self.entry(name)?;
        match (&entry.declaration, &entry.instance) {
            (Declaration::Buffer(_), _) => Err(RegistryError::NotAnImage(name.to_string())),
            (_, Some(ResourceInstance::Texture(texture))) => Ok(texture),
            _ => Err(RegistryError::NotRealized(name.to_string())),
        }
    }

    /// Current backing buffer of a buffer name.
    pub fn buffer(&self, name: &str) -> Result<&Arc<Buffer>, RegistryError> {
        let entry = self.entry(name)?;
        match (&entry.declaration, &entry.instance) {
            (Declaration::Image(_), _) => Err(RegistryError::NotABuffer(name.to_string())),
            (_, Some(ResourceInstance::Buffer(buffer))) => Ok(buffer),
            _ => Err(RegistryError::NotRealized(name.to_string())),
        }
    }

    /// Record discards for every realized transient image.
    pub fn discard_transients(&self, encoder: &mut CommandEncoder) {
        for entry in &self.entries {
            if entry.declaration.lifetime() != ResourceLifetime::Transient {
                continue;
            }
            if let Some(ResourceInstance::Texture(texture)) = &entry.instance {
                encoder.discard_texture(texture);
            }
        }
    }

    /// Retire every owned instance and unbind imported ones.
    pub fn release_all(&mut self) {
        let mut released = 0;
        for entry in &mut self.entries {
            let Some(instance) = entry.instance.take() else {
                continue;
            };
            if entry.declaration.lifetime() != ResourceLifetime::Imported {
                Self::retire(&self.device, instance);
                released += 1;
            }
        }
        self.extent = None;
        log::info!("ResourceRegistry: released {} resources", released);
    }
}
