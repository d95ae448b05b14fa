//! Stock resource set of the frame.

use crate::resources::{
    ImageDeclaration, MipPolicy, RegistryError, ResourceLifetime, ResourceRegistry, SizePolicy,
};
use crate::temporal::AutoExposureData;
use crate::types::{BufferUsage, TextureFormat, TextureUsage};

use super::RendererConfig;

/// Registry names of the stock resources.
pub mod names {
    pub const SWAPCHAIN: &str = "swapchain";
    pub const COLOR: &str = "color";
    pub const ALBEDO: &str = "albedo";
    pub const EMISSIVE: &str = "emissive";
    pub const NORMAL: &str = "normal";
    pub const METALLIC_ROUGHNESS: &str = "metallic roughness";
    pub const VELOCITY: &str = "velocity";
    pub const DEPTH: &str = "depth";
    pub const RESOLVED: &str = "resolved";
    pub const PREVIOUS_COLOR: &str = "previous color";
    pub const PREVIOUS_VELOCITY: &str = "previous velocity";
    pub const SSAO: &str = "ssao";
    pub const SSAO_BLUR: &str = "ssao blur";
    pub const CLOUDS: &str = "clouds";
    pub const SSR: &str = "ssr";
    pub const MIN_HIZ: &str = "min hiz";
    pub const MAX_HIZ: &str = "max hiz";
    pub const DEPTH_OF_FIELD: &str = "depth of field";
    pub const BLOOM: &str = "bloom";
    pub const SUN_SHADOW: &str = "sun shadow";
    pub const TERRAIN_VERTICES: &str = "terrain vertices";
    pub const TERRAIN_INDICES: &str = "terrain indices";
    pub const TERRAIN_NORMAL_MAP: &str = "terrain normal map";
    pub const AUTO_EXPOSURE: &str = "auto exposure";
}

use names::*;

const ATTACHMENT: TextureUsage = TextureUsage::RENDER_ATTACHMENT.union(TextureUsage::TEXTURE_BINDING);
const STORAGE_IMAGE: TextureUsage = TextureUsage::STORAGE_BINDING.union(TextureUsage::TEXTURE_BINDING);

/// Declare every stock image and buffer.
pub fn declare_stock_resources(
    registry: &mut ResourceRegistry,
    config: &RendererConfig,
    swapchain_format: TextureFormat,
) -> Result<(), RegistryError> {
    use ResourceLifetime::{Imported, Persistent, Transient};

    registry.declare(
        SWAPCHAIN,
        swapchain_format,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::STORAGE_BINDING | TextureUsage::COPY_DST,
        Imported,
    )?;

    // G-buffer and lighting targets.
    registry.declare(
        COLOR,
        TextureFormat::Rgba16Float,
        ATTACHMENT | STORAGE_IMAGE | TextureUsage::COPY_SRC,
        Transient,
    )?;
    registry.declare(ALBEDO, TextureFormat::Rgba8Unorm, ATTACHMENT, Transient)?;
    registry.declare(EMISSIVE, TextureFormat::Rgba16Float, ATTACHMENT, Transient)?;
    registry.declare(NORMAL, TextureFormat::Rgba16Float, ATTACHMENT, Transient)?;
    registry.declare(METALLIC_ROUGHNESS, TextureFormat::Rg16Float, ATTACHMENT, Transient)?;
    registry.declare(
        VELOCITY,
        TextureFormat::Rg16Float,
        ATTACHMENT | TextureUsage::COPY_SRC,
        Transient,
    )?;
    registry.declare(DEPTH, TextureFormat::Depth32Float, ATTACHMENT, Transient)?;

    // Temporal resolve and its history.
    registry.declare(
        RESOLVED,
        TextureFormat::Rgba16Float,
        STORAGE_IMAGE | TextureUsage::COPY_SRC,
        Transient,
    )?;
    registry.declare(
        PREVIOUS_COLOR,
        TextureFormat::Rgba16Float,
        TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        Persistent,
    )?;
    registry.declare(
        PREVIOUS_VELOCITY,
        TextureFormat::Rg16Float,
        TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        Persistent,
    )?;

    // Half resolution by name prefix.
    registry.declare(SSAO, TextureFormat::R16Float, STORAGE_IMAGE, Transient)?;
    registry.declare(SSAO_BLUR, TextureFormat::R16Float, STORAGE_IMAGE, Transient)?;
    registry.declare(CLOUDS, TextureFormat::Rgba16Float, STORAGE_IMAGE, Transient)?;

    registry.declare(SSR, TextureFormat::Rgba16Float, STORAGE_IMAGE, Transient)?;

    // Mip chains.
    for name in [MIN_HIZ, MAX_HIZ] {
        registry.declare_image(
            name,
            ImageDeclaration::new(TextureFormat::R32Float, STORAGE_IMAGE, Transient)
                .with_mips(MipPolicy::FullChain),
        )?;
    }
    registry.declare_image(
        DEPTH_OF_FIELD,
        ImageDeclaration::new(
            TextureFormat::Rgba16Float,
            STORAGE_IMAGE | TextureUsage::COPY_DST,
            Transient,
        )
        .with_mips(MipPolicy::FullChain),
    )?;
    registry.declare_image(
        BLOOM,
        ImageDeclaration::new(TextureFormat::Rgba16Float, STORAGE_IMAGE, Transient)
            .with_mips(MipPolicy::Fixed(config.bloom_mips)),
    )?;

    // Fixed size.
    registry.declare_image(
        SUN_SHADOW,
        ImageDeclaration::new(TextureFormat::Depth32Float, ATTACHMENT, Persistent).with_size(
            SizePolicy::Fixed {
                width: config.shadow_map_size,
                height: config.shadow_map_size,
            },
        ),
    )?;
    registry.declare_image(
        TERRAIN_NORMAL_MAP,
        ImageDeclaration::new(
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            Persistent,
        )
        .with_size(SizePolicy::Fixed {
            width: config.terrain_normal_map_size,
            height: config.terrain_normal_map_size,
        }),
    )?;

    registry.declare_buffer(
        TERRAIN_VERTICES,
        config.terrain_vertex_buffer_size,
        BufferUsage::VERTEX | BufferUsage::STORAGE | BufferUsage::COPY_DST,
        Persistent,
    )?;
    registry.declare_buffer(
        TERRAIN_INDICES,
        config.terrain_index_buffer_size,
        BufferUsage::INDEX | BufferUsage::COPY_DST,
        Persistent,
    )?;
    registry.declare_buffer(
        AUTO_EXPOSURE,
        AutoExposureData::SIZE,
        BufferUsage::STORAGE | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
        Persistent,
    )?;

    Ok(())
}
