//! The stock pass set.
//!
//! Passes are added in frame order; the graph compiler derives the actual
//! order and barriers from the declared uses. Shading itself is opaque
//! here: graphics passes record a draw against a named pipeline, compute
//! passes a dispatch with their bindings.

use crate::command::Binding;
use crate::error::GraphicsError;
use crate::graph::{MipRange, Pass, PassContext, PassGraph, ResourceRole, ResourceUse};
use crate::resources::{ResourceRegistry, Texture};
use crate::temporal::exposure::{HISTOGRAM_PIPELINE, RESOLVE_PIPELINE};
use crate::temporal::{HistogramParams, ResolveParams};
use crate::types::ClearValue;

use super::kernels::{COMPOSITION_PIPELINE, TAA_PIPELINE, TONE_MAPPING_PIPELINE, ToneMapParams};
use super::resources::names::*;
use super::{FeatureToggles, RendererConfig};

use ResourceRole::{
    ColorAttachment, DepthAttachment, DepthReadOnly, Index, Sampled, Storage, TransferDst,
    TransferSrc, Vertex,
};

/// Compute tile edge in texels.
const TILE: u32 = 8;

/// Vertices per object draw (unit cube proxy).
const OBJECT_VERTICES: u32 = 36;

/// Fullscreen triangle.
const FULLSCREEN_VERTICES: u32 = 3;

const G_BUFFER: [&str; 5] = [ALBEDO, EMISSIVE, NORMAL, METALLIC_ROUGHNESS, VELOCITY];

/// Workgroup count covering `mip` of `texture`.
fn workgroups(texture: &Texture, mip: u32) -> [u32; 3] {
    let width = (texture.width() >> mip).max(1);
    let height = (texture.height() >> mip).max(1);
    [width.div_ceil(TILE), height.div_ceil(TILE), 1]
}

fn object_count(ctx: &PassContext<'_>) -> u32 {
    u32::try_from(ctx.frame().objects.len()).unwrap_or(u32::MAX)
}

/// Add the whole stock frame to `graph`.
///
/// The registry must be realized: mip chain lengths are read from it.
pub fn build_frame_passes(
    graph: &mut PassGraph,
    registry: &ResourceRegistry,
    config: &RendererConfig,
    features: FeatureToggles,
) -> Result<(), GraphicsError> {
    stratus_core::profile_function!();

    add_depth_passes(graph, registry)?;
    add_shadow_passes(graph, config)?;
    add_geometry_passes(graph, config)?;
    add_bloom_passes(graph, registry)?;
    add_ambient_occlusion_passes(graph)?;
    if features.screen_space_reflections {
        add_reflection_pass(graph)?;
    }
    add_cloud_pass(graph)?;
    add_composition_pass(graph, features)?;
    if features.depth_of_field {
        add_depth_of_field_passes(graph, registry)?;
    }
    add_exposure_passes(graph)?;
    add_temporal_passes(graph)?;
    add_output_passes(graph)?;

    log::debug!("Renderer: built {} passes", graph.pass_count());
    Ok(())
}

fn add_depth_passes(graph: &mut PassGraph, registry: &ResourceRegistry) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::graphics("depth prepass", |ctx| {
            let depth = ctx.texture(DEPTH)?;
            let instances = object_count(ctx);
            let encoder = ctx.encoder();
            encoder.clear_texture(depth, ClearValue::depth(1.0));
            encoder.draw("depth_prepass", OBJECT_VERTICES, instances);
            Ok(())
        })
        .writes(DEPTH, DepthAttachment)
        .with_category("Depth Prepass"),
    )?;

    for (pass, image, pipeline) in [
        ("generate min hiz", MIN_HIZ, "hiz_min"),
        ("generate max hiz", MAX_HIZ, "hiz_max"),
    ] {
        let levels = registry.mip_levels(image)?;
        graph.add_pass(
            Pass::compute(pass, move |ctx| {
                let depth = ctx.texture(DEPTH)?;
                let hiz = ctx.texture(image)?;
                for level in 0..levels {
                    let source = if level == 0 { depth } else { hiz };
                    ctx.encoder().dispatch(
                        pipeline,
                        workgroups(hiz, level),
                        vec![Binding::Texture(source.id()), Binding::Texture(hiz.id())],
                        bytemuck::bytes_of(&level),
                    );
                }
                Ok(())
            })
            .reads(DEPTH, Sampled)
            .with_use(ResourceUse::write(image, Storage).with_mips(MipRange::all()))
            .with_category("Depth Prepass"),
        )?;
    }
    Ok(())
}

fn add_shadow_passes(graph: &mut PassGraph, config: &RendererConfig) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::graphics("sun shadow draw", |ctx| {
            let shadow = ctx.texture(SUN_SHADOW)?;
            let instances = object_count(ctx);
            let encoder = ctx.encoder();
            encoder.clear_texture(shadow, ClearValue::depth(1.0));
            encoder.draw("sun_shadow", OBJECT_VERTICES, instances);
            Ok(())
        })
        .writes(SUN_SHADOW, DepthAttachment)
        .with_category("Shadows"),
    )?;

    let indices = config.terrain_index_count;
    graph.add_pass(
        Pass::graphics("sun shadow draw terrain", move |ctx| {
            ctx.encoder().draw("sun_shadow_terrain", indices, 1);
            Ok(())
        })
        .read_writes(SUN_SHADOW, DepthAttachment)
        .reads(TERRAIN_VERTICES, Vertex)
        .reads(TERRAIN_INDICES, Index)
        .with_category("Shadows"),
    )?;
    Ok(())
}

fn add_geometry_passes(graph: &mut PassGraph, config: &RendererConfig) -> Result<(), GraphicsError> {
    let mut gbuffer = Pass::graphics("g-buffer generation", |ctx| {
        let targets = G_BUFFER
            .iter()
            .map(|name| ctx.texture(name))
            .collect::<Result<Vec<_>, _>>()?;
        let instances = object_count(ctx);
        let encoder = ctx.encoder();
        for target in targets {
            encoder.clear_texture(target, ClearValue::color(0.0, 0.0, 0.0, 0.0));
        }
        encoder.draw("gbuffer", OBJECT_VERTICES, instances);
        Ok(())
    })
    .reads(DEPTH, DepthReadOnly)
    .with_category("Rendering G-Buffer");
    for name in G_BUFFER {
        gbuffer = gbuffer.writes(name, ColorAttachment);
    }
    graph.add_pass(gbuffer)?;

    let indices = config.terrain_index_count;
    let mut terrain = Pass::graphics("draw terrain", move |ctx| {
        ctx.encoder().draw("terrain", indices, 1);
        Ok(())
    })
    .read_writes(DEPTH, DepthAttachment)
    .reads(TERRAIN_VERTICES, Vertex)
    .reads(TERRAIN_INDICES, Index)
    .reads(TERRAIN_NORMAL_MAP, Sampled)
    .with_category("Rendering G-Buffer");
    for name in G_BUFFER {
        terrain = terrain.read_writes(name, ColorAttachment);
    }
    graph.add_pass(terrain)?;
    Ok(())
}

fn add_bloom_passes(graph: &mut PassGraph, registry: &ResourceRegistry) -> Result<(), GraphicsError> {
    let levels = registry.mip_levels(BLOOM)?;

    for level in 0..levels {
        let source = if level == 0 {
            ResourceUse::read(EMISSIVE, Sampled)
        } else {
            ResourceUse::read(BLOOM, Sampled).mip(level - 1)
        };
        graph.add_pass(
            Pass::compute(format!("bloom downsample - {level}"), move |ctx| {
                let input = if level == 0 {
                    ctx.texture(EMISSIVE)?
                } else {
                    ctx.texture(BLOOM)?
                };
                let bloom = ctx.texture(BLOOM)?;
                ctx.encoder().dispatch(
                    "bloom_downsample",
                    workgroups(bloom, level),
                    vec![Binding::Texture(input.id()), Binding::Texture(bloom.id())],
                    bytemuck::bytes_of(&level),
                );
                Ok(())
            })
            .with_use(source)
            .with_use(ResourceUse::write(BLOOM, Storage).mip(level))
            .with_category("Bloom"),
        )?;
    }

    for level in (0..levels).rev() {
        let mut pass = Pass::compute(format!("bloom upsample - {level}"), move |ctx| {
            let bloom = ctx.texture(BLOOM)?;
            ctx.encoder().dispatch(
                "bloom_upsample",
                workgroups(bloom, level),
                vec![Binding::Texture(bloom.id())],
                bytemuck::bytes_of(&level),
            );
            Ok(())
        })
        .with_use(ResourceUse::read_write(BLOOM, Storage).mip(level))
        .with_category("Bloom");
        if level + 1 < levels {
            pass = pass.with_use(ResourceUse::read(BLOOM, Sampled).mip(level + 1));
        }
        graph.add_pass(pass)?;
    }
    Ok(())
}

fn add_ambient_occlusion_passes(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("ssao generation", |ctx| {
            let depth = ctx.texture(DEPTH)?;
            let normal = ctx.texture(NORMAL)?;
            let ssao = ctx.texture(SSAO)?;
            let kernel_size = ctx.frame().globals.settings.ambient_occlusion.kernel_size;
            ctx.encoder().dispatch(
                "ssao",
                workgroups(ssao, 0),
                vec![
                    Binding::Texture(depth.id()),
                    Binding::Texture(normal.id()),
                    Binding::Texture(ssao.id()),
                ],
                bytemuck::bytes_of(&kernel_size),
            );
            Ok(())
        })
        .reads(DEPTH, Sampled)
        .reads(NORMAL, Sampled)
        .writes(SSAO, Storage)
        .with_category("Ambient Occlusion"),
    )?;

    graph.add_pass(
        Pass::compute("ssao blur", |ctx| {
            let ssao = ctx.texture(SSAO)?;
            let blurred = ctx.texture(SSAO_BLUR)?;
            ctx.encoder().dispatch(
                "ssao_blur",
                workgroups(blurred, 0),
                vec![Binding::Texture(ssao.id()), Binding::Texture(blurred.id())],
                &[],
            );
            Ok(())
        })
        .reads(SSAO, Sampled)
        .writes(SSAO_BLUR, Storage)
        .with_category("Ambient Occlusion"),
    )?;
    Ok(())
}

fn add_reflection_pass(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("screen space reflections", |ctx| {
            let hiz = ctx.texture(MAX_HIZ)?;
            let normal = ctx.texture(NORMAL)?;
            let depth = ctx.texture(DEPTH)?;
            let history = ctx.texture(PREVIOUS_COLOR)?;
            let ssr = ctx.texture(SSR)?;
            ctx.encoder().dispatch(
                "screen_space_reflections",
                workgroups(ssr, 0),
                vec![
                    Binding::Texture(hiz.id()),
                    Binding::Texture(normal.id()),
                    Binding::Texture(depth.id()),
                    Binding::Texture(history.id()),
                    Binding::Texture(ssr.id()),
                ],
                &[],
            );
            Ok(())
        })
        .with_use(ResourceUse::read(MAX_HIZ, Sampled).with_mips(MipRange::all()))
        .reads(NORMAL, Sampled)
        .reads(DEPTH, Sampled)
        .reads(METALLIC_ROUGHNESS, Sampled)
        .reads_history(PREVIOUS_COLOR, Sampled)
        .writes(SSR, Storage)
        .with_category("Screen Space Reflections"),
    )?;
    Ok(())
}

fn add_cloud_pass(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("cloud rendering", |ctx| {
            let depth = ctx.texture(DEPTH)?;
            let clouds = ctx.texture(CLOUDS)?;
            ctx.encoder().dispatch(
                "clouds",
                workgroups(clouds, 0),
                vec![Binding::Texture(depth.id()), Binding::Texture(clouds.id())],
                &[],
            );
            Ok(())
        })
        .reads(DEPTH, Sampled)
        .writes(CLOUDS, Storage)
        .with_category("Sky Rendering"),
    )?;
    Ok(())
}

fn add_composition_pass(graph: &mut PassGraph, features: FeatureToggles) -> Result<(), GraphicsError> {
    let mut inputs = vec![
        ALBEDO,
        EMISSIVE,
        NORMAL,
        METALLIC_ROUGHNESS,
        DEPTH,
        SSAO_BLUR,
        CLOUDS,
        SUN_SHADOW,
    ];
    if features.screen_space_reflections {
        inputs.push(SSR);
    }

    let names = inputs.clone();
    let mut pass = Pass::compute("composition", move |ctx| {
        let color = ctx.texture(COLOR)?;
        let bloom = ctx.texture(BLOOM)?;
        // Binding 0 is the output.
        let mut bindings = vec![Binding::Texture(color.id())];
        for name in &names {
            bindings.push(Binding::Texture(ctx.texture(name)?.id()));
        }
        bindings.push(Binding::Texture(bloom.id()));
        let params = ctx.frame().globals.settings.composition;
        let push = [params.ambient, params.ao_strength, params.emissive_bloom_strength, 0.0];
        ctx.encoder().dispatch(
            COMPOSITION_PIPELINE,
            workgroups(color, 0),
            bindings,
            bytemuck::bytes_of(&push),
        );
        Ok(())
    })
    .with_use(ResourceUse::read(BLOOM, Sampled).mip(0))
    .writes(COLOR, Storage)
    .with_category("Composition");
    for name in inputs {
        pass = pass.reads(name, Sampled);
    }
    graph.add_pass(pass)?;
    Ok(())
}

fn add_depth_of_field_passes(
    graph: &mut PassGraph,
    registry: &ResourceRegistry,
) -> Result<(), GraphicsError> {
    let levels = registry.mip_levels(DEPTH_OF_FIELD)?;

    graph.add_pass(
        Pass::transfer("blit image to image", |ctx| {
            let color = ctx.texture(COLOR)?;
            let target = ctx.texture(DEPTH_OF_FIELD)?;
            ctx.encoder().copy_texture(color, target);
            Ok(())
        })
        .reads(COLOR, TransferSrc)
        .with_use(ResourceUse::write(DEPTH_OF_FIELD, TransferDst).mip(0))
        .with_category("Depth Of Field"),
    )?;

    for level in 1..levels {
        graph.add_pass(
            Pass::compute(format!("mip mapping - {level}"), move |ctx| {
                let image = ctx.texture(DEPTH_OF_FIELD)?;
                ctx.encoder().dispatch(
                    "downsample",
                    workgroups(image, level),
                    vec![Binding::Texture(image.id())],
                    bytemuck::bytes_of(&level),
                );
                Ok(())
            })
            .with_use(ResourceUse::read(DEPTH_OF_FIELD, Sampled).mip(level - 1))
            .with_use(ResourceUse::write(DEPTH_OF_FIELD, Storage).mip(level))
            .with_category("Depth Of Field"),
        )?;
    }

    graph.add_pass(
        Pass::compute("depth of field", |ctx| {
            let chain = ctx.texture(DEPTH_OF_FIELD)?;
            let depth = ctx.texture(DEPTH)?;
            let color = ctx.texture(COLOR)?;
            let dof = ctx.frame().globals.settings.depth_of_field;
            let push = [dof.focal_length, dof.plane_in_focus, dof.aperture, 0.0];
            ctx.encoder().dispatch(
                "depth_of_field",
                workgroups(color, 0),
                vec![
                    Binding::Texture(color.id()),
                    Binding::Texture(chain.id()),
                    Binding::Texture(depth.id()),
                ],
                bytemuck::bytes_of(&push),
            );
            Ok(())
        })
        .with_use(ResourceUse::read(DEPTH_OF_FIELD, Sampled).with_mips(MipRange::all()))
        .reads(DEPTH, Sampled)
        .read_writes(COLOR, Storage)
        .with_category("Depth Of Field"),
    )?;
    Ok(())
}

fn add_exposure_passes(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("generate luminance histogram", |ctx| {
            let color = ctx.texture(COLOR)?;
            let exposure = ctx.buffer(AUTO_EXPOSURE)?;
            let params = HistogramParams::from_settings(&ctx.frame().globals.settings.exposure);
            ctx.encoder().dispatch(
                HISTOGRAM_PIPELINE,
                workgroups(color, 0),
                vec![Binding::Texture(color.id()), Binding::Buffer(exposure.id())],
                bytemuck::bytes_of(&params),
            );
            Ok(())
        })
        .reads(COLOR, Sampled)
        .read_writes(AUTO_EXPOSURE, Storage)
        .with_category("Auto Exposure"),
    )?;

    graph.add_pass(
        Pass::compute("resolve luminance histogram", |ctx| {
            let exposure = ctx.buffer(AUTO_EXPOSURE)?;
            let globals = &ctx.frame().globals;
            let params = ResolveParams::from_settings(&globals.settings.exposure, globals.delta_time);
            ctx.encoder().dispatch(
                RESOLVE_PIPELINE,
                [1, 1, 1],
                vec![Binding::Buffer(exposure.id())],
                bytemuck::bytes_of(&params),
            );
            Ok(())
        })
        .read_writes(AUTO_EXPOSURE, Storage)
        .with_category("Auto Exposure"),
    )?;
    Ok(())
}

fn add_temporal_passes(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("temporal anti-aliasing", |ctx| {
            let color = ctx.texture(COLOR)?;
            let history = ctx.texture(PREVIOUS_COLOR)?;
            let resolved = ctx.texture(RESOLVED)?;
            let velocity = ctx.texture(VELOCITY)?;
            let previous_velocity = ctx.texture(PREVIOUS_VELOCITY)?;
            let depth = ctx.texture(DEPTH)?;
            ctx.encoder().dispatch(
                TAA_PIPELINE,
                workgroups(resolved, 0),
                vec![
                    Binding::Texture(color.id()),
                    Binding::Texture(history.id()),
                    Binding::Texture(resolved.id()),
                    Binding::Texture(velocity.id()),
                    Binding::Texture(previous_velocity.id()),
                    Binding::Texture(depth.id()),
                ],
                &[],
            );
            Ok(())
        })
        .reads(COLOR, Sampled)
        .reads(VELOCITY, Sampled)
        .reads(DEPTH, Sampled)
        .reads_history(PREVIOUS_COLOR, Sampled)
        .reads_history(PREVIOUS_VELOCITY, Sampled)
        .writes(RESOLVED, Storage)
        .with_category("Temporal Anti-Aliasing"),
    )?;

    for (source, history) in [(RESOLVED, PREVIOUS_COLOR), (VELOCITY, PREVIOUS_VELOCITY)] {
        let label = if history == PREVIOUS_COLOR { "color" } else { "velocity" };
        graph.add_pass(
            Pass::transfer(format!("copy image - {label}"), move |ctx| {
                let src = ctx.texture(source)?;
                let dst = ctx.texture(history)?;
                ctx.encoder().copy_texture(src, dst);
                Ok(())
            })
            .reads(source, TransferSrc)
            .writes(history, TransferDst)
            .with_category("Temporal Anti-Aliasing"),
        )?;
    }
    Ok(())
}

fn add_output_passes(graph: &mut PassGraph) -> Result<(), GraphicsError> {
    graph.add_pass(
        Pass::compute("tone mapping", |ctx| {
            let resolved = ctx.texture(RESOLVED)?;
            let swapchain = ctx.texture(SWAPCHAIN)?;
            let globals = &ctx.frame().globals;
            let params = ToneMapParams::new(globals.exposure, &globals.settings.tone_mapping);
            ctx.encoder().dispatch(
                TONE_MAPPING_PIPELINE,
                workgroups(swapchain, 0),
                vec![Binding::Texture(resolved.id()), Binding::Texture(swapchain.id())],
                bytemuck::bytes_of(&params),
            );
            Ok(())
        })
        .reads(RESOLVED, Sampled)
        .writes(SWAPCHAIN, Storage)
        .with_category("Tone Mapping"),
    )?;

    graph.add_pass(
        Pass::graphics("ui overlay", |ctx| {
            ctx.encoder().draw("ui", FULLSCREEN_VERTICES, 1);
            Ok(())
        })
        .read_writes(SWAPCHAIN, ColorAttachment)
        .with_category("UI"),
    )?;
    Ok(())
}
