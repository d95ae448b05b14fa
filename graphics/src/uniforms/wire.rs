//! GPU wire layout of the global uniform block.
//!
//! Every field is a plain array so the layout is identical on the host and
//! in shader code (16-byte lanes, no implicit padding). The structs are only
//! ever filled through the named conversion functions below; semantic types
//! are never reinterpreted as wire types.

use bytemuck::Zeroable;
use stratus_core::math::{mat4_to_cols_array_2d, vec2_to_array, vec3_to_padded_array, vec4_to_array};
use stratus_core::scene::{WorldPointLight, WorldSpotLight};

use super::settings::PostProcessSettings;
use super::{CameraMatrices, GlobalUniformBlock, MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS};

/// Camera matrices as laid out on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuCameraMatrices {
    pub projection: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub projection_view: [[f32; 4]; 4],
    pub inverse_projection_view: [[f32; 4]; 4],
    pub terrain_clip_trick: [f32; 4],
    pub jitter: [f32; 2],
    pub _pad: [f32; 2],
}

/// Point light: position and range, color and intensity.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuPointLight {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

/// Spot light.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuSpotLight {
    pub position_range: [f32; 4],
    pub direction_outer: [f32; 4],
    pub color_intensity: [f32; 4],
    /// Inner cone angle in `x`, rest unused.
    pub inner: [f32; 4],
}

/// Post-processing knobs packed into 16-byte lanes.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuPostProcess {
    /// scale.x, scale.y, height scale, midpoint
    pub terrain: [f32; 4],
    /// delta, min depth, max depth, min tessellation level
    pub terrain_tessellation: [f32; 4],
    /// max tessellation level
    pub terrain_tessellation_max: [f32; 4],
    /// position, ortho extent
    pub sun_position_extent: [f32; 4],
    /// exponential factor, darkening factor, bias, intensity
    pub sun_shadow: [f32; 4],
    /// bias, radius, kernel size
    pub ambient_occlusion: [f32; 4],
    /// ambient, ao strength, emissive bloom strength
    pub composition: [f32; 4],
    /// focal length, plane in focus, aperture
    pub depth_of_field: [f32; 4],
    /// adjustment speed, min log luminance, max log luminance, target
    pub exposure: [f32; 4],
    /// saturation, linear section, peak, compression
    pub tone_mapping: [f32; 4],
}

/// The complete global uniform block.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuGlobals {
    pub current: GpuCameraMatrices,
    pub previous: GpuCameraMatrices,
    /// Camera position, `w` unused.
    pub camera_position: [f32; 4],
    /// near, far, width, height
    pub clip_resolution: [f32; 4],
    /// delta time, elapsed time, exposure
    pub time_exposure: [f32; 4],
    pub frame_counter: u32,
    pub point_light_count: u32,
    pub spot_light_count: u32,
    pub _pad: u32,
    pub point_lights: [GpuPointLight; MAX_POINT_LIGHTS],
    pub spot_lights: [GpuSpotLight; MAX_SPOT_LIGHTS],
    pub settings: GpuPostProcess,
}

static_assertions::const_assert_eq!(std::mem::size_of::<GpuCameraMatrices>(), 416);
static_assertions::const_assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
static_assertions::const_assert_eq!(std::mem::size_of::<GpuSpotLight>(), 64);
static_assertions::const_assert_eq!(std::mem::size_of::<GpuPostProcess>(), 160);
static_assertions::const_assert_eq!(std::mem::size_of::<GpuGlobals>() % 16, 0);
static_assertions::const_assert_eq!(std::mem::align_of::<GpuGlobals>(), 4);

/// Convert camera matrices to the wire layout.
pub fn camera_to_wire(camera: &CameraMatrices) -> GpuCameraMatrices {
    GpuCameraMatrices {
        projection: mat4_to_cols_array_2d(&camera.projection),
        inverse_projection: mat4_to_cols_array_2d(&camera.inverse_projection),
        view: mat4_to_cols_array_2d(&camera.view),
        inverse_view: mat4_to_cols_array_2d(&camera.inverse_view),
        projection_view: mat4_to_cols_array_2d(&camera.projection_view),
        inverse_projection_view: mat4_to_cols_array_2d(&camera.inverse_projection_view),
        terrain_clip_trick: vec4_to_array(&camera.terrain_clip_trick),
        jitter: vec2_to_array(&camera.jitter),
        _pad: [0.0; 2],
    }
}

/// Convert a world-space point light.
pub fn point_light_to_wire(light: &WorldPointLight) -> GpuPointLight {
    GpuPointLight {
        position_range: vec3_to_padded_array(&light.position, light.light.range),
        color_intensity: vec3_to_padded_array(&light.light.color, light.light.intensity),
    }
}

/// Convert a world-space spot light.
pub fn spot_light_to_wire(light: &WorldSpotLight) -> GpuSpotLight {
    GpuSpotLight {
        position_range: vec3_to_padded_array(&light.position, light.light.range),
        direction_outer: vec3_to_padded_array(&light.direction, light.light.outer_angle),
        color_intensity: vec3_to_padded_array(&light.light.color, light.light.intensity),
        inner: [light.light.inner_angle, 0.0, 0.0, 0.0],
    }
}

/// Convert the post-processing settings.
pub fn settings_to_wire(settings: &PostProcessSettings) -> GpuPostProcess {
    let terrain = &settings.terrain;
    let sun = &settings.sun;
    let ao = &settings.ambient_occlusion;
    let composition = &settings.composition;
    let dof = &settings.depth_of_field;
    let exposure = &settings.exposure;
    let tone = &settings.tone_mapping;
    GpuPostProcess {
        terrain: [
            terrain.scale.x,
            terrain.scale.y,
            terrain.height_scale,
            terrain.midpoint,
        ],
        terrain_tessellation: [
            terrain.delta,
            terrain.min_depth,
            terrain.max_depth,
            terrain.min_tess_level,
        ],
        terrain_tessellation_max: [terrain.max_tess_level, 0.0, 0.0, 0.0],
        sun_position_extent: vec3_to_padded_array(&sun.position, sun.ortho_extent),
        sun_shadow: [
            sun.exponential_factor,
            sun.darkening_factor,
            sun.bias,
            sun.intensity,
        ],
        ambient_occlusion: [ao.bias, ao.radius, ao.kernel_size as f32, 0.0],
        composition: [
            composition.ambient,
            composition.ao_strength,
            composition.emissive_bloom_strength,
            0.0,
        ],
        depth_of_field: [dof.focal_length, dof.plane_in_focus, dof.aperture, 0.0],
        exposure: [
            exposure.adjustment_speed,
            exposure.min_log_luminance,
            exposure.max_log_luminance,
            exposure.target_luminance,
        ],
        tone_mapping: [
            tone.saturation,
            tone.linear_section,
            tone.peak,
            tone.compression,
        ],
    }
}

/// Convert the whole global block. Lights beyond the array capacity are
/// never present here: [`GlobalUniformBlock`] refuses them on push.
pub fn globals_to_wire(block: &GlobalUniformBlock) -> GpuGlobals {
    let mut point_lights = [GpuPointLight::zeroed(); MAX_POINT_LIGHTS];
    for (slot, light) in point_lights.iter_mut().zip(block.point_lights()) {
        *slot = point_light_to_wire(light);
    }
    let mut spot_lights = [GpuSpotLight::zeroed(); MAX_SPOT_LIGHTS];
    for (slot, light) in spot_lights.iter_mut().zip(block.spot_lights()) {
        *slot = spot_light_to_wire(light);
    }

    GpuGlobals {
        current: camera_to_wire(&block.current),
        previous: camera_to_wire(&block.previous),
        camera_position: vec3_to_padded_array(&block.camera_position, 1.0),
        clip_resolution: [
            block.near,
            block.far,
            block.resolution.x,
            block.resolution.y,
        ],
        time_exposure: [block.delta_time, block.elapsed_time, block.exposure, 0.0],
        frame_counter: block.frame_counter,
        point_light_count: block.point_lights().len() as u32,
        spot_light_count: block.spot_lights().len() as u32,
        _pad: 0,
        point_lights,
        spot_lights,
        settings: settings_to_wire(&block.settings),
    }
}
