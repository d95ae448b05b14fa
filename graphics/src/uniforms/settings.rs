//! Live post-processing parameters.
//!
//! These knobs are embedded in the global uniform block every frame. An
//! editor overlay may read and write them freely between frames.

use stratus_core::math::{Vec2, Vec3};

/// Terrain rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSettings {
    /// World-space extent of the terrain grid.
    pub scale: Vec2,
    /// Height map multiplier.
    pub height_scale: f32,
    /// Height map midpoint subtracted before scaling.
    pub midpoint: f32,
    /// Tessellation distance falloff.
    pub delta: f32,
    /// Camera distance range mapped onto the tessellation factor range.
    pub min_depth: f32,
    pub max_depth: f32,
    pub min_tess_level: f32,
    pub max_tess_level: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            scale: Vec2::new(100.0, 100.0),
            height_scale: 70.0,
            midpoint: 0.2,
            delta: 8.0,
            min_depth: 1.0,
            max_depth: 100.0,
            min_tess_level: 1.0,
            max_tess_level: 3.0,
        }
    }
}

/// Directional sun light and its shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunSettings {
    pub position: Vec3,
    /// Half extent of the orthographic shadow projection.
    pub ortho_extent: f32,
    pub exponential_factor: f32,
    pub darkening_factor: f32,
    pub bias: f32,
    pub intensity: f32,
}

impl Default for SunSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(-3.2, 40.0, -4.0),
            ortho_extent: 16.0,
            exponential_factor: -80.0,
            darkening_factor: 1.0,
            bias: 0.0001,
            intensity: 1.0,
        }
    }
}

/// Screen-space ambient occlusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientOcclusionSettings {
    pub bias: f32,
    pub radius: f32,
    pub kernel_size: u32,
}

impl Default for AmbientOcclusionSettings {
    fn default() -> Self {
        Self {
            bias: 0.025,
            radius: 0.3,
            kernel_size: 26,
        }
    }
}

/// Final lighting composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionSettings {
    pub ambient: f32,
    pub ao_strength: f32,
    pub emissive_bloom_strength: f32,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            ambient: 0.1,
            ao_strength: 1.2,
            emissive_bloom_strength: 2.0,
        }
    }
}

/// Depth of field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOfFieldSettings {
    pub focal_length: f32,
    pub plane_in_focus: f32,
    pub aperture: f32,
}

impl Default for DepthOfFieldSettings {
    fn default() -> Self {
        Self {
            focal_length: 5.0,
            plane_in_focus: 1.0,
            aperture: 8.0,
        }
    }
}

/// Auto exposure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSettings {
    pub adjustment_speed: f32,
    /// Lower end of the histogram's log2 luminance range.
    pub min_log_luminance: f32,
    /// Upper end of the histogram's log2 luminance range.
    pub max_log_luminance: f32,
    /// Average luminance the exposure maps to.
    pub target_luminance: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            adjustment_speed: 1.0,
            min_log_luminance: -15.0,
            max_log_luminance: 15.0,
            target_luminance: 0.214,
        }
    }
}

impl ExposureSettings {
    /// Width of the log2 luminance range.
    pub fn log_luminance_range(&self) -> f32 {
        self.max_log_luminance - self.min_log_luminance
    }
}

/// Tone mapping curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMappingSettings {
    pub saturation: f32,
    pub linear_section: f32,
    pub peak: f32,
    pub compression: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            saturation: 1.0,
            linear_section: 0.18,
            peak: 1.0,
            compression: 0.15,
        }
    }
}

/// Every live post-processing knob.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PostProcessSettings {
    pub terrain: TerrainSettings,
    pub sun: SunSettings,
    pub ambient_occlusion: AmbientOcclusionSettings,
    pub composition: CompositionSettings,
    pub depth_of_field: DepthOfFieldSettings,
    pub exposure: ExposureSettings,
    pub tone_mapping: ToneMappingSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PostProcessSettings::default();
        assert_eq!(settings.terrain.height_scale, 70.0);
        assert_eq!(settings.sun.position, Vec3::new(-3.2, 40.0, -4.0));
        assert_eq!(settings.ambient_occlusion.kernel_size, 26);
        assert_eq!(settings.composition.emissive_bloom_strength, 2.0);
        assert_eq!(settings.depth_of_field.aperture, 8.0);
        assert_eq!(settings.exposure.log_luminance_range(), 30.0);
        assert_eq!(settings.tone_mapping.linear_section, 0.18);
    }
}
