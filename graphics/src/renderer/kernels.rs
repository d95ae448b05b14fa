//! Host kernels for the stock compute passes.
//!
//! The software backend has no shader compiler, so passes whose results the
//! frame loop depends on (temporal resolve, tone mapping, auto exposure)
//! get CPU reference implementations operating on whole-image values.

use std::sync::Arc;

use crate::backend::{BackendError, KernelContext};
use crate::device::GraphicsDevice;
use crate::temporal::exposure::register_exposure_kernels;
use crate::uniforms::ToneMappingSettings;

/// Pipeline of the temporal anti-aliasing resolve.
pub const TAA_PIPELINE: &str = "temporal_anti_aliasing";

/// Pipeline of the tone mapping pass.
pub const TONE_MAPPING_PIPELINE: &str = "tone_mapping";

/// Pipeline of the composition pass.
pub const COMPOSITION_PIPELINE: &str = "composition";

/// Weight of the history sample in the temporal resolve.
pub const HISTORY_WEIGHT: f32 = 0.9;

/// Push constants of the tone mapping pass.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ToneMapParams {
    pub exposure: f32,
    pub saturation: f32,
    pub linear_section: f32,
    pub peak: f32,
    pub compression: f32,
    pub _pad: [f32; 3],
}

impl ToneMapParams {
    pub fn new(exposure: f32, settings: &ToneMappingSettings) -> Self {
        Self {
            exposure,
            saturation: settings.saturation,
            linear_section: settings.linear_section,
            peak: settings.peak,
            compression: settings.compression,
            _pad: [0.0; 3],
        }
    }
}

/// Blend the current sample with history.
///
/// Without history the current sample passes through unchanged.
pub fn temporal_blend(current: Option<[f32; 4]>, history: Option<[f32; 4]>) -> Option<[f32; 4]> {
    match (current, history) {
        (Some(current), Some(history)) => Some(std::array::from_fn(|i| {
            history[i] * HISTORY_WEIGHT + current[i] * (1.0 - HISTORY_WEIGHT)
        })),
        (Some(current), None) => Some(current),
        (None, history) => history,
    }
}

/// Temporal resolve. Bindings: 0 = color, 1 = previous color, 2 = resolved.
pub fn taa_kernel(ctx: &mut KernelContext<'_>) -> Result<(), BackendError> {
    let current = ctx.texture_value(0)?;
    let history = ctx.texture_value(1)?;
    ctx.set_texture_value(2, temporal_blend(current, history))
}

/// Tone mapping. Bindings: 0 = resolved, 1 = swapchain.
pub fn tone_mapping_kernel(ctx: &mut KernelContext<'_>) -> Result<(), BackendError> {
    let params: ToneMapParams = ctx.push_constants()?;
    let mapped = ctx.texture_value(0)?.map(|[r, g, b, _]| {
        [
            r * params.exposure,
            g * params.exposure,
            b * params.exposure,
            1.0,
        ]
    });
    ctx.set_texture_value(1, mapped)
}

/// Register every reference kernel. Returns `false` if the backend runs
/// real pipelines instead.
pub fn register_reference_kernels(device: &GraphicsDevice) -> bool {
    let exposure = register_exposure_kernels(device);
    let taa = device.register_kernel(TAA_PIPELINE, Arc::new(taa_kernel));
    let tone = device.register_kernel(TONE_MAPPING_PIPELINE, Arc::new(tone_mapping_kernel));
    exposure && taa && tone
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_blend() {
        let blended = temporal_blend(Some([1.0; 4]), Some([0.0; 4])).unwrap();
        assert!((blended[0] - 0.1).abs() < 1e-6);
        assert_eq!(temporal_blend(Some([0.5; 4]), None), Some([0.5; 4]));
        assert_eq!(temporal_blend(None, Some([0.25; 4])), Some([0.25; 4]));
        assert_eq!(temporal_blend(None, None), None);
    }

    #[test]
    fn test_tone_map_params_layout() {
        let params = ToneMapParams::new(2.0, &ToneMappingSettings::default());
        assert_eq!(bytemuck::bytes_of(&params).len(), 32);
        assert_eq!(params.exposure, 2.0);
    }
}
