//! Auto-exposure feedback loop.
//!
//! Two compute passes share one persistent buffer ([`AutoExposureData`]):
//!
//! 1. **Histogram** bins the log2 luminance of the HDR color image. Bin 0
//!    collects near-black texels; bins 1..=255 cover
//!    `[min_log_luminance, max_log_luminance]`.
//! 2. **Resolve** turns the histogram into a weighted log-average, adapts the
//!    previous average toward it, stores `exposure = target / adapted` and
//!    clears the histogram for the next frame.
//!
//! The resolved exposure is read back after the frame completes and applied
//! by tone mapping on the following frame.
//!
//! The host kernels here are the reference implementation used by the
//! software backend.

use std::sync::Arc;

use crate::backend::{BackendError, KernelContext};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::uniforms::ExposureSettings;

/// Number of histogram bins.
pub const HISTOGRAM_BINS: usize = 256;

/// Pipeline name of the histogram pass.
pub const HISTOGRAM_PIPELINE: &str = "luminance_histogram";

/// Pipeline name of the resolve pass.
pub const RESOLVE_PIPELINE: &str = "luminance_resolve";

/// Luminance below this value lands in bin 0.
const BLACK_THRESHOLD: f32 = 0.005;

/// Rec. 709 luma weights.
const LUMINANCE_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// Contents of the auto-exposure buffer.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct AutoExposureData {
    pub histogram: [u32; HISTOGRAM_BINS],
    /// Adapted average luminance, zero before the first resolve.
    pub average_luminance: f32,
    /// Exposure resolved from the last histogram.
    pub exposure: f32,
    pub _pad: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<AutoExposureData>(), 1040);

impl Default for AutoExposureData {
    fn default() -> Self {
        Self {
            histogram: [0; HISTOGRAM_BINS],
            average_luminance: 0.0,
            exposure: 1.0,
            _pad: [0.0; 2],
        }
    }
}

impl AutoExposureData {
    /// Size of the buffer in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Decode from raw buffer bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes.get(..Self::SIZE as usize)?).ok()
    }
}

/// Push constants of the histogram pass.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct HistogramParams {
    pub min_log_luminance: f32,
    pub log_luminance_range: f32,
}

impl HistogramParams {
    pub fn from_settings(settings: &ExposureSettings) -> Self {
        Self {
            min_log_luminance: settings.min_log_luminance,
            log_luminance_range: settings.log_luminance_range(),
        }
    }
}

/// Push constants of the resolve pass.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ResolveParams {
    pub min_log_luminance: f32,
    pub log_luminance_range: f32,
    pub delta_time: f32,
    pub adjustment_speed: f32,
    pub target_luminance: f32,
    pub _pad: [f32; 3],
}

impl ResolveParams {
    pub fn from_settings(settings: &ExposureSettings, delta_time: f32) -> Self {
        Self {
            min_log_luminance: settings.min_log_luminance,
            log_luminance_range: settings.log_luminance_range(),
            delta_time,
            adjustment_speed: settings.adjustment_speed,
            target_luminance: settings.target_luminance,
            _pad: [0.0; 3],
        }
    }
}

/// Relative luminance of a linear RGB color.
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMINANCE_WEIGHTS[0] + rgb[1] * LUMINANCE_WEIGHTS[1] + rgb[2] * LUMINANCE_WEIGHTS[2]
}

/// Histogram bin of a luminance value.
pub fn histogram_bin(luminance: f32, params: &HistogramParams) -> usize {
    if luminance < BLACK_THRESHOLD || params.log_luminance_range <= 0.0 {
        return 0;
    }
    let normalized =
        ((luminance.log2() - params.min_log_luminance) / params.log_luminance_range).clamp(0.0, 1.0);
    (normalized * 254.0 + 1.0) as usize
}

/// Add `texel_count` texels of one color to the histogram.
pub fn accumulate(data: &mut AutoExposureData, rgb: [f32; 3], texel_count: u64, params: &HistogramParams) {
    let bin = histogram_bin(luminance(rgb), params);
    let count = u32::try_from(texel_count).unwrap_or(u32::MAX);
    data.histogram[bin] = data.histogram[bin].saturating_add(count);
}

/// Resolve the histogram into an adapted luminance and exposure, then
/// clear it.
pub fn resolve(data: &mut AutoExposureData, params: &ResolveParams) {
    let total: u64 = data.histogram.iter().map(|&count| u64::from(count)).sum();
    let black = u64::from(data.histogram[0]);
    let weighted: u64 = data
        .histogram
        .iter()
        .enumerate()
        .skip(1)
        .map(|(bin, &count)| bin as u64 * u64::from(count))
        .sum();

    let lit = (total - black).max(1);
    let log_average = weighted as f32 / lit as f32 - 1.0;
    let average = (log_average / 254.0 * params.log_luminance_range + params.min_log_luminance).exp2();

    let adapted = if data.average_luminance <= 0.0 {
        average
    } else {
        let blend = 1.0 - (-params.delta_time * params.adjustment_speed).exp();
        data.average_luminance + (average - data.average_luminance) * blend
    };

    data.average_luminance = adapted;
    data.exposure = if adapted > 0.0 {
        params.target_luminance / adapted
    } else {
        1.0
    };
    data.histogram = [0; HISTOGRAM_BINS];
}

fn read_data(ctx: &KernelContext<'_>, index: usize) -> Result<AutoExposureData, BackendError> {
    AutoExposureData::from_bytes(ctx.buffer(index)?).ok_or_else(|| BackendError::KernelFailed {
        pipeline: ctx.pipeline().to_string(),
        reason: format!("exposure buffer smaller than {} bytes", AutoExposureData::SIZE),
    })
}

fn write_data(
    ctx: &mut KernelContext<'_>,
    index: usize,
    data: &AutoExposureData,
) -> Result<(), BackendError> {
    let bytes = ctx.buffer_mut(index)?;
    bytes[..AutoExposureData::SIZE as usize].copy_from_slice(bytemuck::bytes_of(data));
    Ok(())
}

/// Histogram kernel. Bindings: 0 = HDR color, 1 = exposure buffer.
///
/// Undefined color contents are counted as black.
pub fn histogram_kernel(ctx: &mut KernelContext<'_>) -> Result<(), BackendError> {
    let params: HistogramParams = ctx.push_constants()?;
    let color = ctx.texture_value(0)?.unwrap_or([0.0; 4]);
    let texels = ctx.texture_extent(0)?.texel_count();

    let mut data = read_data(ctx, 1)?;
    accumulate(&mut data, [color[0], color[1], color[2]], texels, &params);
    write_data(ctx, 1, &data)
}

/// Resolve kernel. Bindings: 0 = exposure buffer.
pub fn resolve_kernel(ctx: &mut KernelContext<'_>) -> Result<(), BackendError> {
    let params: ResolveParams = ctx.push_constants()?;
    let mut data = read_data(ctx, 0)?;
    resolve(&mut data, &params);
    write_data(ctx, 0, &data)
}

/// Register both host kernels. Returns `false` if the backend runs real
/// pipelines instead.
pub fn register_exposure_kernels(device: &GraphicsDevice) -> bool {
    let histogram = device.register_kernel(HISTOGRAM_PIPELINE, Arc::new(histogram_kernel));
    let resolve = device.register_kernel(RESOLVE_PIPELINE, Arc::new(resolve_kernel));
    histogram && resolve
}

/// Read the exposure buffer back.
pub fn read_exposure(device: &GraphicsDevice, buffer: &Buffer) -> Result<AutoExposureData, GraphicsError> {
    let bytes = device.read_buffer(buffer, 0, AutoExposureData::SIZE)?;
    AutoExposureData::from_bytes(&bytes).ok_or_else(|| {
        GraphicsError::InvalidParameter(format!(
            "exposure buffer '{}' is too small",
            buffer.label().unwrap_or("unnamed")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram_params() -> HistogramParams {
        HistogramParams::from_settings(&ExposureSettings::default())
    }

    fn resolve_params(delta_time: f32) -> ResolveParams {
        ResolveParams::from_settings(&ExposureSettings::default(), delta_time)
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(luminance([0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_histogram_bins() {
        let params = histogram_params();
        assert_eq!(histogram_bin(0.0, &params), 0);
        assert_eq!(histogram_bin(0.001, &params), 0);
        // log2(1) = 0 sits in the middle of [-15, 15].
        assert_eq!(histogram_bin(1.0, &params), 128);
        assert_eq!(histogram_bin(1.0e12, &params), 255);
    }

    #[test]
    fn test_first_resolve_takes_average_directly() {
        let mut data = AutoExposureData::default();
        accumulate(&mut data, [1.0, 1.0, 1.0], 100, &histogram_params());
        resolve(&mut data, &resolve_params(0.016));

        // Bin 128 maps back to log2 = 127/254 * 30 - 15.
        let expected = (127.0f32 / 254.0 * 30.0 - 15.0).exp2();
        assert!((data.average_luminance - expected).abs() < 1e-4);
        assert!((data.exposure - 0.214 / expected).abs() < 1e-4);
        assert!(data.histogram.iter().all(|&count| count == 0));
    }

    #[test]
    fn test_adaptation_moves_toward_target() {
        let mut data = AutoExposureData {
            average_luminance: 4.0,
            ..Default::default()
        };
        accumulate(&mut data, [1.0, 1.0, 1.0], 100, &histogram_params());
        resolve(&mut data, &resolve_params(0.5));

        assert!(data.average_luminance < 4.0);
        assert!(data.average_luminance > 1.0);
    }

    #[test]
    fn test_black_only_histogram() {
        let mut data = AutoExposureData::default();
        accumulate(&mut data, [0.0, 0.0, 0.0], 10, &histogram_params());
        resolve(&mut data, &resolve_params(0.016));
        // Everything black: log average collapses to the bottom of the range.
        assert!(data.average_luminance > 0.0);
        assert!(data.exposure.is_finite());
    }

    #[test]
    fn test_from_bytes_rejects_short_input() {
        assert!(AutoExposureData::from_bytes(&[0; 16]).is_none());
        let data = AutoExposureData::default();
        assert_eq!(
            AutoExposureData::from_bytes(bytemuck::bytes_of(&data)),
            Some(data)
        );
    }
}
