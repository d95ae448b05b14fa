//! Presentation surfaces.
//!
//! # Overview
//!
//! - [`Surface`] - Anything that hands out presentable images
//! - [`SurfaceConfiguration`] - Format, size, present mode and frames in flight
//! - [`SurfaceImage`] - An acquired image that must be presented
//! - [`PresentMode`] - Controls vsync behavior
//! - [`HeadlessSurface`] - An offscreen surface backed by device textures
//!
//! # Example
//!
//! ```ignore
//! let mut surface = HeadlessSurface::new(Extent3d::new_2d(1280, 720), 2);
//!
//! // In render loop:
//! if let Some(image) = surface.acquire(&device)? {
//!     // ... render to image.texture() ...
//!     surface.present(image)?;
//! }
//! ```

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{Extent3d, TextureDescriptor, TextureFormat, TextureUsage};

/// Presentation mode for the swapchain.
///
/// Controls how frames are synchronized with the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    Mailbox,
    /// VSync enabled. No tearing, but may have higher latency.
    #[default]
    Fifo,
}

/// Configuration for a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfiguration {
    /// The texture format for the swapchain.
    pub format: TextureFormat,
    /// Width of the surface in pixels.
    pub width: u32,
    /// Height of the surface in pixels.
    pub height: u32,
    /// Presentation mode (vsync behavior).
    pub present_mode: PresentMode,
    /// Maximum number of frames the device may process concurrently.
    pub frames_in_flight: u32,
}

impl SurfaceConfiguration {
    /// Create a configuration with the default format and present mode.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            format: TextureFormat::Bgra8UnormSrgb,
            width,
            height,
            present_mode: PresentMode::default(),
            frames_in_flight: 2,
        }
    }

    /// Set the texture format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the present mode.
    pub fn with_present_mode(mut self, present_mode: PresentMode) -> Self {
        self.present_mode = present_mode;
        self
    }

    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }

    /// Surface size as an extent.
    pub fn extent(&self) -> Extent3d {
        Extent3d::new_2d(self.width, self.height)
    }
}

/// An acquired swapchain image.
///
/// It must be handed back through [`Surface::present`].
#[derive(Debug, Clone)]
pub struct SurfaceImage {
    index: u32,
    texture: Arc<Texture>,
}

impl SurfaceImage {
    /// Wrap a texture owned by a surface.
    pub fn new(index: u32, texture: Arc<Texture>) -> Self {
        Self { index, texture }
    }

    /// Index of the image within the swapchain.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The texture to render into.
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }
}

/// A presentation target.
pub trait Surface: Send {
    /// Current drawable size.
    fn extent(&self) -> Extent3d;

    /// Format of the presentable images.
    fn format(&self) -> TextureFormat;

    /// Maximum frames the device may process concurrently.
    fn max_frames_in_flight(&self) -> u32;

    /// Obtain the next presentable image.
    ///
    /// `Ok(None)` means no image is available right now (out of date,
    /// resize pending); the frame should be skipped.
    fn acquire(&mut self, device: &GraphicsDevice) -> Result<Option<SurfaceImage>, GraphicsError>;

    /// Queue an acquired image for presentation.
    fn present(&mut self, image: SurfaceImage) -> Result<(), GraphicsError>;

    /// Recreate the swapchain at a new size.
    fn resize(&mut self, device: &GraphicsDevice, extent: Extent3d) -> Result<(), GraphicsError>;
}

/// An offscreen surface whose images are ordinary device textures.
///
/// Acquisition and presentation can be scripted to fail, which is how the
/// frame loop's skip and error paths are exercised without a window system.
#[derive(Debug)]
pub struct HeadlessSurface {
    config: SurfaceConfiguration,
    images: Vec<Arc<Texture>>,
    next_image: u32,
    acquired: Option<u32>,
    failing_acquires: u32,
    failing_presents: u32,
    presented: u64,
    last_presented: Option<Arc<Texture>>,
}

impl HeadlessSurface {
    /// Create a surface of `extent` with `frames_in_flight` images.
    pub fn new(extent: Extent3d, frames_in_flight: u32) -> Self {
        Self::with_configuration(
            SurfaceConfiguration::new(extent.width, extent.height)
                .with_frames_in_flight(frames_in_flight),
        )
    }

    /// Create a surface from a full configuration.
    pub fn with_configuration(config: SurfaceConfiguration) -> Self {
        Self {
            config,
            images: Vec::new(),
            next_image: 0,
            acquired: None,
            failing_acquires: 0,
            failing_presents: 0,
            presented: 0,
            last_presented: None,
        }
    }

    /// The active configuration.
    pub fn configuration(&self) -> &SurfaceConfiguration {
        &self.config
    }

    /// Make the next `count` acquires report no image.
    pub fn fail_next_acquires(&mut self, count: u32) {
        self.failing_acquires = count;
    }

    /// Make the next `count` presents report a lost surface.
    ///
    /// The acquired image is still released.
    pub fn fail_next_presents(&mut self, count: u32) {
        self.failing_presents = count;
    }

    /// Number of images presented so far.
    pub fn presented_count(&self) -> u64 {
        self.presented
    }

    /// The most recently presented image.
    pub fn last_presented(&self) -> Option<&Arc<Texture>> {
        self.last_presented.as_ref()
    }

    fn create_images(&mut self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        let count = self.config.frames_in_flight.max(1);
        let mut images = Vec::with_capacity(count as usize);
        for index in 0..count {
            let descriptor = TextureDescriptor::new_2d(
                self.config.width,
                self.config.height,
                self.config.format,
                TextureUsage::RENDER_ATTACHMENT
                    | TextureUsage::STORAGE_BINDING
                    | TextureUsage::COPY_DST
                    | TextureUsage::COPY_SRC,
            )
            .with_label(format!("swapchain_image_{index}"));
            images.push(device.create_texture(&descriptor)?);
        }
        self.images = images;
        self.next_image = 0;
        log::debug!(
            "HeadlessSurface: created {} images at {}x{}",
            count,
            self.config.width,
            self.config.height
        );
        Ok(())
    }
}

impl Surface for HeadlessSurface {
    fn extent(&self) -> Extent3d {
        self.config.extent()
    }

    fn format(&self) -> TextureFormat {
        self.config.format
    }

    fn max_frames_in_flight(&self) -> u32 {
        self.config.frames_in_flight
    }

    fn acquire(&mut self, device: &GraphicsDevice) -> Result<Option<SurfaceImage>, GraphicsError> {
        if self.failing_acquires > 0 {
            self.failing_acquires -= 1;
            return Ok(None);
        }
        if self.acquired.is_some() {
            return Err(GraphicsError::InvalidParameter(
                "previous surface image was never presented".to_string(),
            ));
        }
        if self.images.is_empty() {
            self.create_images(device)?;
        }

        let index = self.next_image;
        let Some(texture) = self.images.get(index as usize).cloned() else {
            return Err(GraphicsError::SurfaceLost);
        };
        self.next_image = (index + 1) % self.images.len() as u32;
        self.acquired = Some(index);
        Ok(Some(SurfaceImage::new(index, texture)))
    }

    fn present(&mut self, image: SurfaceImage) -> Result<(), GraphicsError> {
        if self.acquired != Some(image.index()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "surface image {} was not acquired",
                image.index()
            )));
        }
        self.acquired = None;
        if self.failing_presents > 0 {
            self.failing_presents -= 1;
            return Err(GraphicsError::SurfaceLost);
        }
        self.presented += 1;
        self.last_presented = Some(image.texture);
        Ok(())
    }

    fn resize(&mut self, device: &GraphicsDevice, extent: Extent3d) -> Result<(), GraphicsError> {
        if extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot resize surface to {}x{}",
                extent.width, extent.height
            )));
        }
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.acquired = None;
        self.last_presented = None;
        for image in self.images.drain(..) {
            device.retire_texture(image);
        }
        log::info!("HeadlessSurface: resized to {}x{}", extent.width, extent.height);
        Ok(())
    }
}

static_assertions::assert_impl_all!(SurfaceImage: Send, Sync);
static_assertions::assert_impl_all!(HeadlessSurface: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_configuration_builder() {
        let config = SurfaceConfiguration::new(800, 600)
            .with_present_mode(PresentMode::Mailbox)
            .with_frames_in_flight(0);
        assert_eq!(config.present_mode, PresentMode::Mailbox);
        assert_eq!(config.frames_in_flight, 1);
        assert_eq!(config.extent(), Extent3d::new_2d(800, 600));
    }

    #[test]
    fn test_acquire_rotates_images() {
        let device = device();
        let mut surface = HeadlessSurface::new(Extent3d::new_2d(32, 32), 2);

        let mut indices = Vec::new();
        for _ in 0..3 {
            let image = surface.acquire(&device).unwrap().unwrap();
            indices.push(image.index());
            surface.present(image).unwrap();
        }
        assert_eq!(indices, vec![0, 1, 0]);
        assert_eq!(surface.presented_count(), 3);
    }

    #[test]
    fn test_scripted_acquire_failure() {
        let device = device();
        let mut surface = HeadlessSurface::new(Extent3d::new_2d(32, 32), 2);
        surface.fail_next_acquires(2);

        assert!(surface.acquire(&device).unwrap().is_none());
        assert!(surface.acquire(&device).unwrap().is_none());
        assert!(surface.acquire(&device).unwrap().is_some());
    }

    #[test]
    fn test_double_acquire_is_rejected() {
        let device = device();
        let mut surface = HeadlessSurface::new(Extent3d::new_2d(32, 32), 2);
        let _image = surface.acquire(&device).unwrap().unwrap();
        assert!(surface.acquire(&device).is_err());
    }

    #[test]
    fn test_resize_recreates_images() {
        let device = device();
        let mut surface = HeadlessSurface::new(Extent3d::new_2d(32, 32), 2);
        let image = surface.acquire(&device).unwrap().unwrap();
        surface.present(image).unwrap();

        surface.resize(&device, Extent3d::new_2d(64, 48)).unwrap();
        let image = surface.acquire(&device).unwrap().unwrap();
        assert_eq!(image.texture().width(), 64);
        assert_eq!(image.texture().height(), 48);
        assert!(surface.resize(&device, Extent3d::new_2d(0, 48)).is_err());
    }
}
