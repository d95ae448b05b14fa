//! Window collaborator seam.
//!
//! The frame loop never talks to a windowing system directly. Once per loop
//! iteration it polls a [`WindowState`] for the drawable size and the
//! pending resize and close flags.

use crate::types::Extent3d;

/// What the frame loop needs to know about its window.
pub trait WindowState {
    /// Current drawable size in pixels.
    fn drawable_size(&self) -> Extent3d;

    /// Returns `true` if the drawable size changed since the last
    /// acknowledged resize.
    fn resize_pending(&self) -> bool;

    /// Returns `true` once the user asked to close the window.
    fn close_requested(&self) -> bool;

    /// Clear the resize flag after the surface and resources were recreated.
    fn acknowledge_resize(&mut self);
}

/// A window whose state is set by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualWindow {
    size: Extent3d,
    resize_pending: bool,
    close_requested: bool,
}

impl ManualWindow {
    /// Create a window of the given drawable size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Extent3d::new_2d(width, height),
            resize_pending: false,
            close_requested: false,
        }
    }

    /// Change the drawable size and raise the resize flag.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Extent3d::new_2d(width, height);
        self.resize_pending = true;
    }

    /// Raise the close flag.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }
}

impl WindowState for ManualWindow {
    fn drawable_size(&self) -> Extent3d {
        self.size
    }

    fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    fn close_requested(&self) -> bool {
        self.close_requested
    }

    fn acknowledge_resize(&mut self) {
        self.resize_pending = false;
    }
}
