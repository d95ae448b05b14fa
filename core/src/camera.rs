//! Perspective camera model.
//!
//! The camera only describes *where* the viewer is and how the frustum is
//! shaped. Input handling and camera controllers live outside the engine.

use crate::math::{Mat4, Vec3, look_at_rh, perspective_rh};

/// A right-handed perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a camera looking from `position` at `target`.
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    /// Set the vertical field of view (radians).
    pub fn with_fov_y(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y;
        self
    }

    /// Set the near/far clip distances.
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Update the aspect ratio from drawable dimensions.
    ///
    /// Zero-sized dimensions (minimized window) keep the previous aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World-to-view matrix.
    pub fn view(&self) -> Mat4 {
        look_at_rh(&self.position, &self.target, &self.up)
    }

    /// View-to-clip matrix (depth range [0, 1]).
    pub fn projection(&self) -> Mat4 {
        perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = Camera::default();
        camera.resize(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.resize(0, 400);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_view_moves_eye_to_origin() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros());
        let eye = camera.view() * crate::math::Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert!(eye.xyz().norm() < 1e-5);
    }

    #[test]
    fn test_builder() {
        let camera = Camera::default().with_clip(1.0, 50.0).with_fov_y(1.0);
        assert_eq!(camera.near, 1.0);
        assert_eq!(camera.far, 50.0);
        assert_eq!(camera.fov_y, 1.0);
    }
}
