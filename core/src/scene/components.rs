//! Component types stored in the scene arena.

use crate::math::{Mat4, Quat, Vec3, mat4_from_scale_rotation_translation, quat_from_xyzw};

/// Local transform relative to the parent entity (or world when unparented).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: quat_from_xyzw(0.0, 0.0, 0.0, 1.0),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Translation-only transform.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Set the rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set a uniform scale.
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Local-to-parent matrix.
    pub fn matrix(&self) -> Mat4 {
        let rotation = if self.rotation.norm_squared() == 0.0 {
            quat_from_xyzw(0.0, 0.0, 0.0, 1.0)
        } else {
            self.rotation
        };
        mat4_from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

/// Opaque handle to a mesh owned by the asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// A point light. Its position comes from the owning entity's world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

/// A spot light pointing down the owning entity's local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Inner cone half-angle in radians.
    pub inner_angle: f32,
    /// Outer cone half-angle in radians.
    pub outer_angle: f32,
}

/// Light component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Point(PointLight),
    Spot(SpotLight),
}
