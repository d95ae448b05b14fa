//! Math type aliases and helper functions.
//!
//! All rendering math is `f32` and column-major, matching GPU conventions.
//! Values never cross into GPU-visible memory by reinterpretation; the
//! `*_to_array` functions below are the only way semantic types become
//! wire-format arrays.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
/// Use [`quat_from_xyzw`] or `Quaternion::new(w, x, y, z)` to construct.
pub type Quat = nalgebra::Quaternion<f32>;

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_normalize(rotation);
    let rm = r.to_rotation_matrix().into_inner();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Build a right-handed perspective projection with depth range [0, 1].
pub fn perspective_rh(yfov: f32, aspect: f32, znear: f32, zfar: f32) -> Mat4 {
    let f = 1.0 / (yfov / 2.0).tan();
    let nf = 1.0 / (znear - zfar);
    #[rustfmt::skip]
    let result = Mat4::new(
        f / aspect, 0.0,  0.0,              0.0,
        0.0,        f,    0.0,              0.0,
        0.0,        0.0,  zfar * nf,        znear * zfar * nf,
        0.0,        0.0,  -1.0,             0.0,
    );
    result
}

/// Right-handed look-at view matrix.
pub fn look_at_rh(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    let eye_point = nalgebra::Point3::from(*eye);
    let target_point = nalgebra::Point3::from(*target);
    nalgebra::Isometry3::look_at_rh(&eye_point, &target_point, up).to_homogeneous()
}

/// Create a quaternion from x, y, z, w components.
pub fn quat_from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quat {
    nalgebra::Quaternion::new(w, x, y, z)
}

/// Create a quaternion from rotation around the Y axis.
pub fn quat_from_rotation_y(angle: f32) -> Quat {
    nalgebra::UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), angle).into_inner()
}

/// Invert a matrix, falling back to identity for singular input.
///
/// Camera matrices are always invertible in practice; a degenerate matrix
/// (zero-sized viewport, collapsed clip range) must not poison the frame.
pub fn inverse_or_identity(m: &Mat4) -> Mat4 {
    m.try_inverse().unwrap_or_else(Mat4::identity)
}

/// Fractional part, always in `[0, 1)` (also for negative input).
pub fn fract(x: f64) -> f64 {
    x - x.floor()
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

// ===== Wire conversions =====

/// Convert a 4x4 matrix to a column-major `[[f32; 4]; 4]` array.
pub fn mat4_to_cols_array_2d(m: &Mat4) -> [[f32; 4]; 4] {
    let s = m.as_slice();
    [
        [s[0], s[1], s[2], s[3]],
        [s[4], s[5], s[6], s[7]],
        [s[8], s[9], s[10], s[11]],
        [s[12], s[13], s[14], s[15]],
    ]
}

/// Convert a 2D vector to an array.
pub fn vec2_to_array(v: &Vec2) -> [f32; 2] {
    [v.x, v.y]
}

/// Convert a 4D vector to an array.
pub fn vec4_to_array(v: &Vec4) -> [f32; 4] {
    [v.x, v.y, v.z, v.w]
}

/// Widen a 3D vector to a 16-byte slot, storing `w` in the fourth lane.
pub fn vec3_to_padded_array(v: &Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat4_to_cols_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = mat4_to_cols_array_2d(&m);
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_trs_identity() {
        let m = mat4_from_scale_rotation_translation(
            Vec3::new(1.0, 1.0, 1.0),
            quat_from_xyzw(0.0, 0.0, 0.0, 1.0),
            Vec3::zeros(),
        );
        assert_eq!(m, Mat4::identity());
    }

    #[test]
    fn test_trs_scale_and_translation() {
        let m = mat4_from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 4.0),
            quat_from_xyzw(0.0, 0.0, 0.0, 1.0),
            Vec3::new(5.0, 6.0, 7.0),
        );
        let p = m * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(p, Vec4::new(7.0, 9.0, 11.0, 1.0));
    }

    #[test]
    fn test_perspective_maps_near_to_zero() {
        let p = perspective_rh(1.0, 1.0, 0.1, 100.0);
        let clip = p * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-5);
        let clip = p * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_inverse_or_identity() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let inv = inverse_or_identity(&m);
        assert_eq!(inv * m, Mat4::identity());
        assert_eq!(inverse_or_identity(&Mat4::zeros()), Mat4::identity());
    }

    #[test]
    fn test_fract() {
        assert_eq!(fract(1.25), 0.25);
        assert_eq!(fract(-0.25), 0.75);
        assert_eq!(fract(3.0), 0.0);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    #[test]
    fn test_padded_vec3() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(vec3_to_padded_array(&v, 9.0), [1.0, 2.0, 3.0, 9.0]);
        assert_eq!(vec2_to_array(&Vec2::new(4.0, 5.0)), [4.0, 5.0]);
        assert_eq!(vec4_to_array(&Vec4::new(1.0, 2.0, 3.0, 4.0)), [1.0, 2.0, 3.0, 4.0]);
    }
}
