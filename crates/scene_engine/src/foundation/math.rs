//! Math utilities and types
//!
//! Provides the double precision vector and matrix types used by the scene
//! graph, the traversal stacks and both rendering backends. Everything is a thin
//! alias over `nalgebra`; the only conventions added here are the OpenGL style
//! projection (`z` in clip space maps to `[-1, 1]`) and the right-handed look-at.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 4D vector type (homogeneous coordinates, RGBA colors)
pub type Vec4 = Vector4<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f64>;

/// Tolerance below which a length is treated as zero
pub const EPSILON: f64 = 1e-9;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Point3, Vec3, Vec4};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Transform a position by a homogeneous matrix, dividing by `w`
    pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
        matrix.transform_point(&Point3::from(*point)).coords
    }

    /// Transform a direction (w = 0) by a matrix
    pub fn transform_direction(matrix: &Mat4, direction: &Vec3) -> Vec3 {
        matrix.transform_vector(direction)
    }

    /// Position of the local origin after applying `matrix`
    pub fn origin_of(matrix: &Mat4) -> Vec3 {
        let p = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
        if p.w.abs() > super::EPSILON {
            p.xyz() / p.w
        } else {
            p.xyz()
        }
    }

    /// Largest scale factor applied by the linear part of `matrix`
    ///
    /// Used to carry a radius through a transform that may scale
    /// non-uniformly; the result always encloses the transformed sphere.
    pub fn max_axis_scale(matrix: &Mat4) -> f64 {
        let linear = matrix.fixed_view::<3, 3>(0, 0);
        (0..3)
            .map(|c| linear.column(c).norm())
            .fold(0.0, f64::max)
    }

    /// Midpoint of two positions
    pub fn midpoint(a: &Vec3, b: &Vec3) -> Vec3 {
        (a + b) * 0.5
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Rotation of `degrees` around an arbitrary axis
    ///
    /// A zero-length axis yields the identity.
    fn rotation(axis: &Vec3, degrees: f64) -> Mat4;

    /// Translation matrix
    fn translation(offset: &Vec3) -> Mat4;

    /// Non-uniform scaling matrix
    fn scaling(factors: &Vec3) -> Mat4;

    /// Create a perspective projection matrix (`fovy` in degrees)
    fn perspective(fovy: f64, aspect: f64, near: f64, far: f64) -> Mat4;

    /// Create a look-at view matrix
    ///
    /// `None` when `eye == center` or the view direction is parallel to `up`.
    fn look_at(eye: &Vec3, center: &Vec3, up: &Vec3) -> Option<Mat4>;

    /// Normal matrix for a model-view matrix: `transpose(inverse(mv))`
    fn normal_matrix(model_view: &Mat4) -> Option<Mat4>;
}

impl Mat4Ext for Mat4 {
    fn rotation(axis: &Vec3, degrees: f64) -> Mat4 {
        Unit::try_new(*axis, EPSILON).map_or_else(Mat4::identity, |axis| {
            Mat4::from_axis_angle(&axis, utils::deg_to_rad(degrees))
        })
    }

    fn translation(offset: &Vec3) -> Mat4 {
        Mat4::new_translation(offset)
    }

    fn scaling(factors: &Vec3) -> Mat4 {
        Mat4::new_nonuniform_scaling(factors)
    }

    fn perspective(fovy: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
        // OpenGL clip space:
        // P = [f/a  0   0            0          ]
        //     [0    f   0            0          ]
        //     [0    0   (f+n)/(n-f)  2fn/(n-f)  ]
        //     [0    0   -1           0          ]
        let f = 1.0 / (utils::deg_to_rad(fovy) * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = 2.0 * far * near / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: &Vec3, center: &Vec3, up: &Vec3) -> Option<Mat4> {
        let forward = (center - eye).try_normalize(EPSILON)?;
        let right = forward.cross(up).try_normalize(EPSILON)?;
        let camera_up = right.cross(&forward);

        let translation = Mat4::new_translation(&-eye);

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        Some(rotation * translation)
    }

    fn normal_matrix(model_view: &Mat4) -> Option<Mat4> {
        model_view.try_inverse().map(|inverse| inverse.transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_quarter_turn_about_y() {
        let m = Mat4::rotation(&Vec3::y(), 90.0);
        let p = utils::transform_point(&m, &Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_zero_axis_is_identity() {
        assert_eq!(Mat4::rotation(&Vec3::zeros(), 45.0), Mat4::identity());
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = Mat4::look_at(&eye, &Vec3::zeros(), &Vec3::y()).unwrap();
        assert_relative_eq!(utils::transform_point(&view, &eye), Vec3::zeros(), epsilon = 1e-12);
        // The target lies straight down -z
        let target = utils::transform_point(&view, &Vec3::zeros());
        assert_relative_eq!(target, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_look_at_rejects_degenerate_frames() {
        let eye = Vec3::new(0.0, 5.0, 0.0);
        assert!(Mat4::look_at(&eye, &Vec3::zeros(), &Vec3::y()).is_none());
        assert!(Mat4::look_at(&eye, &eye, &Vec3::y()).is_none());
        assert!(Mat4::look_at(&eye, &Vec3::zeros(), &Vec3::z()).is_some());
    }

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let p = Mat4::perspective(60.0, 1.5, 0.1, 100.0);
        let near = utils::transform_point(&p, &Vec3::new(0.0, 0.0, -0.1));
        let far = utils::transform_point(&p, &Vec3::new(0.0, 0.0, -100.0));
        assert_relative_eq!(near.z, -1.0, epsilon = 1e-9);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_max_axis_scale() {
        let m = Mat4::translation(&Vec3::new(4.0, 0.0, 0.0))
            * Mat4::scaling(&Vec3::new(1.0, 3.0, 2.0));
        assert_relative_eq!(utils::max_axis_scale(&m), 3.0);
        assert_relative_eq!(utils::origin_of(&m), Vec3::new(4.0, 0.0, 0.0));
    }
}
