//! Math utilities and types
//!
//! Provides the math types used by the scene graph for local and world transforms.

pub use nalgebra::{
    Vector3,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Builder pattern: Set scale (uniform)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set rotation from axis-angle
    pub fn with_rotation_axis_angle(mut self, axis: Vec3, angle: f32) -> Self {
        self.rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), angle);
        self
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Local transform of a scene node
///
/// Nodes are usually positioned with a decomposed TRS transform; imported
/// content may carry an arbitrary matrix (shear, projection) that must not be
/// decomposed.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalTransform {
    /// Position / rotation / scale
    Trs(Transform),
    /// Raw matrix, used as-is
    Matrix(Mat4),
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::Trs(Transform::identity())
    }
}

impl LocalTransform {
    /// Matrix form of the local transform
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            Self::Trs(transform) => transform.to_matrix(),
            Self::Matrix(matrix) => *matrix,
        }
    }
}

impl From<Transform> for LocalTransform {
    fn from(transform: Transform) -> Self {
        Self::Trs(transform)
    }
}

impl From<Mat4> for LocalTransform {
    fn from(matrix: Mat4) -> Self {
        Self::Matrix(matrix)
    }
}
