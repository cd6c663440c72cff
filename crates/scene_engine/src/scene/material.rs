//! Materials and the shader keys layers group by

use crate::foundation::math::Vec3;
use std::fmt;

/// Identity of a shader program as seen by the scene
///
/// The asset pipeline owns the actual program; the scene only needs a key
/// that compares equal for meshes sharing a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u32);

impl ShaderId {
    /// Wrap an asset-side shader handle
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw handle value
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shader:{}", self.0)
    }
}

/// Surface description attached to a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Debug name
    pub name: String,
    /// Program used to draw surfaces with this material
    pub shader: ShaderId,
    /// Base color (linear RGB)
    pub base_color: Vec3,
    /// Alpha blending enabled
    pub is_transparent: bool,
}

impl Material {
    /// Create an opaque white material using `shader`
    pub fn new(name: impl Into<String>, shader: ShaderId) -> Self {
        Self {
            name: name.into(),
            shader,
            base_color: Vec3::new(1.0, 1.0, 1.0),
            is_transparent: false,
        }
    }

    /// Builder pattern: set base color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.base_color = color;
        self
    }

    /// Builder pattern: enable alpha blending
    pub fn transparent(mut self) -> Self {
        self.is_transparent = true;
        self
    }
}
