//! Scene nodes
//!
//! The set of node kinds is closed: groups own children, lights, cameras and
//! meshes are leaves. Layers select nodes through [`NodeVariant`], which maps a
//! node to its kind payload without any open-ended type inspection.

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{LocalTransform, Mat4, Vec3};
use crate::scene::identity::ObjectId;
use crate::scene::material::{Material, ShaderId};

/// Types of lights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Parallel rays (sunlight)
    Directional,
    /// Radiates in all directions from the node position
    Point,
    /// Cone along the node's -Z axis
    Spot,
}

/// Light payload
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// The type of light
    pub light_type: LightType,
    /// RGB color values (0.0 to 1.0 range)
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
    /// Maximum range for point/spot lights
    pub range: f32,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
}

impl Light {
    /// Directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            range: 0.0,
            cast_shadows: true,
        }
    }

    /// Point light
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            color,
            intensity,
            range,
            cast_shadows: true,
        }
    }
}

/// Perspective camera payload
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Renderable payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Geometry name in the asset pipeline
    pub geometry: String,
    /// One material per sub-mesh
    pub materials: Vec<Material>,
}

impl Mesh {
    /// Mesh drawn with a single material
    pub fn new(geometry: impl Into<String>, material: Material) -> Self {
        Self {
            geometry: geometry.into(),
            materials: vec![material],
        }
    }

    /// Whether any sub-mesh is drawn with `shader`
    pub fn uses_shader(&self, shader: ShaderId) -> bool {
        self.materials.iter().any(|m| m.shader == shader)
    }

    /// Distinct shaders in material order
    pub fn shaders(&self) -> Vec<ShaderId> {
        let mut shaders: Vec<ShaderId> = Vec::with_capacity(self.materials.len());
        for material in &self.materials {
            if !shaders.contains(&material.shader) {
                shaders.push(material.shader);
            }
        }
        shaders
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Container; the only kind that owns children
    Group,
    /// Light source
    Light(Light),
    /// Viewpoint
    Camera(Camera),
    /// Renderable object
    Mesh(Mesh),
}

impl NodeKind {
    /// Whether nodes of this kind may own children
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Light(_) => "light",
            Self::Camera(_) => "camera",
            Self::Mesh(_) => "mesh",
        }
    }
}

/// One node of the hierarchy
///
/// Nodes live in a [`SceneGraph`](crate::scene::SceneGraph) arena; the graph
/// is the only writer of the structural fields.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) name: Option<String>,
    pub(crate) id: ObjectId,
    pub(crate) kind: NodeKind,
    pub(crate) local: LocalTransform,
    pub(crate) world: Mat4,
    pub(crate) world_dirty: bool,
    pub(crate) descendant_dirty: bool,
    pub(crate) visible: bool,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) scene: Option<ObjectId>,
}

impl SceneNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            id: ObjectId::UNASSIGNED,
            kind,
            local: LocalTransform::default(),
            world: Mat4::identity(),
            world_dirty: true,
            descendant_dirty: false,
            visible: true,
            parent: None,
            children: Vec::new(),
            scene: None,
        }
    }

    /// Debug name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Identity, unassigned until the node first joins a scene
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Kind payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Local transform relative to the parent
    pub fn local_transform(&self) -> &LocalTransform {
        &self.local
    }

    /// Cached world matrix; stale while [`is_world_dirty`](Self::is_world_dirty)
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// Whether the cached world matrix needs recomputing
    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty
    }

    /// Own visibility flag, ignoring ancestors
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Parent handle (lookup only; the parent owns this node)
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Owning scene, set while the node is reachable from a scene root
    pub fn scene(&self) -> Option<ObjectId> {
        self.scene
    }

    /// Whether the node is reachable from a scene root
    pub fn in_scene(&self) -> bool {
        self.scene.is_some()
    }
}

/// A node kind that layers can be restricted to
pub trait NodeVariant: 'static {
    /// Name used for layer names and logs
    const NAME: &'static str;

    /// The payload of `node` when it is of this kind
    fn extract(node: &SceneNode) -> Option<&Self>;
}

impl NodeVariant for Light {
    const NAME: &'static str = "lights";

    fn extract(node: &SceneNode) -> Option<&Self> {
        match &node.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

impl NodeVariant for Camera {
    const NAME: &'static str = "cameras";

    fn extract(node: &SceneNode) -> Option<&Self> {
        match &node.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

impl NodeVariant for Mesh {
    const NAME: &'static str = "meshes";

    fn extract(node: &SceneNode) -> Option<&Self> {
        match &node.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Every node kind
impl NodeVariant for SceneNode {
    const NAME: &'static str = "objects";

    fn extract(node: &SceneNode) -> Option<&Self> {
        Some(node)
    }
}
