//! Scene node variants
//!
//! [`Node`] is a closed enum. Groups carry a local transform and the keys of
//! their children; every other variant is a leaf. Geometry leaves (sphere,
//! boxes, pyramid, mesh) are what the backends draw; cameras and lights are
//! discovered by the traversal before any geometry is drawn.

use std::sync::Arc;

use crate::assets::{MeshData, ResourceHandle};
use crate::foundation::math::{Mat4, Vec3, Vec4};

use super::{NodeKey, SceneError, SceneResult};

/// RGBA color, components nominally in `[0, 1]`
pub type Color = Vec4;

/// A scene graph node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Transform applied to an ordered list of children
    Group(GroupNode),
    /// Analytic sphere
    Sphere(SphereNode),
    /// Flat colored axis aligned box
    AxisAlignedBox(BoxNode),
    /// Textured axis aligned box
    TexturedBox(TexturedBoxNode),
    /// Square based pyramid
    Pyramid(PyramidNode),
    /// Loaded triangle mesh
    Mesh(MeshNode),
    /// Camera placement and projection
    Camera(CameraNode),
    /// Point light at the local origin
    Light(LightNode),
}

impl Node {
    /// Variant name as used by the persistence format
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Group(_) => "Group",
            Self::Sphere(_) => "Sphere",
            Self::AxisAlignedBox(_) => "AxisAlignedBox",
            Self::TexturedBox(_) => "TexturedBox",
            Self::Pyramid(_) => "Pyramid",
            Self::Mesh(_) => "Mesh",
            Self::Camera(_) => "Camera",
            Self::Light(_) => "Light",
        }
    }

    /// Whether this node is drawn by the rendering backends
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Sphere(_) | Self::AxisAlignedBox(_) | Self::TexturedBox(_) | Self::Pyramid(_) | Self::Mesh(_)
        )
    }
}

/// Group node
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Applied to every descendant before its own transform
    pub transform: Mat4,
    pub(crate) children: Vec<NodeKey>,
}

impl GroupNode {
    /// Empty group with the given local transform
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform,
            children: Vec::new(),
        }
    }

    /// Child keys in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }
}

impl Default for GroupNode {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

/// Sphere leaf
#[derive(Debug, Clone, PartialEq)]
pub struct SphereNode {
    center: Vec3,
    radius: f64,
    /// Surface color
    pub color: Color,
}

impl SphereNode {
    /// Creates a sphere; the radius must be greater than zero
    pub fn new(center: Vec3, radius: f64, color: Color) -> SceneResult<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SceneError::InvalidRadius(radius));
        }
        Ok(Self { center, radius, color })
    }

    /// Center in local space
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Radius in local space
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

/// Axis aligned box leaf
#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    /// Minimum corner
    pub min_point: Vec3,
    /// Maximum corner
    pub max_point: Vec3,
    /// Surface color
    pub color: Color,
}

impl BoxNode {
    /// Box spanning two corners, in any order
    pub fn new(a: Vec3, b: Vec3, color: Color) -> Self {
        Self {
            min_point: a.inf(&b),
            max_point: a.sup(&b),
            color,
        }
    }
}

/// Textured axis aligned box leaf
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedBoxNode {
    /// Minimum corner
    pub min_point: Vec3,
    /// Maximum corner
    pub max_point: Vec3,
    /// Diffuse texture
    pub texture: ResourceHandle,
    /// Optional normal map
    pub normal_map: Option<ResourceHandle>,
}

impl TexturedBoxNode {
    /// Box spanning two corners, in any order
    pub fn new(a: Vec3, b: Vec3, texture: impl Into<ResourceHandle>) -> Self {
        Self {
            min_point: a.inf(&b),
            max_point: a.sup(&b),
            texture: texture.into(),
            normal_map: None,
        }
    }

    /// Attach a normal map
    #[must_use]
    pub fn with_normal_map(mut self, normal_map: impl Into<ResourceHandle>) -> Self {
        self.normal_map = Some(normal_map.into());
        self
    }
}

/// Pyramid leaf; the apex sits above the footprint center
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidNode {
    /// Minimum footprint corner
    pub min_point: Vec3,
    /// Maximum footprint corner
    pub max_point: Vec3,
    /// Apex height above `min_point.y`
    pub height: f64,
    /// Surface color
    pub color: Color,
}

impl PyramidNode {
    /// Pyramid over the footprint spanned by two corners
    pub fn new(a: Vec3, b: Vec3, height: f64, color: Color) -> Self {
        Self {
            min_point: a.inf(&b),
            max_point: a.sup(&b),
            height,
            color,
        }
    }

    /// Apex position in local space
    pub fn apex(&self) -> Vec3 {
        Vec3::new(
            (self.min_point.x + self.max_point.x) / 2.0,
            self.min_point.y + self.height,
            (self.min_point.z + self.max_point.z) / 2.0,
        )
    }
}

/// Mesh leaf whose geometry arrives asynchronously
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    /// Resource the geometry is loaded from
    pub resource: ResourceHandle,
    /// Surface color
    pub color: Color,
    pub(crate) geometry: Option<Arc<MeshData>>,
}

impl MeshNode {
    /// Mesh that has not been loaded yet
    pub fn new(resource: impl Into<ResourceHandle>, color: Color) -> Self {
        Self {
            resource: resource.into(),
            color,
            geometry: None,
        }
    }

    /// Loaded geometry, `None` until the load completes
    pub fn geometry(&self) -> Option<&Arc<MeshData>> {
        self.geometry.as_ref()
    }

    /// Whether the geometry is resident
    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }
}

/// Camera leaf
#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    /// Eye position in the camera's local space
    pub eye: Vec3,
    /// Point looked at
    pub center: Vec3,
    /// Up direction
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fovy: f64,
    /// Width over height
    pub aspect: f64,
    /// Near plane distance
    pub near: f64,
    /// Far plane distance
    pub far: f64,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            eye: Vec3::zeros(),
            center: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::y(),
            fovy: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraNode {
    /// Camera looking from `eye` at `center` with default projection
    pub fn looking_at(eye: Vec3, center: Vec3, up: Vec3) -> Self {
        Self {
            eye,
            center,
            up,
            ..Default::default()
        }
    }

    /// Replace the projection parameters
    #[must_use]
    pub fn with_projection(mut self, fovy: f64, aspect: f64, near: f64, far: f64) -> Self {
        self.fovy = fovy;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self
    }
}

/// Point light leaf
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    /// Light color
    pub color: Color,
}

impl LightNode {
    /// Light of the given color
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Default for LightNode {
    fn default() -> Self {
        Self::new(Color::new(1.0, 1.0, 1.0, 1.0))
    }
}

macro_rules! impl_into_node {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

impl_into_node! {
    GroupNode => Group,
    SphereNode => Sphere,
    BoxNode => AxisAlignedBox,
    TexturedBoxNode => TexturedBox,
    PyramidNode => Pyramid,
    MeshNode => Mesh,
    CameraNode => Camera,
    LightNode => Light,
}
