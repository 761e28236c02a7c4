//! Scene persistence
//!
//! Each node becomes a record tagged with its variant name:
//!
//! ```text
//! (type: "Sphere", id: "ball", center: (0.0, 1.0, 0.0), radius: 0.5, color: (1.0, 0.0, 0.0, 1.0))
//! ```
//!
//! A group nests its children, in order, under `children`. Mesh geometry is
//! not stored; meshes reload from their resource handle.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::node::{
    BoxNode, CameraNode, Color, GroupNode, LightNode, MeshNode, Node, PyramidNode, SphereNode,
    TexturedBoxNode,
};
use super::{NodeKey, SceneError, SceneGraph};
use crate::assets::ResourceHandle;
use crate::foundation::math::{Mat4, Vec3};

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON syntax or shape error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The root record must be a group
    #[error("Root record must be a Group, found {0}")]
    RootNotGroup(&'static str),

    /// Records violate a graph invariant (duplicate id, bad radius)
    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),
}

/// Serialized form of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeRecord {
    /// Group with nested children
    Group {
        /// Node identifier
        id: String,
        /// Local transform
        transform: Mat4,
        /// Children in traversal order
        #[serde(default)]
        children: Vec<NodeRecord>,
    },
    /// Sphere leaf
    Sphere {
        /// Node identifier
        id: String,
        /// Center
        center: Vec3,
        /// Radius
        radius: f64,
        /// Color
        color: Color,
    },
    /// Axis aligned box leaf
    AxisAlignedBox {
        /// Node identifier
        id: String,
        /// Minimum corner
        min_point: Vec3,
        /// Maximum corner
        max_point: Vec3,
        /// Color
        color: Color,
    },
    /// Textured box leaf
    TexturedBox {
        /// Node identifier
        id: String,
        /// Minimum corner
        min_point: Vec3,
        /// Maximum corner
        max_point: Vec3,
        /// Texture resource
        texture: ResourceHandle,
        /// Optional normal map resource
        #[serde(default)]
        normal_map: Option<ResourceHandle>,
    },
    /// Pyramid leaf
    Pyramid {
        /// Node identifier
        id: String,
        /// Minimum footprint corner
        min_point: Vec3,
        /// Maximum footprint corner
        max_point: Vec3,
        /// Apex height
        height: f64,
        /// Color
        color: Color,
    },
    /// Mesh leaf
    Mesh {
        /// Node identifier
        id: String,
        /// Mesh resource
        resource: ResourceHandle,
        /// Color
        color: Color,
    },
    /// Camera leaf
    Camera {
        /// Node identifier
        id: String,
        /// Eye position
        eye: Vec3,
        /// Look-at target
        center: Vec3,
        /// Up direction
        up: Vec3,
        /// Vertical field of view in degrees
        fovy: f64,
        /// Aspect ratio
        aspect: f64,
        /// Near plane
        near: f64,
        /// Far plane
        far: f64,
    },
    /// Light leaf
    Light {
        /// Node identifier
        id: String,
        /// Light color
        color: Color,
    },
}

impl NodeRecord {
    /// Identifier of the recorded node
    pub fn id(&self) -> &str {
        match self {
            Self::Group { id, .. }
            | Self::Sphere { id, .. }
            | Self::AxisAlignedBox { id, .. }
            | Self::TexturedBox { id, .. }
            | Self::Pyramid { id, .. }
            | Self::Mesh { id, .. }
            | Self::Camera { id, .. }
            | Self::Light { id, .. } => id,
        }
    }

    /// Capture the subtree rooted at `key`
    pub fn capture(graph: &SceneGraph, key: NodeKey) -> Option<Self> {
        let entry = graph.get(key)?;
        let id = entry.id().to_string();

        Some(match entry.node() {
            Node::Group(group) => Self::Group {
                id,
                transform: group.transform,
                children: group
                    .children()
                    .iter()
                    .filter_map(|child| Self::capture(graph, *child))
                    .collect(),
            },
            Node::Sphere(s) => Self::Sphere {
                id,
                center: s.center(),
                radius: s.radius(),
                color: s.color,
            },
            Node::AxisAlignedBox(b) => Self::AxisAlignedBox {
                id,
                min_point: b.min_point,
                max_point: b.max_point,
                color: b.color,
            },
            Node::TexturedBox(b) => Self::TexturedBox {
                id,
                min_point: b.min_point,
                max_point: b.max_point,
                texture: b.texture.clone(),
                normal_map: b.normal_map.clone(),
            },
            Node::Pyramid(p) => Self::Pyramid {
                id,
                min_point: p.min_point,
                max_point: p.max_point,
                height: p.height,
                color: p.color,
            },
            Node::Mesh(m) => Self::Mesh {
                id,
                resource: m.resource.clone(),
                color: m.color,
            },
            Node::Camera(c) => Self::Camera {
                id,
                eye: c.eye,
                center: c.center,
                up: c.up,
                fovy: c.fovy,
                aspect: c.aspect,
                near: c.near,
                far: c.far,
            },
            Node::Light(l) => Self::Light { id, color: l.color },
        })
    }

    /// Rebuild a whole graph; the record must be a group
    pub fn build(&self) -> Result<SceneGraph, PersistenceError> {
        let Self::Group { id, transform, children } = self else {
            return Err(PersistenceError::RootNotGroup(self.kind_name()));
        };
        let mut graph = SceneGraph::with_root(id.clone(), *transform);
        let root = graph.root();
        for child in children {
            child.insert_into(&mut graph, root)?;
        }
        Ok(graph)
    }

    /// Insert this record and its descendants under `parent`
    pub fn insert_into(&self, graph: &mut SceneGraph, parent: NodeKey) -> Result<NodeKey, SceneError> {
        let key = graph.add_child(parent, self.id(), self.to_node()?)?;
        if let Self::Group { children, .. } = self {
            for child in children {
                child.insert_into(graph, key)?;
            }
        }
        Ok(key)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Group { .. } => "Group",
            Self::Sphere { .. } => "Sphere",
            Self::AxisAlignedBox { .. } => "AxisAlignedBox",
            Self::TexturedBox { .. } => "TexturedBox",
            Self::Pyramid { .. } => "Pyramid",
            Self::Mesh { .. } => "Mesh",
            Self::Camera { .. } => "Camera",
            Self::Light { .. } => "Light",
        }
    }

    fn to_node(&self) -> Result<Node, SceneError> {
        Ok(match self {
            Self::Group { transform, .. } => GroupNode::new(*transform).into(),
            Self::Sphere { center, radius, color, .. } => SphereNode::new(*center, *radius, *color)?.into(),
            Self::AxisAlignedBox { min_point, max_point, color, .. } => {
                BoxNode::new(*min_point, *max_point, *color).into()
            }
            Self::TexturedBox { min_point, max_point, texture, normal_map, .. } => {
                let mut node = TexturedBoxNode::new(*min_point, *max_point, texture.clone());
                node.normal_map.clone_from(normal_map);
                node.into()
            }
            Self::Pyramid { min_point, max_point, height, color, .. } => {
                PyramidNode::new(*min_point, *max_point, *height, *color).into()
            }
            Self::Mesh { resource, color, .. } => MeshNode::new(resource.clone(), *color).into(),
            Self::Camera { eye, center, up, fovy, aspect, near, far, .. } => CameraNode {
                eye: *eye,
                center: *center,
                up: *up,
                fovy: *fovy,
                aspect: *aspect,
                near: *near,
                far: *far,
            }
            .into(),
            Self::Light { color, .. } => LightNode::new(*color).into(),
        })
    }
}

/// Serialize the whole graph to RON text
pub fn to_ron(graph: &SceneGraph) -> Result<String, PersistenceError> {
    let record = NodeRecord::capture(graph, graph.root())
        .ok_or(PersistenceError::RootNotGroup("missing root"))?;
    Ok(ron::ser::to_string_pretty(&record, ron::ser::PrettyConfig::default())?)
}

/// Build a graph from RON text
pub fn from_ron(text: &str) -> Result<SceneGraph, PersistenceError> {
    let record: NodeRecord = ron::from_str(text)?;
    record.build()
}

/// Save the graph to a `.ron` file
pub fn save_to_file<P: AsRef<Path>>(graph: &SceneGraph, path: P) -> Result<(), PersistenceError> {
    std::fs::write(path.as_ref(), to_ron(graph)?)?;
    log::info!("Saved scene with {} nodes to {:?}", graph.len(), path.as_ref());
    Ok(())
}

/// Load a graph from a `.ron` file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<SceneGraph, PersistenceError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let graph = from_ron(&text)?;
    log::info!("Loaded scene with {} nodes from {:?}", graph.len(), path.as_ref());
    Ok(graph)
}
