//! Scene management system
//!
//! ## Architecture
//!
//! ```text
//! Animation drivers ──SceneCommand──┐
//!                                   ▼
//! Asset loaders ──PendingLoad──▶ SceneGraph (slotmap arena of Nodes)
//!                                   │
//!                                   ▼
//!                           traversal passes
//! ```
//!
//! The graph is a strict tree: nodes are only ever created under an existing
//! group and are never re-parented. External code refers to nodes by
//! [`NodeKey`] or by their string identifier.

mod node;
mod scene_graph;
mod commands;
pub mod animation;
pub mod persistence;

pub use animation::{AnimationDriver, Animator, BouncingDriver, RotationDriver};
pub use commands::SceneCommand;
pub use node::{
    BoxNode, CameraNode, Color, GroupNode, LightNode, MeshNode, Node, PyramidNode, SphereNode,
    TexturedBoxNode,
};
pub use persistence::{NodeRecord, PersistenceError};
pub use scene_graph::{NodeEntry, SceneGraph};

use thiserror::Error;

slotmap::new_key_type! {
    /// Handle to a node inside a [`SceneGraph`]
    pub struct NodeKey;
}

/// Scene construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Identifier already used in this graph
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    /// Key does not belong to this graph
    #[error("Unknown node")]
    UnknownNode,

    /// Children can only be added to groups
    #[error("Node '{id}' is a {kind}, not a Group")]
    NotAGroup {
        /// Identifier of the offending parent
        id: String,
        /// Its variant
        kind: &'static str,
    },

    /// Sphere radius must be greater than zero
    #[error("Invalid sphere radius {0}; must be greater than zero")]
    InvalidRadius(f64),
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
