//! # Scene Engine
//!
//! A scene graph drawn by two interchangeable backends, a rasterizer and an
//! analytic sphere ray tracer, with cursor picking on fitted bounding
//! spheres.
//!
//! ## Features
//!
//! - **Scene Graph**: slotmap arena of groups and leaves, addressed by key or id
//! - **Three-Pass Traversal**: camera, lights, then geometry, over one transform stack
//! - **Phong Lighting**: shared coefficients used by both backends
//! - **Picking**: Ritter bounding spheres tested against cursor rays
//! - **Async Assets**: meshes and textures load on worker threads and appear when ready
//! - **Persistence**: scenes saved and loaded as RON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = SceneGraph::new("world");
//!     let root = graph.root();
//!     graph.add_child(root, "camera", CameraNode::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y()))?;
//!     graph.add_child(root, "sun", LightNode::default())?;
//!     graph.add_child(root, "ball", SphereNode::new(Vec3::zeros(), 1.0, Vec4::new(1.0, 0.0, 0.0, 1.0))?)?;
//!
//!     let loader = Arc::new(FileSystemLoader::new("assets"));
//!     let mut renderer = SceneRenderer::new(RecordingDevice::new(), &EngineConfig::default(), loader);
//!     renderer.setup(&graph)?;
//!     renderer.render(&graph)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod assets;
pub mod scene;
pub mod traversal;
pub mod geometry;
pub mod lighting;
pub mod intersection;
pub mod bounds;
pub mod device;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetLoader, FileSystemLoader, ResourceHandle},
        bounds::{fit_ritter, BoundingSphere},
        config::{Config, EngineConfig},
        device::{GraphicsDevice, RecordingDevice},
        foundation::math::{Mat4, Mat4Ext, Vec3, Vec4},
        intersection::{Intersection, Ray, Sphere},
        lighting::{PhongCoefficients, SharedPhong},
        render::{BackendMode, Cursor, PickHit, RenderError, RenderResult, SceneRenderer},
        scene::{
            Animator, BoxNode, CameraNode, GroupNode, LightNode, MeshNode, NodeKey, PyramidNode, SceneCommand,
            SceneGraph, SphereNode, TexturedBoxNode,
        },
    };
}
