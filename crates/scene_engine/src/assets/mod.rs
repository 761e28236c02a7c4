//! Asset loading boundary
//!
//! Meshes and images are loaded off the render loop. A loader hands back a
//! [`PendingLoad`] immediately; the scene graph and the rasterizer poll it
//! between frames and swap the finished value in as a whole, so a frame only
//! ever sees a resource as complete or absent.

pub mod obj_loader;
pub mod image_loader;
mod fs_loader;
mod mesh_data;
mod pending;

pub use fs_loader::FileSystemLoader;
pub use image_loader::ImageData;
pub use mesh_data::MeshData;
pub use obj_loader::{ObjError, ObjLoader};
pub use pending::{LoadCompleter, LoadStatus, PendingLoad};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque reference to a mesh or image resource (usually a path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(pub String);

impl ResourceHandle {
    /// The handle as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Source of asynchronously loaded resources
pub trait AssetLoader: Send + Sync {
    /// Start loading mesh geometry
    fn load_mesh(&self, handle: &ResourceHandle) -> PendingLoad<MeshData>;

    /// Start loading image pixels
    fn load_image(&self, handle: &ResourceHandle) -> PendingLoad<ImageData>;
}

/// Asset system errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// OBJ parse failure
    #[error("OBJ error: {0}")]
    Obj(#[from] ObjError),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result alias for asset operations
pub type AssetResult<T> = Result<T, AssetError>;
