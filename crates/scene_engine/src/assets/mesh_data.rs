//! Loaded mesh geometry

use crate::foundation::math::Vec3;
use crate::geometry::flat_normals;

use super::AssetError;

/// Triangle geometry delivered by an [`AssetLoader`](super::AssetLoader)
///
/// Without `indices` the positions are a plain triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Vertex positions in the mesh's local space
    pub positions: Vec<Vec3>,
    /// Per-vertex normals, if the source declared them
    pub normals: Option<Vec<Vec3>>,
    /// Triangle indices into `positions`
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    /// Unindexed mesh without normals
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            normals: None,
            indices: None,
        }
    }

    /// Attach per-vertex normals
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach triangle indices
    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Number of whole triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.as_ref().map_or(self.positions.len(), Vec::len) / 3
    }

    /// Fill in missing normals with one flat normal per triangle
    ///
    /// Indexed meshes are expanded to a triangle list first so shared
    /// vertices can take a different normal per face. Meshes whose normal
    /// count does not match their positions are treated as having none.
    /// An index past the last position rejects the whole mesh.
    pub fn ensure_normals(self) -> Result<Self, AssetError> {
        if let Some(bad) = self
            .indices
            .iter()
            .flatten()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(AssetError::LoadFailed(format!(
                "index {bad} out of range for {} positions",
                self.positions.len()
            )));
        }

        if self
            .normals
            .as_ref()
            .is_some_and(|n| n.len() == self.positions.len())
        {
            return Ok(self);
        }

        let mut positions: Vec<Vec3> = match &self.indices {
            Some(indices) => indices.iter().map(|&i| self.positions[i as usize]).collect(),
            None => self.positions,
        };
        positions.truncate(positions.len() - positions.len() % 3);
        let normals = flat_normals(&positions);

        Ok(Self {
            positions,
            normals: Some(normals),
            indices: None,
        })
    }
}
