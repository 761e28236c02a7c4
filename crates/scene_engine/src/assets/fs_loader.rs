//! Filesystem asset loader
//!
//! Resolves handles relative to a root directory and loads each resource on
//! its own worker thread.

use std::path::{Path, PathBuf};

use super::{AssetError, AssetLoader, ImageData, MeshData, ObjLoader, PendingLoad, ResourceHandle};

/// Loads `.obj` meshes and image files from disk
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    /// Loader resolving handles against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a handle resolves to
    pub fn resolve(&self, handle: &ResourceHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }
}

fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected))
}

impl AssetLoader for FileSystemLoader {
    fn load_mesh(&self, handle: &ResourceHandle) -> PendingLoad<MeshData> {
        let path = self.resolve(handle);
        log::debug!("Queueing mesh load for {}", path.display());

        PendingLoad::spawn(handle.clone(), move || {
            if !has_extension(&path, "obj") {
                return Err(AssetError::UnsupportedFormat(path.display().to_string()));
            }
            if !path.exists() {
                return Err(AssetError::NotFound(path.display().to_string()));
            }
            Ok(ObjLoader::load_obj(&path)?)
        })
    }

    fn load_image(&self, handle: &ResourceHandle) -> PendingLoad<ImageData> {
        let path = self.resolve(handle);
        log::debug!("Queueing image load for {}", path.display());

        PendingLoad::spawn(handle.clone(), move || {
            if !path.exists() {
                return Err(AssetError::NotFound(path.display().to_string()));
            }
            ImageData::from_file(&path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scene_engine_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_loads_obj_from_disk() {
        let dir = scratch_dir("fs_loader_obj");
        std::fs::write(dir.join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let loader = FileSystemLoader::new(&dir);
        let mesh = loader.load_mesh(&"tri.obj".into()).wait().unwrap();
        assert_eq!(mesh.triangle_count(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_and_unsupported() {
        let loader = FileSystemLoader::new(scratch_dir("fs_loader_missing"));
        assert!(matches!(loader.load_mesh(&"nope.obj".into()).wait(), Err(AssetError::NotFound(_))));
        assert!(matches!(loader.load_mesh(&"mesh.fbx".into()).wait(), Err(AssetError::UnsupportedFormat(_))));
        assert!(matches!(loader.load_image(&"nope.png".into()).wait(), Err(AssetError::NotFound(_))));
    }
}
