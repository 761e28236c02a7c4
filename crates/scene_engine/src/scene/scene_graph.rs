//! Scene graph arena
//!
//! Nodes live in a `SlotMap` owned by [`SceneGraph`]. A node is created as a
//! child of an existing group and never moves afterwards, so the structure is
//! always a tree rooted at [`SceneGraph::root`].
//!
//! Between frames the graph accepts two kinds of updates:
//! - [`SceneCommand`]s queued by animation drivers, applied by
//!   [`SceneGraph::apply_commands`]
//! - finished mesh loads, swapped in by [`SceneGraph::poll_loads`]

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use slotmap::SlotMap;

use super::commands::SceneCommand;
use super::node::{GroupNode, Node};
use super::{NodeKey, SceneError, SceneResult};
use crate::assets::{AssetLoader, LoadStatus, MeshData, PendingLoad};
use crate::foundation::math::Mat4;

/// A node together with its identifier
#[derive(Debug, Clone)]
pub struct NodeEntry {
    id: String,
    node: Node,
}

impl NodeEntry {
    /// Stable identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node payload
    pub fn node(&self) -> &Node {
        &self.node
    }
}

/// Owner of every node in a scene
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, NodeEntry>,
    ids: HashMap<String, NodeKey>,
    root: NodeKey,
    command_tx: Sender<SceneCommand>,
    command_rx: Receiver<SceneCommand>,
    pending_meshes: Vec<(NodeKey, PendingLoad<MeshData>)>,
    failed_meshes: HashSet<NodeKey>,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("pending_meshes", &self.pending_meshes.len())
            .field("failed_meshes", &self.failed_meshes.len())
            .finish_non_exhaustive()
    }
}

impl SceneGraph {
    /// Graph holding only an identity root group
    pub fn new(root_id: impl Into<String>) -> Self {
        Self::with_root(root_id, Mat4::identity())
    }

    /// Graph whose root group has the given transform
    pub fn with_root(root_id: impl Into<String>, transform: Mat4) -> Self {
        let root_id = root_id.into();
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeEntry {
            id: root_id.clone(),
            node: Node::Group(GroupNode::new(transform)),
        });
        let (command_tx, command_rx) = mpsc::channel();

        Self {
            nodes,
            ids: HashMap::from([(root_id, root)]),
            root,
            command_tx,
            command_rx,
            pending_meshes: Vec::new(),
            failed_meshes: HashSet::new(),
        }
    }

    /// Key of the root group
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root group exists for the graph's whole life
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by key
    pub fn get(&self, key: NodeKey) -> Option<&NodeEntry> {
        self.nodes.get(key)
    }

    /// Look up a node key by identifier
    pub fn find(&self, id: &str) -> Option<NodeKey> {
        self.ids.get(id).copied()
    }

    /// Children of a group, empty for leaves and unknown keys
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        match self.nodes.get(key).map(NodeEntry::node) {
            Some(Node::Group(group)) => group.children(),
            _ => &[],
        }
    }

    /// Local transform of a group
    pub fn local_transform(&self, key: NodeKey) -> Option<&Mat4> {
        match self.nodes.get(key).map(NodeEntry::node) {
            Some(Node::Group(group)) => Some(&group.transform),
            _ => None,
        }
    }

    /// Append a new node to the children of `parent`
    ///
    /// Identifiers are unique within a graph. Groups are always created
    /// empty; their children come from further calls.
    pub fn add_child(
        &mut self,
        parent: NodeKey,
        id: impl Into<String>,
        node: impl Into<Node>,
    ) -> SceneResult<NodeKey> {
        let id = id.into();
        let mut node = node.into();

        match self.nodes.get(parent).map(NodeEntry::node) {
            Some(Node::Group(_)) => {}
            Some(other) => {
                return Err(SceneError::NotAGroup {
                    id: self.nodes[parent].id.clone(),
                    kind: other.kind_name(),
                })
            }
            None => return Err(SceneError::UnknownNode),
        }
        if self.ids.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        if let Node::Group(group) = &mut node {
            group.children.clear();
        }

        let key = self.nodes.insert(NodeEntry { id: id.clone(), node });
        self.ids.insert(id, key);
        if let Some(Node::Group(group)) = self.nodes.get_mut(parent).map(|e| &mut e.node) {
            group.children.push(key);
        }
        Ok(key)
    }

    /// Convenience wrapper creating a group child
    pub fn add_group(
        &mut self,
        parent: NodeKey,
        id: impl Into<String>,
        transform: Mat4,
    ) -> SceneResult<NodeKey> {
        self.add_child(parent, id, GroupNode::new(transform))
    }

    /// Sender for queuing commands from drivers, possibly on other threads
    pub fn command_sender(&self) -> Sender<SceneCommand> {
        self.command_tx.clone()
    }

    /// Queue a command for the next [`apply_commands`](Self::apply_commands)
    pub fn submit(&self, command: SceneCommand) {
        // The receiver lives in `self`, so this send cannot fail.
        let _ = self.command_tx.send(command);
    }

    /// Apply every queued command; must run between traversals
    ///
    /// Commands addressing unknown nodes or non-groups are dropped with a
    /// warning. Returns the number applied.
    pub fn apply_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                SceneCommand::SetLocalTransform { group, transform } => {
                    match self.nodes.get_mut(group).map(|e| &mut e.node) {
                        Some(Node::Group(node)) => {
                            node.transform = transform;
                            applied += 1;
                        }
                        _ => log::warn!("Dropping transform command for non-group node {:?}", group),
                    }
                }
            }
        }
        applied
    }

    /// Start loading every mesh that is neither resident, in flight, nor
    /// failed before
    ///
    /// A failed mesh is not requested again until the graph is cleared.
    /// Returns the number of loads started.
    pub fn request_mesh_loads(&mut self, loader: &dyn AssetLoader) -> usize {
        let wanted: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|(key, entry)| match &entry.node {
                Node::Mesh(mesh) if !mesh.is_ready() => Some((key, mesh.resource.clone())),
                _ => None,
            })
            .filter(|(key, _)| !self.failed_meshes.contains(key))
            .filter(|(key, _)| !self.pending_meshes.iter().any(|(k, _)| k == key))
            .collect();

        for (key, resource) in &wanted {
            log::debug!("Requesting mesh {} for node {:?}", resource, key);
            self.pending_meshes.push((*key, loader.load_mesh(resource)));
        }
        wanted.len()
    }

    /// Swap finished mesh loads into their nodes
    ///
    /// Geometry without normals gets flat normals before it becomes
    /// visible. Failed loads, including geometry with broken indices, are
    /// logged and leave the mesh not ready for good.
    /// Returns the number of meshes that became ready.
    pub fn poll_loads(&mut self) -> usize {
        let mut completed = 0;
        let mut still_pending = Vec::with_capacity(self.pending_meshes.len());

        for (key, mut pending) in std::mem::take(&mut self.pending_meshes) {
            match pending.poll() {
                LoadStatus::Pending => still_pending.push((key, pending)),
                LoadStatus::Ready(data) => match data.ensure_normals() {
                    Ok(data) => {
                        if let Some(Node::Mesh(mesh)) = self.nodes.get_mut(key).map(|e| &mut e.node) {
                            mesh.geometry = Some(Arc::new(data));
                            completed += 1;
                            log::info!("Mesh {} is ready", pending.handle());
                        }
                    }
                    Err(e) => {
                        log::warn!("Mesh {} is unusable: {}", pending.handle(), e);
                        self.failed_meshes.insert(key);
                    }
                },
                LoadStatus::Failed(e) => {
                    log::warn!("Mesh {} failed to load: {}", pending.handle(), e);
                    self.failed_meshes.insert(key);
                }
            }
        }

        self.pending_meshes = still_pending;
        completed
    }

    /// Number of mesh loads still in flight
    pub fn pending_loads(&self) -> usize {
        self.pending_meshes.len()
    }

    /// Drop every node except a fresh identity root
    ///
    /// In-flight loads are abandoned and queued commands discarded.
    pub fn clear(&mut self) {
        let root_id = self.nodes[self.root].id.clone();
        *self = Self::with_root(root_id, Mat4::identity());
    }

    /// Keys of all nodes in pre-order
    pub fn keys_preorder(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageData;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use crate::scene::node::{Color, LightNode, MeshNode, SphereNode};

    fn sphere() -> SphereNode {
        SphereNode::new(Vec3::zeros(), 1.0, Color::new(1.0, 0.0, 0.0, 1.0)).unwrap()
    }

    struct ImmediateLoader;

    impl AssetLoader for ImmediateLoader {
        fn load_mesh(&self, handle: &crate::assets::ResourceHandle) -> PendingLoad<MeshData> {
            PendingLoad::resolved(
                handle.clone(),
                Ok(MeshData::new(vec![Vec3::zeros(), Vec3::x(), Vec3::y()])),
            )
        }

        fn load_image(&self, handle: &crate::assets::ResourceHandle) -> PendingLoad<ImageData> {
            PendingLoad::resolved(handle.clone(), Ok(ImageData::solid_color(1, 1, [255; 4])))
        }
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let a = graph.add_child(root, "a", sphere()).unwrap();
        let b = graph.add_group(root, "b", Mat4::identity()).unwrap();
        let c = graph.add_child(root, "c", LightNode::default()).unwrap();
        let d = graph.add_child(b, "d", sphere()).unwrap();

        assert_eq!(graph.children(root), &[a, b, c]);
        assert_eq!(graph.children(b), &[d]);
        assert_eq!(graph.find("d"), Some(d));
        assert_eq!(graph.keys_preorder(), vec![root, a, b, d, c]);
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_rejects_duplicate_ids_and_leaf_parents() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let leaf = graph.add_child(root, "leaf", sphere()).unwrap();

        assert!(matches!(graph.add_child(root, "leaf", sphere()), Err(SceneError::DuplicateId(_))));
        assert!(matches!(graph.add_child(root, "root", sphere()), Err(SceneError::DuplicateId(_))));
        assert!(matches!(
            graph.add_child(leaf, "x", sphere()),
            Err(SceneError::NotAGroup { kind: "Sphere", .. })
        ));
    }

    #[test]
    fn test_commands_apply_between_frames() {
        let mut graph = SceneGraph::new("root");
        let group = graph.add_group(graph.root(), "spin", Mat4::identity()).unwrap();
        let leaf = graph.add_child(group, "ball", sphere()).unwrap();
        let moved = Mat4::translation(&Vec3::new(1.0, 2.0, 3.0));

        graph.submit(SceneCommand::SetLocalTransform { group, transform: moved });
        assert_eq!(graph.local_transform(group), Some(&Mat4::identity()));

        graph.command_sender()
            .send(SceneCommand::SetLocalTransform { group: leaf, transform: moved })
            .unwrap();

        assert_eq!(graph.apply_commands(), 1);
        assert_eq!(graph.local_transform(group), Some(&moved));
    }

    #[test]
    fn test_mesh_becomes_ready_after_poll() {
        let mut graph = SceneGraph::new("root");
        let key = graph
            .add_child(graph.root(), "teapot", MeshNode::new("teapot.obj", Color::new(0.5, 0.5, 0.5, 1.0)))
            .unwrap();

        assert_eq!(graph.request_mesh_loads(&ImmediateLoader), 1);
        // Already in flight
        assert_eq!(graph.request_mesh_loads(&ImmediateLoader), 0);
        assert_eq!(graph.poll_loads(), 1);
        assert_eq!(graph.pending_loads(), 0);

        let Some(Node::Mesh(mesh)) = graph.get(key).map(NodeEntry::node) else {
            panic!("mesh node expected");
        };
        let geometry = mesh.geometry().expect("geometry should be resident");
        assert_eq!(geometry.normals.as_ref().map(Vec::len), Some(3));
    }

    #[derive(Default)]
    struct BrokenLoader {
        calls: std::sync::atomic::AtomicUsize,
        bad_indices: bool,
    }

    impl AssetLoader for BrokenLoader {
        fn load_mesh(&self, handle: &crate::assets::ResourceHandle) -> PendingLoad<MeshData> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let result = if self.bad_indices {
                Ok(MeshData::new(vec![Vec3::zeros(), Vec3::x(), Vec3::y()]).with_indices(vec![0, 1, 9]))
            } else {
                Err(crate::assets::AssetError::NotFound(handle.to_string()))
            };
            PendingLoad::resolved(handle.clone(), result)
        }

        fn load_image(&self, handle: &crate::assets::ResourceHandle) -> PendingLoad<ImageData> {
            PendingLoad::resolved(handle.clone(), Err(crate::assets::AssetError::NotFound(handle.to_string())))
        }
    }

    #[test]
    fn test_failed_mesh_is_not_requested_again() {
        for bad_indices in [false, true] {
            let loader = BrokenLoader { bad_indices, ..Default::default() };
            let mut graph = SceneGraph::new("root");
            let key = graph
                .add_child(graph.root(), "ghost", MeshNode::new("ghost.obj", Color::new(1.0, 1.0, 1.0, 1.0)))
                .unwrap();

            for _ in 0..3 {
                graph.request_mesh_loads(&loader);
                assert_eq!(graph.poll_loads(), 0);
            }
            assert_eq!(loader.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
            assert_eq!(graph.pending_loads(), 0);
            let Some(Node::Mesh(mesh)) = graph.get(key).map(NodeEntry::node) else {
                panic!("mesh node expected");
            };
            assert!(!mesh.is_ready());

            // A cleared graph starts over
            graph.clear();
            graph
                .add_child(graph.root(), "ghost", MeshNode::new("ghost.obj", Color::new(1.0, 1.0, 1.0, 1.0)))
                .unwrap();
            assert_eq!(graph.request_mesh_loads(&loader), 1);
        }
    }

    #[test]
    fn test_clear_resets_to_root() {
        let mut graph = SceneGraph::new("world");
        graph.add_child(graph.root(), "a", sphere()).unwrap();
        graph.clear();
        assert_eq!(graph.len(), 1);
        assert!(graph.find("a").is_none());
        assert!(graph.find("world").is_some());
    }
}
