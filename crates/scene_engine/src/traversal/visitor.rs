//! Depth-first visitor over the scene graph

use crate::render::RenderResult;
use crate::scene::{
    BoxNode, CameraNode, GroupNode, LightNode, MeshNode, Node, NodeKey, PyramidNode, SceneGraph,
    SphereNode, TexturedBoxNode,
};

use super::TransformStack;

/// Identity of the node being visited
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    /// Arena key
    pub key: NodeKey,
    /// Stable identifier
    pub id: &'a str,
    /// Full node payload
    pub node: &'a Node,
}

/// Borrowed geometry leaf
#[derive(Debug, Clone, Copy)]
pub enum GeometryRef<'a> {
    /// Sphere leaf
    Sphere(&'a SphereNode),
    /// Flat colored box leaf
    AxisAlignedBox(&'a BoxNode),
    /// Textured box leaf
    TexturedBox(&'a TexturedBoxNode),
    /// Pyramid leaf
    Pyramid(&'a PyramidNode),
    /// Mesh leaf, possibly not loaded yet
    Mesh(&'a MeshNode),
}

/// Per-variant callbacks invoked by [`traverse`]
///
/// Every callback defaults to doing nothing, so a pass only implements the
/// variants it cares about. `stack` holds the accumulated transform of the
/// visited node.
pub trait SceneVisitor {
    /// Called before a group's children are visited, with the group's own
    /// transform already pushed
    fn visit_group(&mut self, _node: NodeRef<'_>, _group: &GroupNode, _stack: &TransformStack) -> RenderResult<()> {
        Ok(())
    }

    /// Camera leaf
    fn visit_camera(&mut self, _node: NodeRef<'_>, _camera: &CameraNode, _stack: &TransformStack) -> RenderResult<()> {
        Ok(())
    }

    /// Light leaf
    fn visit_light(&mut self, _node: NodeRef<'_>, _light: &LightNode, _stack: &TransformStack) -> RenderResult<()> {
        Ok(())
    }

    /// Geometry leaf
    fn visit_geometry(
        &mut self,
        _node: NodeRef<'_>,
        _geometry: GeometryRef<'_>,
        _stack: &TransformStack,
    ) -> RenderResult<()> {
        Ok(())
    }
}

/// Visit every node of `graph` once, depth first, children in order
///
/// The first error aborts the walk; the stack is unwound either way.
pub fn traverse<V: SceneVisitor + ?Sized>(graph: &SceneGraph, visitor: &mut V) -> RenderResult<()> {
    let mut stack = TransformStack::new();
    visit(graph, graph.root(), visitor, &mut stack)
}

fn visit<V: SceneVisitor + ?Sized>(
    graph: &SceneGraph,
    key: NodeKey,
    visitor: &mut V,
    stack: &mut TransformStack,
) -> RenderResult<()> {
    let Some(entry) = graph.get(key) else {
        log::warn!("Skipping dangling node key {:?}", key);
        return Ok(());
    };
    let node = NodeRef {
        key,
        id: entry.id(),
        node: entry.node(),
    };

    match entry.node() {
        Node::Group(group) => stack.scoped(node.id, &group.transform, |stack| {
            visitor.visit_group(node, group, stack)?;
            for child in group.children() {
                visit(graph, *child, visitor, stack)?;
            }
            Ok(())
        }),
        Node::Camera(camera) => visitor.visit_camera(node, camera, stack),
        Node::Light(light) => visitor.visit_light(node, light, stack),
        Node::Sphere(sphere) => visitor.visit_geometry(node, GeometryRef::Sphere(sphere), stack),
        Node::AxisAlignedBox(b) => visitor.visit_geometry(node, GeometryRef::AxisAlignedBox(b), stack),
        Node::TexturedBox(b) => visitor.visit_geometry(node, GeometryRef::TexturedBox(b), stack),
        Node::Pyramid(pyramid) => visitor.visit_geometry(node, GeometryRef::Pyramid(pyramid), stack),
        Node::Mesh(mesh) => visitor.visit_geometry(node, GeometryRef::Mesh(mesh), stack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};
    use crate::render::RenderError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        visits: Vec<String>,
        depths: HashMap<String, usize>,
    }

    impl Recorder {
        fn record(&mut self, node: NodeRef<'_>, stack: &TransformStack) {
            self.visits.push(node.id.to_string());
            self.depths.insert(node.id.to_string(), stack.depth());
        }
    }

    impl SceneVisitor for Recorder {
        fn visit_group(&mut self, node: NodeRef<'_>, _group: &GroupNode, stack: &TransformStack) -> RenderResult<()> {
            self.record(node, stack);
            Ok(())
        }

        fn visit_camera(&mut self, node: NodeRef<'_>, _camera: &CameraNode, stack: &TransformStack) -> RenderResult<()> {
            self.record(node, stack);
            Ok(())
        }

        fn visit_light(&mut self, node: NodeRef<'_>, _light: &LightNode, stack: &TransformStack) -> RenderResult<()> {
            self.record(node, stack);
            Ok(())
        }

        fn visit_geometry(
            &mut self,
            node: NodeRef<'_>,
            _geometry: GeometryRef<'_>,
            stack: &TransformStack,
        ) -> RenderResult<()> {
            self.record(node, stack);
            Ok(())
        }
    }

    fn sample_graph() -> SceneGraph {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        graph.add_child(root, "camera", CameraNode::default()).unwrap();
        let arm = graph.add_group(root, "arm", Mat4::translation(&Vec3::x())).unwrap();
        graph.add_child(arm, "ball", SphereNode::new(Vec3::zeros(), 1.0, color).unwrap()).unwrap();
        let hand = graph.add_group(arm, "hand", Mat4::identity()).unwrap();
        graph.add_child(hand, "lamp", LightNode::default()).unwrap();
        graph.add_child(root, "crate", BoxNode::new(Vec3::zeros(), Vec3::repeat(1.0), color)).unwrap();
        graph
    }

    #[test]
    fn test_every_node_visited_once_in_preorder() {
        let graph = sample_graph();
        let mut recorder = Recorder::default();
        traverse(&graph, &mut recorder).unwrap();

        assert_eq!(recorder.visits, ["root", "camera", "arm", "ball", "hand", "lamp", "crate"]);
        assert_eq!(recorder.visits.len(), graph.len());
        assert_eq!(recorder.depths["camera"], 1);
        assert_eq!(recorder.depths["lamp"], 3);
        assert_eq!(recorder.depths["crate"], 1);
    }

    #[test]
    fn test_error_aborts_walk() {
        struct FailOnLight(usize);
        impl SceneVisitor for FailOnLight {
            fn visit_light(&mut self, _: NodeRef<'_>, _: &LightNode, _: &TransformStack) -> RenderResult<()> {
                Err(RenderError::InvalidRay)
            }

            fn visit_geometry(&mut self, _: NodeRef<'_>, _: GeometryRef<'_>, _: &TransformStack) -> RenderResult<()> {
                self.0 += 1;
                Ok(())
            }
        }

        let mut visitor = FailOnLight(0);
        assert!(traverse(&sample_graph(), &mut visitor).is_err());
        // "crate" comes after the light and is never reached
        assert_eq!(visitor.0, 1);
    }
}
