//! Camera and light discovery, and the render pass driver

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::{RenderError, RenderResult};
use crate::scene::{CameraNode, LightNode, NodeKey, SceneGraph};

use super::{traverse, GeometryRef, NodeRef, SceneVisitor, TransformStack};

/// The camera chosen for a frame
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCamera {
    /// Camera node key
    pub key: NodeKey,
    /// Camera node identifier
    pub id: String,
    /// Camera parameters in its local space
    pub camera: CameraNode,
    /// World to camera-local transform at the camera node
    pub placement_inverse: Mat4,
    /// World to view transform
    pub view: Mat4,
    /// Perspective projection
    pub projection: Mat4,
}

impl ActiveCamera {
    /// Fails with `SingularTransform` when the camera cannot produce a
    /// finite, invertible view or projection: `eye == center`, view
    /// direction parallel to `up`, zero aspect, `near == far`.
    fn new(node: NodeRef<'_>, camera: &CameraNode, stack: &TransformStack) -> RenderResult<Self> {
        let degenerate = || RenderError::SingularTransform(node.id.to_string());

        let look_at = Mat4::look_at(&camera.eye, &camera.center, &camera.up).ok_or_else(degenerate)?;
        let projection = Mat4::perspective(camera.fovy, camera.aspect, camera.near, camera.far);
        if !projection.iter().all(|v| v.is_finite()) || projection.try_inverse().is_none() {
            return Err(degenerate());
        }

        let placement_inverse = *stack.inverse_top();
        Ok(Self {
            key: node.key,
            id: node.id.to_string(),
            camera: camera.clone(),
            placement_inverse,
            view: look_at * placement_inverse,
            projection,
        })
    }

    /// `projection * view`
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Inverse projection, clip to view space
    pub fn inverse_projection(&self) -> RenderResult<Mat4> {
        self.projection
            .try_inverse()
            .ok_or_else(|| RenderError::SingularTransform(self.id.clone()))
    }

    /// Inverse of `projection * view`, clip to world space
    pub fn inverse_view_projection(&self) -> RenderResult<Mat4> {
        self.view_projection()
            .try_inverse()
            .ok_or_else(|| RenderError::SingularTransform(self.id.clone()))
    }
}

/// A light found by the light pass
#[derive(Debug, Clone, PartialEq)]
pub struct LightSample {
    /// Light node key
    pub key: NodeKey,
    /// Light node identifier
    pub id: String,
    /// Light color
    pub color: Vec4,
    /// Position in world space
    pub world_position: Vec3,
    /// Position in view space of the active camera
    pub view_position: Vec3,
}

/// Result of the camera and light passes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameContext {
    /// First camera in traversal order, if any
    pub camera: Option<ActiveCamera>,
    /// Lights in traversal order
    pub lights: Vec<LightSample>,
}

impl FrameContext {
    /// Light positions in view space, in traversal order
    pub fn view_light_positions(&self) -> Vec<Vec3> {
        self.lights.iter().map(|l| l.view_position).collect()
    }

    /// Light positions in world space, in traversal order
    pub fn world_light_positions(&self) -> Vec<Vec3> {
        self.lights.iter().map(|l| l.world_position).collect()
    }
}

#[derive(Default)]
struct CameraPass {
    found: Option<ActiveCamera>,
}

impl SceneVisitor for CameraPass {
    fn visit_camera(&mut self, node: NodeRef<'_>, camera: &CameraNode, stack: &TransformStack) -> RenderResult<()> {
        if self.found.is_none() {
            self.found = Some(ActiveCamera::new(node, camera, stack)?);
        } else {
            log::debug!("Ignoring camera '{}'; only the first camera is used", node.id);
        }
        Ok(())
    }
}

struct LightPass {
    view: Mat4,
    lights: Vec<LightSample>,
}

impl SceneVisitor for LightPass {
    fn visit_light(&mut self, node: NodeRef<'_>, light: &LightNode, stack: &TransformStack) -> RenderResult<()> {
        let world_position = utils::origin_of(stack.top());
        self.lights.push(LightSample {
            key: node.key,
            id: node.id.to_string(),
            color: light.color,
            world_position,
            view_position: utils::transform_point(&self.view, &world_position),
        });
        Ok(())
    }
}

/// Run the camera and light passes
///
/// Without a camera the light pass is skipped and the context is empty.
pub fn discover(graph: &SceneGraph) -> RenderResult<FrameContext> {
    let mut cameras = CameraPass::default();
    traverse(graph, &mut cameras)?;

    let Some(camera) = cameras.found else {
        log::trace!("No camera in scene");
        return Ok(FrameContext::default());
    };

    let mut lights = LightPass {
        view: camera.view,
        lights: Vec::new(),
    };
    traverse(graph, &mut lights)?;
    log::trace!("Frame uses camera '{}' and {} light(s)", camera.id, lights.lights.len());

    Ok(FrameContext {
        camera: Some(camera),
        lights: lights.lights,
    })
}

/// Backend behaviour for the render pass
pub trait RenderStrategy {
    /// Called once after discovery, before any geometry
    fn begin_frame(&mut self, _frame: &FrameContext, _camera: &ActiveCamera) -> RenderResult<()> {
        Ok(())
    }

    /// Called for every geometry leaf with its accumulated model transform
    fn draw_geometry(
        &mut self,
        node: NodeRef<'_>,
        geometry: GeometryRef<'_>,
        model: &Mat4,
        camera: &ActiveCamera,
    ) -> RenderResult<()>;

    /// Called once after the last leaf
    fn end_frame(&mut self, _frame: &FrameContext, _camera: &ActiveCamera) -> RenderResult<()> {
        Ok(())
    }
}

struct RenderPass<'a, S: ?Sized> {
    strategy: &'a mut S,
    camera: &'a ActiveCamera,
}

impl<S: RenderStrategy + ?Sized> SceneVisitor for RenderPass<'_, S> {
    fn visit_geometry(&mut self, node: NodeRef<'_>, geometry: GeometryRef<'_>, stack: &TransformStack) -> RenderResult<()> {
        self.strategy.draw_geometry(node, geometry, stack.top(), self.camera)
    }
}

/// Run all three passes with `strategy` handling the geometry
///
/// Returns `None` when the scene has no camera; nothing is drawn then.
pub fn run_frame<S: RenderStrategy + ?Sized>(graph: &SceneGraph, strategy: &mut S) -> RenderResult<Option<FrameContext>> {
    let frame = discover(graph)?;
    let Some(camera) = frame.camera.as_ref() else {
        log::debug!("Skipping frame without a camera");
        return Ok(None);
    };

    strategy.begin_frame(&frame, camera)?;
    traverse(graph, &mut RenderPass { strategy: &mut *strategy, camera })?;
    strategy.end_frame(&frame, camera)?;
    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SphereNode;
    use approx::assert_relative_eq;

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    #[derive(Default)]
    struct Collect {
        models: Vec<(String, Mat4)>,
        began: bool,
        ended: bool,
    }

    impl RenderStrategy for Collect {
        fn begin_frame(&mut self, _: &FrameContext, _: &ActiveCamera) -> RenderResult<()> {
            self.began = true;
            Ok(())
        }

        fn draw_geometry(&mut self, node: NodeRef<'_>, _: GeometryRef<'_>, model: &Mat4, _: &ActiveCamera) -> RenderResult<()> {
            self.models.push((node.id.to_string(), *model));
            Ok(())
        }

        fn end_frame(&mut self, _: &FrameContext, _: &ActiveCamera) -> RenderResult<()> {
            self.ended = true;
            Ok(())
        }
    }

    #[test]
    fn test_camera_placement_feeds_view() {
        let mut graph = SceneGraph::new("root");
        let rig = graph.add_group(graph.root(), "rig", Mat4::translation(&Vec3::new(0.0, 0.0, 5.0))).unwrap();
        graph.add_child(rig, "camera", CameraNode::default()).unwrap();
        graph.add_child(rig, "second", CameraNode::default()).unwrap();

        let frame = discover(&graph).unwrap();
        let camera = frame.camera.expect("camera");
        assert_eq!(camera.id, "camera");

        // Camera at z=5 looking down -z sees the origin 5 units ahead
        let origin = utils::transform_point(&camera.view, &Vec3::zeros());
        assert_relative_eq!(origin, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-12);
        assert_relative_eq!(
            camera.placement_inverse,
            Mat4::translation(&Vec3::new(0.0, 0.0, -5.0)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_lights_in_traversal_order() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph.add_child(root, "camera", CameraNode::default()).unwrap();
        let high = graph.add_group(root, "high", Mat4::translation(&Vec3::new(0.0, 3.0, 0.0))).unwrap();
        graph.add_child(high, "first", LightNode::default()).unwrap();
        graph.add_child(root, "second", LightNode::new(red())).unwrap();

        let frame = discover(&graph).unwrap();
        let ids: Vec<_> = frame.lights.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
        assert_relative_eq!(frame.lights[0].world_position, Vec3::new(0.0, 3.0, 0.0));
        assert_relative_eq!(frame.world_light_positions()[1], Vec3::zeros());
    }

    #[test]
    fn test_degenerate_cameras_are_rejected() {
        let top_down = CameraNode::looking_at(Vec3::new(0.0, 5.0, 0.0), Vec3::zeros(), Vec3::y());
        let cameras = [
            top_down,
            CameraNode::looking_at(Vec3::zeros(), Vec3::zeros(), Vec3::y()),
            CameraNode::default().with_projection(60.0, 0.0, 0.1, 100.0),
            CameraNode::default().with_projection(60.0, 1.0, 10.0, 10.0),
        ];

        for camera in cameras {
            let mut graph = SceneGraph::new("root");
            graph.add_child(graph.root(), "camera", camera.clone()).unwrap();
            graph.add_child(graph.root(), "ball", SphereNode::new(Vec3::zeros(), 1.0, red()).unwrap()).unwrap();

            let expected = Err(RenderError::SingularTransform("camera".to_string()));
            assert_eq!(discover(&graph), expected, "{camera:?}");
            let mut collect = Collect::default();
            assert!(run_frame(&graph, &mut collect).is_err());
            assert!(collect.models.is_empty());
        }
    }

    #[test]
    fn test_no_camera_skips_frame() {
        let mut graph = SceneGraph::new("root");
        graph.add_child(graph.root(), "ball", SphereNode::new(Vec3::zeros(), 1.0, red()).unwrap()).unwrap();

        let mut collect = Collect::default();
        assert_eq!(run_frame(&graph, &mut collect).unwrap(), None);
        assert!(!collect.began);
        assert!(collect.models.is_empty());
    }

    #[test]
    fn test_render_pass_passes_model_transform() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph.add_child(root, "camera", CameraNode::default()).unwrap();
        let moved = Mat4::translation(&Vec3::new(2.0, 0.0, 0.0));
        let group = graph.add_group(root, "moved", moved).unwrap();
        graph.add_child(group, "ball", SphereNode::new(Vec3::zeros(), 1.0, red()).unwrap()).unwrap();

        let mut collect = Collect::default();
        let frame = run_frame(&graph, &mut collect).unwrap();
        assert!(frame.is_some());
        assert!(collect.began && collect.ended);
        assert_eq!(collect.models, vec![("ball".to_string(), moved)]);
    }
}
